//! Mock 传输（无硬件依赖）
//!
//! - [`MockSerial`]: 按写入的命令生成响应，并记录完整的线上轨迹
//! - [`MockUsb`]: 按 wIndex 返回预设的控制读响应，并记录所有控制传输
//!
//! 两者都可以 `clone()`，克隆体共享同一份状态，测试代码可以在把传输交给
//! 驱动层之后继续检查轨迹。

use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use crate::{ControlTransport, LineTransport, TransportError};

/// 线上事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireEvent {
    Write(Vec<u8>),
    Read(Vec<u8>),
}

type Responder = Box<dyn FnMut(&[u8]) -> Vec<u8> + Send>;

struct MockSerialState {
    responder: Responder,
    pending: VecDeque<u8>,
    events: Vec<WireEvent>,
    read_timeout: Duration,
    io_delay: Duration,
    fail_writes: bool,
}

/// 模拟串口
#[derive(Clone)]
pub struct MockSerial {
    state: Arc<Mutex<MockSerialState>>,
}

impl MockSerial {
    /// 每次写入后调用 `responder` 生成设备回复（追加到接收缓冲区）
    pub fn new(responder: impl FnMut(&[u8]) -> Vec<u8> + Send + 'static) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockSerialState {
                responder: Box::new(responder),
                pending: VecDeque::new(),
                events: Vec::new(),
                read_timeout: Duration::from_millis(100),
                io_delay: Duration::ZERO,
                fail_writes: false,
            })),
        }
    }

    /// 从不回复的设备
    pub fn silent() -> Self {
        Self::new(|_| Vec::new())
    }

    /// 按顺序为每次写入返回一条预设回复，用完后不再回复
    pub fn scripted<I>(replies: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Vec<u8>>,
    {
        let mut queue: VecDeque<Vec<u8>> = replies.into_iter().map(Into::into).collect();
        Self::new(move |_| queue.pop_front().unwrap_or_default())
    }

    /// 每次读写前让出的时间（放大并发竞争窗口）
    pub fn with_io_delay(self, delay: Duration) -> Self {
        self.state.lock().io_delay = delay;
        self
    }

    /// 之后的写入都返回 IO 错误
    pub fn fail_writes(&self) {
        self.state.lock().fail_writes = true;
    }

    /// 直接向接收缓冲区注入字节
    pub fn push_input(&self, data: &[u8]) {
        self.state.lock().pending.extend(data.iter().copied());
    }

    /// 完整线上轨迹
    pub fn events(&self) -> Vec<WireEvent> {
        self.state.lock().events.clone()
    }

    /// 所有写入（按顺序）
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.state
            .lock()
            .events
            .iter()
            .filter_map(|e| match e {
                WireEvent::Write(data) => Some(data.clone()),
                WireEvent::Read(_) => None,
            })
            .collect()
    }

    pub fn write_count(&self) -> usize {
        self.writes().len()
    }

    /// 所有写入字节拼接后的结果
    pub fn written_bytes(&self) -> Vec<u8> {
        self.writes().concat()
    }

    /// 当前读超时
    pub fn current_read_timeout(&self) -> Duration {
        self.state.lock().read_timeout
    }

    pub fn clear_events(&self) {
        self.state.lock().events.clear();
    }

    fn pause(&self) {
        let delay = self.state.lock().io_delay;
        if !delay.is_zero() {
            std::thread::sleep(delay);
        } else {
            std::thread::yield_now();
        }
    }

    fn take(&self, max_len: usize, stop_at_newline: bool) -> Vec<u8> {
        let mut state = self.state.lock();
        let mut buf = Vec::new();
        while buf.len() < max_len {
            match state.pending.pop_front() {
                Some(byte) => {
                    buf.push(byte);
                    if stop_at_newline && byte == b'\n' {
                        break;
                    }
                },
                // 缓冲区为空等价于读超时
                None => break,
            }
        }
        state.events.push(WireEvent::Read(buf.clone()));
        buf
    }
}

impl LineTransport for MockSerial {
    fn write_all(&mut self, data: &[u8]) -> Result<(), TransportError> {
        {
            let mut state = self.state.lock();
            if state.fail_writes {
                return Err(TransportError::Io(std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    "mock serial write failure",
                )));
            }
            state.events.push(WireEvent::Write(data.to_vec()));
            let reply = (state.responder)(data);
            state.pending.extend(reply);
        }
        self.pause();
        Ok(())
    }

    fn read_line(&mut self) -> Result<Vec<u8>, TransportError> {
        self.pause();
        Ok(self.take(usize::MAX, true))
    }

    fn read_up_to(&mut self, len: usize) -> Result<Vec<u8>, TransportError> {
        self.pause();
        Ok(self.take(len, false))
    }

    fn read_timeout(&self) -> Duration {
        self.state.lock().read_timeout
    }

    fn set_read_timeout(&mut self, timeout: Duration) -> Result<(), TransportError> {
        self.state.lock().read_timeout = timeout;
        Ok(())
    }
}

/// 控制传输方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlDirection {
    In,
    Out,
}

/// 一次被记录的控制传输
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlRecord {
    pub direction: ControlDirection,
    pub request_type: u8,
    pub request: u8,
    pub value: u16,
    pub index: u16,
    /// OUT: 写出的负载；IN: 返回给调用方的字节
    pub data: Vec<u8>,
}

#[derive(Default)]
struct MockUsbState {
    transfers: Vec<ControlRecord>,
    read_responses: HashMap<u16, Vec<u8>>,
    fail_next: Option<rusb::Error>,
}

/// 模拟 USB 控制传输设备
#[derive(Clone, Default)]
pub struct MockUsb {
    state: Arc<Mutex<MockUsbState>>,
}

impl MockUsb {
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置 wIndex 为 `index` 的控制读响应
    pub fn set_read_response(&self, index: u16, data: impl Into<Vec<u8>>) {
        self.state.lock().read_responses.insert(index, data.into());
    }

    /// 下一次传输返回指定错误
    pub fn fail_next(&self, error: rusb::Error) {
        self.state.lock().fail_next = Some(error);
    }

    /// 所有成功的控制传输（按顺序）
    pub fn transfers(&self) -> Vec<ControlRecord> {
        self.state.lock().transfers.clone()
    }

    pub fn transfer_count(&self) -> usize {
        self.state.lock().transfers.len()
    }
}

impl ControlTransport for MockUsb {
    fn read_control(
        &self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        buf: &mut [u8],
        _timeout: Duration,
    ) -> Result<usize, TransportError> {
        let mut state = self.state.lock();
        if let Some(error) = state.fail_next.take() {
            return Err(TransportError::Usb(error));
        }
        // 没有预设响应时模拟设备 STALL
        let response = state
            .read_responses
            .get(&index)
            .cloned()
            .ok_or(TransportError::Usb(rusb::Error::Pipe))?;
        let len = response.len().min(buf.len());
        buf[..len].copy_from_slice(&response[..len]);
        state.transfers.push(ControlRecord {
            direction: ControlDirection::In,
            request_type,
            request,
            value,
            index,
            data: response[..len].to_vec(),
        });
        Ok(len)
    }

    fn write_control(
        &self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        data: &[u8],
        _timeout: Duration,
    ) -> Result<usize, TransportError> {
        let mut state = self.state.lock();
        if let Some(error) = state.fail_next.take() {
            return Err(TransportError::Usb(error));
        }
        state.transfers.push(ControlRecord {
            direction: ControlDirection::Out,
            request_type,
            request,
            value,
            index,
            data: data.to_vec(),
        });
        Ok(data.len())
    }
}
