//! 串口传输（基于 `serialport`）

use std::io::{self, ErrorKind, Read, Write};
use std::time::{Duration, Instant};

use serialport::SerialPort;
use tracing::{debug, trace};

use crate::{LineTransport, TransportError};

/// 行协议终止符
const LINE_TERMINATOR: u8 = b'\n';

/// 已打开的串口
pub struct SerialPortTransport {
    port: Box<dyn SerialPort>,
    path: String,
}

impl SerialPortTransport {
    /// 打开串口
    ///
    /// # 参数
    /// - `path`: 设备路径（如 `/dev/ttyACM0`）
    /// - `baud_rate`: 波特率
    /// - `read_timeout`: 读超时（行读取的整体超时）
    pub fn open(
        path: &str,
        baud_rate: u32,
        read_timeout: Duration,
    ) -> Result<Self, TransportError> {
        let port = serialport::new(path, baud_rate).timeout(read_timeout).open()?;
        debug!("Opened serial port {} at {} baud", path, baud_rate);
        Ok(Self::from_port(port, path))
    }

    /// 包装一个已经打开的串口
    pub fn from_port(port: Box<dyn SerialPort>, path: impl Into<String>) -> Self {
        Self {
            port,
            path: path.into(),
        }
    }

    /// 设备路径
    pub fn path(&self) -> &str {
        &self.path
    }

    /// 在截止时间前读取，直到满足 `done` 或超时
    ///
    /// 每次读之前把串口超时设为剩余时间，结束后恢复原超时。
    fn read_until(
        &mut self,
        max_len: usize,
        done: impl Fn(&[u8]) -> bool,
    ) -> Result<Vec<u8>, TransportError> {
        let timeout = self.port.timeout();
        let port = &mut self.port;
        let result = read_with_deadline(timeout, max_len, &done, |byte, remaining| {
            port.set_timeout(remaining)?;
            port.read(byte)
        });
        self.port.set_timeout(timeout)?;

        let buf = result?;
        if buf.len() < max_len && !done(&buf) {
            trace!("Serial read on {} timed out after {} bytes", self.path, buf.len());
        }
        Ok(buf)
    }
}

/// 逐字节读取，`read` 收到的是本次读最多可以阻塞的时间
fn read_with_deadline(
    timeout: Duration,
    max_len: usize,
    done: impl Fn(&[u8]) -> bool,
    mut read: impl FnMut(&mut [u8], Duration) -> io::Result<usize>,
) -> Result<Vec<u8>, TransportError> {
    let deadline = Instant::now() + timeout;
    let mut buf = Vec::new();
    let mut byte = [0u8; 1];

    while buf.len() < max_len && !done(&buf) {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        match read(&mut byte[..], remaining) {
            Ok(0) => break,
            Ok(_) => buf.push(byte[0]),
            Err(e) if e.kind() == ErrorKind::TimedOut => break,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(TransportError::Io(e)),
        }
    }

    Ok(buf)
}

impl LineTransport for SerialPortTransport {
    fn write_all(&mut self, data: &[u8]) -> Result<(), TransportError> {
        self.port.write_all(data)?;
        self.port.flush()?;
        Ok(())
    }

    fn read_line(&mut self) -> Result<Vec<u8>, TransportError> {
        self.read_until(usize::MAX, |buf| buf.last() == Some(&LINE_TERMINATOR))
    }

    fn read_up_to(&mut self, len: usize) -> Result<Vec<u8>, TransportError> {
        self.read_until(len, |_| false)
    }

    fn read_timeout(&self) -> Duration {
        self.port.timeout()
    }

    fn set_read_timeout(&mut self, timeout: Duration) -> Result<(), TransportError> {
        self.port.set_timeout(timeout)?;
        Ok(())
    }
}

impl std::fmt::Debug for SerialPortTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialPortTransport").field("path", &self.path).finish()
    }
}
