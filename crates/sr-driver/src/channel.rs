//! 行协议命令通道
//!
//! 一块串口板对应一个 [`CommandChannel`]。所有命令交换都经过同一把锁，
//! 保证“写命令 + 读响应”在并发调用下不会交错，响应总是对应到发出它的命令。
//!
//! 设备偶尔会丢字节或漏回复，因此 [`ChannelGuard::exchange`] 会重发命令直到
//! 读到以 `\n` 结尾的完整一行，或者尝试次数耗尽。

use parking_lot::{MappedMutexGuard, Mutex, MutexGuard};
use sr_protocol::is_complete_line;
use sr_transport::{LineTransport, TransportError};
use std::time::Duration;
use tracing::{debug, trace};

use crate::config::ChannelConfig;
use crate::error::{DriverError, describe_command};

/// 带互斥和重试的行协议通道
pub struct CommandChannel<T: LineTransport> {
    /// `None` 表示已关闭
    transport: Mutex<Option<T>>,
    config: ChannelConfig,
    device: String,
}

impl<T: LineTransport> CommandChannel<T> {
    /// 接管传输，并把读超时设置为配置值
    pub fn new(
        mut transport: T,
        config: ChannelConfig,
        device: impl Into<String>,
    ) -> Result<Self, DriverError> {
        transport.set_read_timeout(config.read_timeout())?;
        Ok(Self {
            transport: Mutex::new(Some(transport)),
            config,
            device: device.into(),
        })
    }

    /// 设备标识（序列号或串口路径），用于日志和错误信息
    pub fn device(&self) -> &str {
        &self.device
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    /// 获取独占访问权
    ///
    /// 需要在一次加锁内完成多步操作（例如进入 bootloader）时使用。
    /// 通道已关闭时返回 `Transport(Closed)`。
    pub fn lock(&self) -> Result<ChannelGuard<'_, T>, DriverError> {
        let guard = MutexGuard::try_map(self.transport.lock(), Option::as_mut)
            .map_err(|_| DriverError::Transport(TransportError::Closed))?;
        Ok(ChannelGuard {
            transport: guard,
            config: &self.config,
            device: &self.device,
        })
    }

    /// 发送命令并读取一行响应（含 `\n`）
    pub fn exchange(&self, command: &[u8]) -> Result<Vec<u8>, DriverError> {
        self.lock()?.exchange(command)
    }

    /// 发送命令并丢弃响应
    pub fn send(&self, command: &[u8]) -> Result<(), DriverError> {
        self.exchange(command).map(|_| ())
    }

    /// 只写不读（用于没有响应的命令）
    pub fn write(&self, data: &[u8]) -> Result<(), DriverError> {
        self.lock()?.write(data)
    }

    /// 关闭通道并释放传输
    ///
    /// 会等待正在进行的交换完成。重复关闭是无操作。
    pub fn close(&self) {
        if self.transport.lock().take().is_some() {
            debug!(device = %self.device, "command channel closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.transport.lock().is_none()
    }
}

impl<T: LineTransport> std::fmt::Debug for CommandChannel<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandChannel")
            .field("device", &self.device)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// 通道独占访问守卫
///
/// 持有期间其他线程的命令会被阻塞。
pub struct ChannelGuard<'a, T: LineTransport> {
    transport: MappedMutexGuard<'a, T>,
    config: &'a ChannelConfig,
    device: &'a str,
}

impl<T: LineTransport> ChannelGuard<'_, T> {
    /// 写命令并读一行响应，不完整时重发
    ///
    /// 传输层错误立即返回，不重试。
    pub fn exchange(&mut self, command: &[u8]) -> Result<Vec<u8>, DriverError> {
        let attempts = self.config.attempts();
        for attempt in 1..=attempts {
            self.transport.write_all(command)?;
            let response = self.transport.read_line()?;
            if is_complete_line(&response) {
                debug!(
                    device = self.device,
                    command = %describe_command(command),
                    response = %describe_command(&response),
                    attempt,
                    "command exchanged"
                );
                return Ok(response);
            }
            trace!(
                device = self.device,
                command = %describe_command(command),
                partial = %describe_command(&response),
                attempt,
                "incomplete response, retrying"
            );
        }
        Err(DriverError::CommandFailed {
            command: describe_command(command),
            attempts,
        })
    }

    pub fn write(&mut self, data: &[u8]) -> Result<(), DriverError> {
        self.transport.write_all(data)?;
        Ok(())
    }

    /// 最多读取 `len` 字节，超时返回已读到的部分
    pub fn read_up_to(&mut self, len: usize) -> Result<Vec<u8>, DriverError> {
        Ok(self.transport.read_up_to(len)?)
    }

    /// 临时使用另一个读超时执行 `f`，结束后恢复原超时
    ///
    /// `f` 失败时仍会尝试恢复，返回 `f` 的错误。
    pub fn with_read_timeout<R>(
        &mut self,
        timeout: Duration,
        f: impl FnOnce(&mut Self) -> Result<R, DriverError>,
    ) -> Result<R, DriverError> {
        let previous = self.transport.read_timeout();
        self.transport.set_read_timeout(timeout)?;
        let result = f(self);
        let restored = self.transport.set_read_timeout(previous);
        let value = result?;
        restored?;
        Ok(value)
    }
}
