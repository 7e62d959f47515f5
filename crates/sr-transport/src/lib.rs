//! # SR Transport Layer
//!
//! 外设板的传输抽象层：串口字节流（电机板、I/O 板）和 USB 控制传输（电源板）。
//!
//! 本层只负责原始字节的收发与超时，不理解命令语义；
//! 重试、互斥和协议解析由 `sr-driver` 完成。

use std::time::Duration;
use thiserror::Error;

pub mod serial;
pub mod usb;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use rusb;
pub use serial::SerialPortTransport;
pub use usb::UsbControlDevice;

/// 传输层统一错误类型
#[derive(Error, Debug)]
pub enum TransportError {
    /// 底层 IO 错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// 串口打开/配置错误
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// USB 错误（来自 rusb）
    #[error("USB error: {0}")]
    Usb(#[from] rusb::Error),

    /// 按总线号/地址找不到设备
    #[error("Device not found on bus {bus} at address {address}")]
    DeviceNotFound { bus: u8, address: u8 },

    /// 传输已关闭
    #[error("Transport closed")]
    Closed,
}

impl TransportError {
    /// 检查是否为超时错误
    pub fn is_timeout(&self) -> bool {
        match self {
            TransportError::Io(e) => e.kind() == std::io::ErrorKind::TimedOut,
            TransportError::Usb(rusb::Error::Timeout) => true,
            _ => false,
        }
    }

    /// 判断是否为致命错误（设备已不可用）
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            TransportError::Closed
                | TransportError::DeviceNotFound { .. }
                | TransportError::Usb(rusb::Error::NoDevice)
                | TransportError::Usb(rusb::Error::NotFound)
                | TransportError::Usb(rusb::Error::Access)
        )
    }
}

/// 面向行协议的字节流传输（串口）
///
/// 语义：
/// - `write_all()`: 原样写出全部字节
/// - `read_line()`: 读到 `\n`（包含）或读超时为止；超时**不是**错误，
///   返回已读到的部分（可能为空）
/// - `read_up_to()`: 读到 `len` 字节或超时为止
pub trait LineTransport: Send {
    /// 写出全部字节
    fn write_all(&mut self, data: &[u8]) -> Result<(), TransportError>;

    /// 读取一行（含终止符），超时返回部分数据
    fn read_line(&mut self) -> Result<Vec<u8>, TransportError>;

    /// 最多读取 `len` 字节，超时返回部分数据
    fn read_up_to(&mut self, len: usize) -> Result<Vec<u8>, TransportError>;

    /// 当前读超时
    fn read_timeout(&self) -> Duration;

    /// 设置读超时
    fn set_read_timeout(&mut self, timeout: Duration) -> Result<(), TransportError>;
}

/// USB 控制传输
///
/// 参数与 USB 规范中的 setup packet 一一对应。控制传输要么完整完成，
/// 要么返回错误，因此这里没有重试语义。
pub trait ControlTransport: Send + Sync {
    /// 控制 IN 传输，返回实际读取的字节数
    fn read_control(
        &self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<usize, TransportError>;

    /// 控制 OUT 传输，返回实际写出的字节数
    fn write_control(
        &self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        data: &[u8],
        timeout: Duration,
    ) -> Result<usize, TransportError>;
}
