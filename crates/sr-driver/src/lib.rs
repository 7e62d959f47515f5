//! 驱动层模块
//!
//! 本模块在传输层之上提供与外设板通信的基础设施，包括：
//! - 行协议命令通道（互斥 + 有界重试）
//! - 电源板控制传输协议（请求类型、超时、长度校验）
//! - 固件版本校验
//!
//! # 使用场景
//!
//! 适用于需要直接收发命令字节的场景。
//! 大多数用户应该使用 `sr-robot` 提供的板级接口。

pub mod channel;
pub mod config;
mod error;
pub mod control;
pub mod firmware;

pub use channel::{ChannelGuard, CommandChannel};
pub use config::{ChannelConfig, ControlConfig, FirmwarePolicy};
pub use control::ControlProtocol;
pub use error::DriverError;
pub use firmware::{FirmwareExpectation, FirmwareStatus, query_firmware, verify_firmware};
