//! Prelude - 常用类型的便捷导入
//!
//! ```rust
//! use sr_robot::prelude::*;
//! ```

// 板级接口
pub use crate::motor::{Motor, MotorChannel};
pub use crate::power::Power;
pub use crate::ruggeduino::Ruggeduino;

// 配置
pub use crate::config::HardwareConfig;
pub use sr_driver::{ChannelConfig, ControlConfig, FirmwarePolicy};

// 参数类型
pub use sr_protocol::{Beep, Note, PinMode};

// 错误类型
pub use sr_driver::DriverError;
pub use sr_protocol::ProtocolError;
pub use sr_transport::TransportError;
