//! SR Robot - 外设板 Rust 接口
//!
//! 为电机板、I/O 板（Ruggeduino）和电源板提供阻塞式、线程安全的板级接口。
//!
//! # 架构设计
//!
//! 从底层到高层：
//!
//! - **协议层** (`sr-protocol`): 命令编码与响应解析，无 IO
//! - **传输层** (`sr-transport`): 串口与 USB 控制传输
//! - **驱动层** (`sr-driver`): 带互斥和重试的命令通道、控制传输协议、固件校验
//! - **板级接口** (本 crate): `Motor`、`Ruggeduino`、`Power`
//!
//! # 快速开始
//!
//! ```no_run
//! use sr_robot::prelude::*;
//! use sr_robot::{SerialMotor, UsbPower};
//!
//! # fn main() -> Result<(), DriverError> {
//! sr_robot::init_logging("sr_robot=info");
//!
//! let motor = SerialMotor::open(
//!     "/dev/ttyACM0",
//!     None,
//!     FirmwarePolicy::Strict,
//!     ChannelConfig::default(),
//! )?;
//! motor.m0().set_power(50)?;
//!
//! let power = UsbPower::open(1, 7, None, ControlConfig::default())?;
//! power.outputs().set(0, true)?;
//! power.beep(&Beep::note(200, "c"))?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod logging;
pub mod motor;
pub mod power;
pub mod prelude;
pub mod ruggeduino;

pub use config::{ConfigError, HardwareConfig};
pub use logging::init_logging;
pub use motor::{Motor, MotorChannel, SerialMotor};
pub use power::{Battery, Outputs, Power, UsbPower};
pub use ruggeduino::{IgnoredRuggeduino, Ruggeduino, SerialRuggeduino};

// 下层 crate 的常用类型
pub use sr_driver::{ChannelConfig, ControlConfig, DriverError, FirmwarePolicy};
pub use sr_protocol::{Beep, Note, PinMode, ProtocolError};
pub use sr_transport::TransportError;
