//! 电机板（MCV4B）协议定义
//!
//! 电机板使用单字节命令；速度命令后紧跟一个速度字节。
//! 只有版本查询和进入 bootloader 会有行响应，其余命令没有回复。

use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::ProtocolError;

/// 电机板串口波特率
pub const MOTOR_BAUD_RATE: u32 = 1_000_000;

/// 电机板的 USB 型号字符串
pub const MOTOR_USB_MODEL: &str = "MCV4B";

/// 期望的固件版本响应（含换行符）
pub const EXPECTED_MOTOR_FIRMWARE: &str = "MCV4B:3\n";

/// 进入 bootloader 时电机板返回的字符串
pub const BOOTLOADER_MAGIC: &str = "Entering bootloader\n";

/// 电机板接受的最大功率绝对值
pub const PWM_MAX: i32 = 100;

/// 速度字节偏移（`speed + 128`）
pub const SPEED_OFFSET: i32 = 128;

/// 功率为 0 且启用刹车时发送的速度字节
pub const SPEED_BRAKE: u8 = 0x02;

/// 电机板命令
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum MotorCommand {
    /// 复位电机板
    Reset = 0x00,
    /// 查询固件版本（响应为一行 ASCII）
    Version = 0x01,
    /// 设置通道 0 速度
    SpeedCh0 = 0x02,
    /// 设置通道 1 速度
    SpeedCh1 = 0x03,
    /// 跳转到 bootloader
    Bootloader = 0x04,
}

impl MotorCommand {
    /// 编码为线上字节
    pub fn to_bytes(self) -> [u8; 1] {
        [self.into()]
    }
}

/// 电机通道编号
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MotorChannelId {
    Ch0,
    Ch1,
}

impl MotorChannelId {
    /// 所有通道（按编号顺序）
    pub const ALL: [MotorChannelId; 2] = [MotorChannelId::Ch0, MotorChannelId::Ch1];

    /// 通道索引（0 或 1）
    pub fn index(self) -> usize {
        match self {
            MotorChannelId::Ch0 => 0,
            MotorChannelId::Ch1 => 1,
        }
    }

    /// 该通道对应的速度命令
    pub fn speed_command(self) -> MotorCommand {
        match self {
            MotorChannelId::Ch0 => MotorCommand::SpeedCh0,
            MotorChannelId::Ch1 => MotorCommand::SpeedCh1,
        }
    }
}

impl TryFrom<usize> for MotorChannelId {
    type Error = ProtocolError;

    fn try_from(index: usize) -> Result<Self, Self::Error> {
        match index {
            0 => Ok(MotorChannelId::Ch0),
            1 => Ok(MotorChannelId::Ch1),
            _ => Err(ProtocolError::OutOfRange {
                field: "motor channel",
                value: index as i64,
                min: 0,
                max: 1,
            }),
        }
    }
}

/// 将请求功率限制到 [-PWM_MAX, PWM_MAX]
pub fn clamp_power(power: i32) -> i32 {
    power.clamp(-PWM_MAX, PWM_MAX)
}

/// 编码速度字节
///
/// 限幅后的功率为 0 且启用刹车时返回 [`SPEED_BRAKE`]，否则返回 `clamped + 128`。
pub fn encode_speed(power: i32, use_brake: bool) -> u8 {
    let clamped = clamp_power(power);
    if clamped == 0 && use_brake {
        SPEED_BRAKE
    } else {
        // clamped ∈ [-100, 100]，偏移后 ∈ [28, 228]
        (clamped + SPEED_OFFSET) as u8
    }
}

/// 速度设定命令（2 字节：命令 + 速度字节）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpeedCommand {
    pub channel: MotorChannelId,
    pub power: i32,
    pub use_brake: bool,
}

impl SpeedCommand {
    pub fn new(channel: MotorChannelId, power: i32, use_brake: bool) -> Self {
        Self {
            channel,
            power,
            use_brake,
        }
    }

    /// 编码为线上字节
    pub fn to_bytes(self) -> [u8; 2] {
        [
            self.channel.speed_command().into(),
            encode_speed(self.power, self.use_brake),
        ]
    }
}
