//! 电源板 USB 控制传输协议定义
//!
//! 所有请求都使用 bRequest = 64，opcode 放在 wIndex 中：
//!
//! | 方向 | bmRequestType | wValue | wIndex | data |
//! |------|---------------|--------|--------|------|
//! | 写   | `0x00`        | 值     | opcode | 可选 |
//! | 读   | `0x80`        | 0      | opcode | 定长 |
//!
//! 读写使用两套独立的 opcode 命名空间（例如 6 在写侧是运行 LED，
//! 在读侧是 5V 电源轨遥测）。

use num_enum::IntoPrimitive;

use crate::{ProtocolError, bytes_to_i32_le};

/// 电源板所有控制请求使用的 bRequest
pub const POWER_REQUEST: u8 = 64;

/// USB Control Transfer: Host to Device | Standard | Device
pub const POWER_REQUEST_TYPE_WRITE: u8 = 0x00;
/// USB Control Transfer: Device to Host | Standard | Device
pub const POWER_REQUEST_TYPE_READ: u8 = 0x80;

/// 可独立开关的输出电源轨数量
pub const OUTPUT_COUNT: usize = 6;

/// 电池遥测响应长度（两个 i32）
pub const BATTERY_RESPONSE_LEN: usize = 8;
/// 按钮状态响应长度（一个 i32）
pub const BUTTON_RESPONSE_LEN: usize = 4;
/// 单个蜂鸣音在 piezo 负载中占用的字节数
pub const PIEZO_TONE_LEN: usize = 4;

/// 写侧 opcode
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive)]
#[repr(u16)]
pub enum PowerWriteOpcode {
    Output0 = 0,
    Output1 = 1,
    Output2 = 2,
    Output3 = 3,
    Output4 = 4,
    Output5 = 5,
    RunLed = 6,
    ErrorLed = 7,
    Piezo = 8,
}

/// 读侧 opcode
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive)]
#[repr(u16)]
pub enum PowerReadOpcode {
    Output0 = 0,
    Output1 = 1,
    Output2 = 2,
    Output3 = 3,
    Output4 = 4,
    Output5 = 5,
    FiveVoltRail = 6,
    Battery = 7,
    Button = 8,
}

/// 已校验的输出电源轨索引（`0..6`）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OutputIndex(u8);

impl OutputIndex {
    /// 创建输出索引，超出 `0..6` 返回错误
    pub fn new(index: usize) -> Result<Self, ProtocolError> {
        if index >= OUTPUT_COUNT {
            return Err(ProtocolError::OutOfRange {
                field: "output index",
                value: index as i64,
                min: 0,
                max: OUTPUT_COUNT as i64 - 1,
            });
        }
        Ok(Self(index as u8))
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// 该电源轨的写 opcode
    pub fn write_opcode(self) -> PowerWriteOpcode {
        match self.0 {
            0 => PowerWriteOpcode::Output0,
            1 => PowerWriteOpcode::Output1,
            2 => PowerWriteOpcode::Output2,
            3 => PowerWriteOpcode::Output3,
            4 => PowerWriteOpcode::Output4,
            // 构造时已保证 < OUTPUT_COUNT
            _ => PowerWriteOpcode::Output5,
        }
    }
}

/// 布尔值转换为 wValue（0 或 1）
pub fn bool_value(on: bool) -> u16 {
    u16::from(on)
}

fn read_i32_le(data: &[u8], offset: usize) -> i32 {
    bytes_to_i32_le([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}

fn check_len(data: &[u8], expected: usize) -> Result<(), ProtocolError> {
    if data.len() < expected {
        return Err(ProtocolError::InvalidLength {
            expected,
            actual: data.len(),
        });
    }
    Ok(())
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// 电池遥测原始读数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BatteryReading {
    /// 电流（mA）
    pub current_ma: i32,
    /// 电压（mV）
    pub voltage_mv: i32,
}

impl BatteryReading {
    /// 解析 8 字节响应（current 在前，voltage 在后，均为小端 i32）
    pub fn decode(data: &[u8]) -> Result<Self, ProtocolError> {
        check_len(data, BATTERY_RESPONSE_LEN)?;
        Ok(Self {
            current_ma: read_i32_le(data, 0),
            voltage_mv: read_i32_le(data, 4),
        })
    }

    /// 电压（V），保留两位小数
    pub fn voltage(&self) -> f64 {
        round2(self.voltage_mv as f64 / 1000.0)
    }

    /// 电流（A），保留两位小数
    pub fn current(&self) -> f64 {
        round2(self.current_ma as f64 / 1000.0)
    }
}

/// 解析按钮状态响应（非 0 即按下）
pub fn decode_button(data: &[u8]) -> Result<bool, ProtocolError> {
    check_len(data, BUTTON_RESPONSE_LEN)?;
    Ok(read_i32_le(data, 0) != 0)
}

/// 一个蜂鸣音
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PiezoTone {
    /// 频率（Hz）
    pub frequency: u16,
    /// 持续时间（ms）
    pub duration_ms: u16,
}

impl PiezoTone {
    pub fn new(frequency: u16, duration_ms: u16) -> Self {
        Self {
            frequency,
            duration_ms,
        }
    }

    /// 打包为 USB 传输负载（4 字节，频率在前）
    pub fn pack(&self) -> [u8; PIEZO_TONE_LEN] {
        let mut buf = [0u8; PIEZO_TONE_LEN];
        buf[0..2].copy_from_slice(&self.frequency.to_le_bytes());
        buf[2..4].copy_from_slice(&self.duration_ms.to_le_bytes());
        buf
    }
}

/// 将多个蜂鸣音拼接为一次 piezo 传输的负载
pub fn encode_piezo(tones: &[PiezoTone]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(tones.len() * PIEZO_TONE_LEN);
    for tone in tones {
        buf.extend_from_slice(&tone.pack());
    }
    buf
}
