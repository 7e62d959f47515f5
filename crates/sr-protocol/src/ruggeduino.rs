//! I/O 板（Ruggeduino，SR 固件）协议定义
//!
//! 每条命令是一个 ASCII 字母加一个编码后的引脚字母（版本查询只有一个字母），
//! 每条命令都有一行 ASCII 响应。

use std::fmt;
use std::str::FromStr;

use crate::{ProtocolError, firmware_family};

/// I/O 板串口波特率
pub const RUGGEDUINO_BAUD_RATE: u32 = 115_200;

/// SR 固件版本字符串的前缀（`:` 之前的部分）
pub const SRDUINO_FIRMWARE_PREFIX: &str = "SRduino";

/// 引脚编码的最大索引（`'a'..='z'`）
pub const MAX_PIN_INDEX: u8 = 25;

/// 10 位 ADC 满量程读数
pub const ADC_MAX: u16 = 1023;

/// ADC 参考电压（V）
pub const ADC_REFERENCE_VOLTS: f64 = 5.0;

/// 引脚模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PinMode {
    Input,
    Output,
    InputPullup,
}

impl PinMode {
    /// 模式选择命令字母
    pub fn command_byte(self) -> u8 {
        match self {
            PinMode::Input => b'i',
            PinMode::Output => b'o',
            PinMode::InputPullup => b'p',
        }
    }
}

impl fmt::Display for PinMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PinMode::Input => "INPUT",
            PinMode::Output => "OUTPUT",
            PinMode::InputPullup => "INPUT_PULLUP",
        };
        f.write_str(name)
    }
}

impl FromStr for PinMode {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "INPUT" => Ok(PinMode::Input),
            "OUTPUT" => Ok(PinMode::Output),
            "INPUT_PULLUP" => Ok(PinMode::InputPullup),
            _ => Err(ProtocolError::ParseError(format!("unknown pin mode '{s}'"))),
        }
    }
}

/// 已校验的引脚编号
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pin(u8);

impl Pin {
    /// 创建引脚编号，超出 `0..=25` 返回错误
    pub fn new(index: u8) -> Result<Self, ProtocolError> {
        if index > MAX_PIN_INDEX {
            return Err(ProtocolError::OutOfRange {
                field: "pin",
                value: index as i64,
                min: 0,
                max: MAX_PIN_INDEX as i64,
            });
        }
        Ok(Self(index))
    }

    pub fn index(self) -> u8 {
        self.0
    }

    /// 编码为 `'a' + index`
    pub fn encode(self) -> u8 {
        b'a' + self.0
    }
}

/// I/O 板命令
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuggeduinoCommand {
    /// 查询固件版本
    Version,
    /// 设置引脚模式
    SetPinMode { pin: Pin, mode: PinMode },
    /// 数字读
    DigitalRead(Pin),
    /// 数字写
    DigitalWrite { pin: Pin, high: bool },
    /// 模拟读
    AnalogueRead(Pin),
}

impl RuggeduinoCommand {
    /// 编码为定长缓冲区
    pub fn encode(self) -> EncodedCommand {
        match self {
            RuggeduinoCommand::Version => EncodedCommand::one(b'v'),
            RuggeduinoCommand::SetPinMode { pin, mode } => {
                EncodedCommand::two(mode.command_byte(), pin.encode())
            },
            RuggeduinoCommand::DigitalRead(pin) => EncodedCommand::two(b'r', pin.encode()),
            RuggeduinoCommand::DigitalWrite { pin, high } => {
                EncodedCommand::two(if high { b'h' } else { b'l' }, pin.encode())
            },
            RuggeduinoCommand::AnalogueRead(pin) => EncodedCommand::two(b'a', pin.encode()),
        }
    }
}

/// 编码后的行协议命令（最多 2 字节）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodedCommand {
    buf: [u8; 2],
    len: usize,
}

impl EncodedCommand {
    fn one(b0: u8) -> Self {
        Self {
            buf: [b0, 0],
            len: 1,
        }
    }

    fn two(b0: u8, b1: u8) -> Self {
        Self {
            buf: [b0, b1],
            len: 2,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }
}

/// 解析数字读响应：首字节为 `'h'` 表示高电平
pub fn decode_digital(response: &[u8]) -> bool {
    response.first() == Some(&b'h')
}

/// 解析模拟读响应（ASCII 十进制，0–1023）
pub fn decode_analogue(response: &[u8]) -> Result<u16, ProtocolError> {
    let text = std::str::from_utf8(response)
        .map_err(|e| ProtocolError::ParseError(format!("analogue reading is not ASCII: {e}")))?;
    let reading: i64 = text.trim().parse().map_err(|e| {
        ProtocolError::ParseError(format!("invalid analogue reading {:?}: {e}", text.trim()))
    })?;
    if !(0..=ADC_MAX as i64).contains(&reading) {
        return Err(ProtocolError::OutOfRange {
            field: "analogue reading",
            value: reading,
            min: 0,
            max: ADC_MAX as i64,
        });
    }
    Ok(reading as u16)
}

/// 将 10 位 ADC 读数换算为电压（V）
pub fn adc_to_voltage(reading: u16) -> f64 {
    (reading as f64 / ADC_MAX as f64) * ADC_REFERENCE_VOLTS
}

/// 版本响应是否来自 SR 固件（`:` 前的部分等于 `SRduino`）
pub fn is_srduino_version(response: &str) -> bool {
    firmware_family(response) == SRDUINO_FIRMWARE_PREFIX
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pin(index: u8) -> Pin {
        Pin::new(index).unwrap()
    }

    #[test]
    fn test_pin_encoding() {
        assert_eq!(pin(0).encode(), b'a');
        assert_eq!(pin(13).encode(), b'n');
        assert_eq!(pin(25).encode(), b'z');
        assert!(Pin::new(26).is_err());
    }

    #[test]
    fn test_command_encoding() {
        assert_eq!(RuggeduinoCommand::Version.encode().as_bytes(), b"v");
        assert_eq!(
            RuggeduinoCommand::SetPinMode {
                pin: pin(2),
                mode: PinMode::InputPullup
            }
            .encode()
            .as_bytes(),
            b"pc"
        );
        assert_eq!(RuggeduinoCommand::DigitalRead(pin(3)).encode().as_bytes(), b"rd");
        assert_eq!(
            RuggeduinoCommand::DigitalWrite {
                pin: pin(4),
                high: true
            }
            .encode()
            .as_bytes(),
            b"he"
        );
        assert_eq!(
            RuggeduinoCommand::DigitalWrite {
                pin: pin(4),
                high: false
            }
            .encode()
            .as_bytes(),
            b"le"
        );
        assert_eq!(RuggeduinoCommand::AnalogueRead(pin(14)).encode().as_bytes(), b"ao");
    }

    #[test]
    fn test_decode_digital() {
        assert!(decode_digital(b"h\n"));
        assert!(!decode_digital(b"l\n"));
        assert!(!decode_digital(b""));
    }

    #[test]
    fn test_decode_analogue() {
        assert_eq!(decode_analogue(b"0\n"), Ok(0));
        assert_eq!(decode_analogue(b"1023\n"), Ok(1023));
        assert_eq!(decode_analogue(b" 512\r\n"), Ok(512));
        assert!(matches!(
            decode_analogue(b"1024\n"),
            Err(ProtocolError::OutOfRange { .. })
        ));
        assert!(matches!(
            decode_analogue(b"abc\n"),
            Err(ProtocolError::ParseError(_))
        ));
    }

    #[test]
    fn test_adc_to_voltage() {
        assert_eq!(adc_to_voltage(0), 0.0);
        assert_eq!(adc_to_voltage(1023), 5.0);
        assert!((adc_to_voltage(512) - 2.502_443).abs() < 1e-5);
    }

    #[test]
    fn test_is_srduino_version() {
        assert!(is_srduino_version("SRduino:1.2\n"));
        assert!(is_srduino_version("SRduino\n"));
        assert!(!is_srduino_version("Arduino:1.0\n"));
        assert!(!is_srduino_version("SRduinoX:1\n"));
    }

    #[test]
    fn test_pin_mode_parse_and_display() {
        assert_eq!("input_pullup".parse::<PinMode>(), Ok(PinMode::InputPullup));
        assert_eq!(PinMode::Output.to_string(), "OUTPUT");
        assert!("analog".parse::<PinMode>().is_err());
    }
}
