//! # 硬件配置
//!
//! 描述一台机器人上连接了哪些外设板，以及通道调优参数。
//!
//! ```toml
//! [[motors]]
//! path = "/dev/ttyACM0"
//! serial_number = "SR0XJ1F"
//!
//! [[ruggeduinos]]
//! path = "/dev/ttyACM1"
//! firmware_policy = "warn"
//!
//! [power]
//! bus = 1
//! address = 7
//!
//! [channel]
//! command_retries = 10
//! ```

use serde::{Deserialize, Serialize};
use sr_driver::{ChannelConfig, ControlConfig, FirmwarePolicy};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// 配置加载/保存错误
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to access config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// 电机板条目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MotorBoardConfig {
    /// 串口路径
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    #[serde(default)]
    pub firmware_policy: FirmwarePolicy,
}

/// I/O 板条目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuggeduinoConfig {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    /// 默认 `warn`：非 SR 固件只记录警告
    #[serde(default = "default_ruggeduino_policy")]
    pub firmware_policy: FirmwarePolicy,
}

fn default_ruggeduino_policy() -> FirmwarePolicy {
    FirmwarePolicy::Warn
}

/// 电源板条目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerBoardConfig {
    /// USB 总线号
    pub bus: u8,
    /// USB 设备地址
    pub address: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
}

/// 整机硬件配置
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HardwareConfig {
    pub motors: Vec<MotorBoardConfig>,
    pub ruggeduinos: Vec<RuggeduinoConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub power: Option<PowerBoardConfig>,
    /// 串口板共用的通道参数
    pub channel: ChannelConfig,
    /// 电源板控制传输参数
    pub control: ControlConfig,
}

impl HardwareConfig {
    /// 从 TOML 文件加载
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// 保存为 TOML 文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config() {
        let config = HardwareConfig::from_toml_str("").unwrap();
        assert!(config.motors.is_empty());
        assert!(config.power.is_none());
        assert_eq!(config.channel, ChannelConfig::default());
    }

    #[test]
    fn test_policy_defaults_per_board() {
        let config = HardwareConfig::from_toml_str(
            r#"
            [[motors]]
            path = "/dev/ttyACM0"

            [[ruggeduinos]]
            path = "/dev/ttyACM1"
            "#,
        )
        .unwrap();
        assert_eq!(config.motors[0].firmware_policy, FirmwarePolicy::Strict);
        assert_eq!(config.ruggeduinos[0].firmware_policy, FirmwarePolicy::Warn);
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            HardwareConfig::from_toml_str("motors = 3"),
            Err(ConfigError::Parse(_))
        ));
    }
}
