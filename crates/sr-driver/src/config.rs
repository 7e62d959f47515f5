//! 驱动层配置
//!
//! 所有字段都有默认值，配置文件里缺省的字段会回退到默认值。

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 行协议命令的默认尝试次数
pub const DEFAULT_COMMAND_RETRIES: u32 = 10;
/// 串口默认读超时（ms）
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 100;
/// 进入 bootloader 时使用的读超时（ms）
pub const DEFAULT_BOOTLOADER_TIMEOUT_MS: u64 = 500;
/// USB 控制传输默认超时（ms）
pub const DEFAULT_TRANSFER_TIMEOUT_MS: u64 = 1000;

/// 行协议通道配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// 每条命令最多尝试的次数（写 + 读算一次）
    pub command_retries: u32,
    /// 读一行的超时（ms）
    pub read_timeout_ms: u64,
    /// bootloader 握手的读超时（ms）
    pub bootloader_timeout_ms: u64,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            command_retries: DEFAULT_COMMAND_RETRIES,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
            bootloader_timeout_ms: DEFAULT_BOOTLOADER_TIMEOUT_MS,
        }
    }
}

impl ChannelConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn bootloader_timeout(&self) -> Duration {
        Duration::from_millis(self.bootloader_timeout_ms)
    }

    /// 至少尝试一次
    pub fn attempts(&self) -> u32 {
        self.command_retries.max(1)
    }
}

/// USB 控制传输配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// 单次控制传输超时（ms）
    pub transfer_timeout_ms: u64,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            transfer_timeout_ms: DEFAULT_TRANSFER_TIMEOUT_MS,
        }
    }
}

impl ControlConfig {
    pub fn transfer_timeout(&self) -> Duration {
        Duration::from_millis(self.transfer_timeout_ms)
    }
}

/// 固件版本不匹配时的处理策略
///
/// - **Strict**: 关闭传输并返回错误（命令编码依赖固件版本的板子）
/// - **Warn**: 记录警告后继续使用
/// - **Skip**: 不检查（仍然会发送版本查询以确认板子在线）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FirmwarePolicy {
    #[default]
    Strict,
    Warn,
    Skip,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_config_defaults() {
        let config = ChannelConfig::default();
        assert_eq!(config.command_retries, 10);
        assert_eq!(config.read_timeout(), Duration::from_millis(100));
        assert_eq!(config.bootloader_timeout(), Duration::from_millis(500));
    }

    #[test]
    fn test_attempts_never_zero() {
        let config = ChannelConfig {
            command_retries: 0,
            ..Default::default()
        };
        assert_eq!(config.attempts(), 1);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: ChannelConfig = toml::from_str("command_retries = 3").unwrap();
        assert_eq!(config.command_retries, 3);
        assert_eq!(config.read_timeout_ms, DEFAULT_READ_TIMEOUT_MS);

        let config: ControlConfig = toml::from_str("").unwrap();
        assert_eq!(config.transfer_timeout(), Duration::from_millis(1000));
    }

    #[test]
    fn test_firmware_policy_serde() {
        #[derive(Deserialize)]
        struct Wrapper {
            policy: FirmwarePolicy,
        }
        let w: Wrapper = toml::from_str("policy = \"warn\"").unwrap();
        assert_eq!(w.policy, FirmwarePolicy::Warn);
        assert_eq!(FirmwarePolicy::default(), FirmwarePolicy::Strict);
    }
}
