//! 固件版本校验

use sr_protocol::firmware_family;
use sr_transport::LineTransport;
use tracing::{info, warn};

use crate::channel::CommandChannel;
use crate::config::FirmwarePolicy;
use crate::error::{DriverError, describe_command};

/// 期望的固件版本
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirmwareExpectation {
    /// 响应必须与字符串完全一致（含换行符）
    Exact(&'static str),
    /// 只比较 `:` 之前的固件族名
    Family(&'static str),
}

impl FirmwareExpectation {
    pub fn matches(&self, version: &str) -> bool {
        match self {
            FirmwareExpectation::Exact(expected) => version == *expected,
            FirmwareExpectation::Family(family) => firmware_family(version) == *family,
        }
    }

    fn expected(&self) -> &'static str {
        match self {
            FirmwareExpectation::Exact(expected) | FirmwareExpectation::Family(expected) => {
                expected
            },
        }
    }
}

/// 版本查询结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirmwareStatus {
    /// 设备返回的原始版本行
    pub version: String,
    /// 是否符合期望（`Skip` 策略下总是 `true`）
    pub matched: bool,
}

/// 发送版本查询并返回版本行
///
/// 重试耗尽映射为 [`DriverError::FirmwareReadFailed`]。非 UTF-8 的响应按
/// `escape_ascii` 转义保存，不丢失原始字节。
pub fn query_firmware<T: LineTransport>(
    channel: &CommandChannel<T>,
    query: &[u8],
) -> Result<String, DriverError> {
    match channel.exchange(query) {
        Ok(response) => {
            Ok(String::from_utf8(response).unwrap_or_else(|e| describe_command(e.as_bytes())))
        },
        Err(DriverError::CommandFailed { .. }) => Err(DriverError::FirmwareReadFailed {
            device: channel.device().to_string(),
        }),
        Err(e) => Err(e),
    }
}

/// 查询固件版本并按 `policy` 处理不匹配
///
/// 无论策略如何都会发送查询，读不到版本总是错误。
pub fn verify_firmware<T: LineTransport>(
    channel: &CommandChannel<T>,
    query: &[u8],
    expectation: FirmwareExpectation,
    policy: FirmwarePolicy,
) -> Result<FirmwareStatus, DriverError> {
    let version = query_firmware(channel, query)?;
    let matched = policy == FirmwarePolicy::Skip || expectation.matches(&version);

    if matched {
        info!(device = channel.device(), version = %version.trim_end(), "firmware version");
    } else if policy == FirmwarePolicy::Warn {
        warn!(
            device = channel.device(),
            expected = ?expectation.expected(),
            actual = ?version,
            "unexpected firmware version"
        );
    } else {
        return Err(DriverError::IncorrectFirmware {
            device: channel.device().to_string(),
            expected: expectation.expected().to_string(),
            actual: version,
        });
    }

    Ok(FirmwareStatus { version, matched })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChannelConfig;
    use sr_transport::mock::MockSerial;

    fn channel_replying(reply: &'static str) -> CommandChannel<MockSerial> {
        let serial = MockSerial::new(move |_| reply.as_bytes().to_vec());
        CommandChannel::new(serial, ChannelConfig::default(), "SR0TEST").unwrap()
    }

    #[test]
    fn test_expectation_matching() {
        let exact = FirmwareExpectation::Exact("MCV4B:3\n");
        assert!(exact.matches("MCV4B:3\n"));
        assert!(!exact.matches("MCV4B:3"));
        assert!(!exact.matches("MCV4B:2\n"));

        let family = FirmwareExpectation::Family("SRduino");
        assert!(family.matches("SRduino:1.0\n"));
        assert!(!family.matches("Arduino:1.0\n"));
    }

    #[test]
    fn test_strict_mismatch_fails() {
        let channel = channel_replying("MCV4B:2\n");
        let result = verify_firmware(
            &channel,
            &[0x01],
            FirmwareExpectation::Exact("MCV4B:3\n"),
            FirmwarePolicy::Strict,
        );
        match result {
            Err(DriverError::IncorrectFirmware {
                device, actual, ..
            }) => {
                assert_eq!(device, "SR0TEST");
                assert_eq!(actual, "MCV4B:2\n");
            },
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_warn_mismatch_continues() {
        let channel = channel_replying("Arduino:1\n");
        let status = verify_firmware(
            &channel,
            b"v",
            FirmwareExpectation::Family("SRduino"),
            FirmwarePolicy::Warn,
        )
        .unwrap();
        assert!(!status.matched);
        assert_eq!(status.version, "Arduino:1\n");
    }

    #[test]
    fn test_skip_still_queries() {
        let serial = MockSerial::new(|_| b"anything\n".to_vec());
        let wire = serial.clone();
        let channel = CommandChannel::new(serial, ChannelConfig::default(), "x").unwrap();
        let status = verify_firmware(
            &channel,
            b"v",
            FirmwareExpectation::Exact("other\n"),
            FirmwarePolicy::Skip,
        )
        .unwrap();
        assert!(status.matched);
        assert_eq!(wire.write_count(), 1);
    }

    #[test]
    fn test_non_utf8_version_is_escaped() {
        let serial = MockSerial::new(|_| b"MCV4B:\xff\n".to_vec());
        let channel = CommandChannel::new(serial, ChannelConfig::default(), "SR0TEST").unwrap();
        let result = verify_firmware(
            &channel,
            &[0x01],
            FirmwareExpectation::Exact("MCV4B:3\n"),
            FirmwarePolicy::Strict,
        );
        match result {
            Err(DriverError::IncorrectFirmware { actual, .. }) => {
                assert_eq!(actual, "MCV4B:\\xff\\n");
            },
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_silent_device_is_read_failure() {
        let channel =
            CommandChannel::new(MockSerial::silent(), ChannelConfig::default(), "/dev/ttyACM9")
                .unwrap();
        assert!(matches!(
            query_firmware(&channel, &[0x01]),
            Err(DriverError::FirmwareReadFailed { device }) if device == "/dev/ttyACM9"
        ));
    }
}
