//! 驱动层错误类型定义

use sr_protocol::ProtocolError;
use sr_transport::TransportError;
use thiserror::Error;

/// 驱动层错误类型
#[derive(Error, Debug)]
pub enum DriverError {
    /// 传输层错误（打开、关闭、读写失败），原样向上传递
    #[error("Transport unavailable: {0}")]
    Transport(#[from] TransportError),

    /// 协议解析错误
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// 行协议重试次数耗尽
    #[error("Communications failed for command '{command}' after {attempts} attempts")]
    CommandFailed { command: String, attempts: u32 },

    /// 版本查询始终没有得到完整的一行
    #[error(
        "Failed to read firmware version from '{device}'. Please ensure that it is powered properly."
    )]
    FirmwareReadFailed { device: String },

    /// 固件版本不匹配
    #[error("Found wrong firmware version in '{device}'. Expecting {expected:?}, got {actual:?}.")]
    IncorrectFirmware {
        device: String,
        expected: String,
        actual: String,
    },

    /// 参数无效（在任何传输之前被拒绝）
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// 控制读返回的字节数不足
    #[error("Invalid response from device: expected {expected} bytes, got {actual}")]
    InvalidResponse { expected: usize, actual: usize },
}

impl DriverError {
    /// 构造参数错误
    pub fn invalid_argument(reason: impl std::fmt::Display) -> Self {
        DriverError::InvalidArgument(reason.to_string())
    }

    /// 判断是否为致命错误
    ///
    /// 参数错误在发送前就被拒绝，不影响设备状态；其余错误都意味着
    /// 与设备的通信已不可信。
    pub fn is_fatal(&self) -> bool {
        !matches!(self, DriverError::InvalidArgument(_))
    }
}

/// 以可读形式渲染命令字节（非 ASCII 字节转义）
pub(crate) fn describe_command(command: &[u8]) -> String {
    command.escape_ascii().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_error_display() {
        let err = DriverError::CommandFailed {
            command: describe_command(b"ra"),
            attempts: 10,
        };
        let msg = err.to_string();
        assert!(msg.contains("'ra'"));
        assert!(msg.contains("10 attempts"));

        let err = DriverError::IncorrectFirmware {
            device: "SR0XJ1F".to_string(),
            expected: "MCV4B:3\n".to_string(),
            actual: "MCV4B:2\n".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("SR0XJ1F"));
        assert!(msg.contains("MCV4B:3\\n"));
        assert!(msg.contains("MCV4B:2\\n"));

        let err = DriverError::FirmwareReadFailed {
            device: "/dev/ttyACM0".to_string(),
        };
        assert!(err.to_string().contains("/dev/ttyACM0"));
    }

    #[test]
    fn test_describe_command_escapes_binary() {
        assert_eq!(describe_command(&[0x01]), "\\x01");
        assert_eq!(describe_command(b"v"), "v");
    }

    #[test]
    fn test_from_transport_error() {
        let err: DriverError = TransportError::Closed.into();
        assert!(matches!(err, DriverError::Transport(TransportError::Closed)));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_from_protocol_error() {
        let err: DriverError = ProtocolError::ConflictingTone.into();
        assert!(matches!(err, DriverError::Protocol(ProtocolError::ConflictingTone)));
    }

    #[test]
    fn test_invalid_argument_is_not_fatal() {
        let err = DriverError::invalid_argument("output index 6 out of range");
        assert!(!err.is_fatal());
        assert!(err.to_string().contains("output index 6"));
    }
}
