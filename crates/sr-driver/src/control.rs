//! 电源板控制传输协议
//!
//! 把 opcode 读写映射为 USB 控制传输（bRequest = 64，opcode 放在 wIndex）。
//! 控制传输没有部分完成的中间态，所以这里不做重试；读到的字节数少于期望
//! 时返回 [`DriverError::InvalidResponse`]。

use parking_lot::RwLock;
use sr_protocol::{POWER_REQUEST, POWER_REQUEST_TYPE_READ, POWER_REQUEST_TYPE_WRITE};
use sr_transport::{ControlTransport, TransportError};
use tracing::debug;

use crate::config::ControlConfig;
use crate::error::DriverError;

/// 控制传输协议
///
/// 传输本身允许并发调用；关闭时会等待进行中的传输结束。
pub struct ControlProtocol<T: ControlTransport> {
    transport: RwLock<Option<T>>,
    config: ControlConfig,
}

impl<T: ControlTransport> ControlProtocol<T> {
    pub fn new(transport: T, config: ControlConfig) -> Self {
        Self {
            transport: RwLock::new(Some(transport)),
            config,
        }
    }

    pub fn config(&self) -> &ControlConfig {
        &self.config
    }

    /// 读取 `opcode` 对应的定长数据
    pub fn read(&self, opcode: impl Into<u16>, expected_len: usize) -> Result<Vec<u8>, DriverError> {
        let opcode = opcode.into();
        let guard = self.transport.read();
        let transport = guard.as_ref().ok_or(TransportError::Closed)?;

        let mut buf = vec![0u8; expected_len];
        let len = transport.read_control(
            POWER_REQUEST_TYPE_READ,
            POWER_REQUEST,
            0,
            opcode,
            &mut buf,
            self.config.transfer_timeout(),
        )?;
        debug!(opcode, len, "control read");

        if len < expected_len {
            return Err(DriverError::InvalidResponse {
                expected: expected_len,
                actual: len,
            });
        }
        buf.truncate(len);
        Ok(buf)
    }

    /// 写 `opcode`，`value` 放在 wValue，`data` 为可选负载
    pub fn write(&self, opcode: impl Into<u16>, value: u16, data: &[u8]) -> Result<(), DriverError> {
        let opcode = opcode.into();
        let guard = self.transport.read();
        let transport = guard.as_ref().ok_or(TransportError::Closed)?;

        let written = transport.write_control(
            POWER_REQUEST_TYPE_WRITE,
            POWER_REQUEST,
            value,
            opcode,
            data,
            self.config.transfer_timeout(),
        )?;
        debug!(opcode, value, len = data.len(), written, "control write");
        Ok(())
    }

    /// 关闭并释放传输，重复关闭是无操作
    pub fn close(&self) {
        if self.transport.write().take().is_some() {
            debug!("control protocol closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.transport.read().is_none()
    }
}

impl<T: ControlTransport> std::fmt::Debug for ControlProtocol<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlProtocol")
            .field("config", &self.config)
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sr_protocol::{PowerReadOpcode, PowerWriteOpcode};
    use sr_transport::mock::{ControlDirection, MockUsb};

    #[test]
    fn test_read_uses_read_request_type() {
        let usb = MockUsb::new();
        usb.set_read_response(8, 1i32.to_le_bytes());
        let protocol = ControlProtocol::new(usb.clone(), ControlConfig::default());

        let data = protocol.read(PowerReadOpcode::Button, 4).unwrap();
        assert_eq!(data, vec![1, 0, 0, 0]);

        let transfer = &usb.transfers()[0];
        assert_eq!(transfer.direction, ControlDirection::In);
        assert_eq!(transfer.request_type, 0x80);
        assert_eq!(transfer.request, 64);
        assert_eq!(transfer.value, 0);
        assert_eq!(transfer.index, 8);
    }

    #[test]
    fn test_short_read_is_invalid_response() {
        let usb = MockUsb::new();
        usb.set_read_response(7, vec![0u8; 3]);
        let protocol = ControlProtocol::new(usb, ControlConfig::default());

        assert!(matches!(
            protocol.read(PowerReadOpcode::Battery, 8),
            Err(DriverError::InvalidResponse {
                expected: 8,
                actual: 3
            })
        ));
    }

    #[test]
    fn test_write_uses_write_request_type() {
        let usb = MockUsb::new();
        let protocol = ControlProtocol::new(usb.clone(), ControlConfig::default());

        protocol.write(PowerWriteOpcode::RunLed, 1, &[]).unwrap();

        let transfer = &usb.transfers()[0];
        assert_eq!(transfer.direction, ControlDirection::Out);
        assert_eq!(transfer.request_type, 0x00);
        assert_eq!(transfer.request, 64);
        assert_eq!(transfer.value, 1);
        assert_eq!(transfer.index, 6);
        assert!(transfer.data.is_empty());
    }

    #[test]
    fn test_transport_error_propagates() {
        let usb = MockUsb::new();
        usb.fail_next(rusb_error());
        let protocol = ControlProtocol::new(usb, ControlConfig::default());
        assert!(matches!(
            protocol.write(PowerWriteOpcode::ErrorLed, 0, &[]),
            Err(DriverError::Transport(TransportError::Usb(_)))
        ));
    }

    #[test]
    fn test_closed_protocol_rejects_transfers() {
        let usb = MockUsb::new();
        let protocol = ControlProtocol::new(usb.clone(), ControlConfig::default());
        protocol.close();
        protocol.close();
        assert!(protocol.is_closed());
        assert!(matches!(
            protocol.write(PowerWriteOpcode::RunLed, 1, &[]),
            Err(DriverError::Transport(TransportError::Closed))
        ));
        assert_eq!(usb.transfer_count(), 0);
    }

    fn rusb_error() -> sr_transport::rusb::Error {
        sr_transport::rusb::Error::Io
    }
}
