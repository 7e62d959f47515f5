//! USB 控制传输设备（基于 `rusb`）
//!
//! 电源板只使用 endpoint 0 上的控制传输，不需要 claim 接口。

use rusb::{DeviceHandle, GlobalContext};
use std::time::Duration;
use tracing::debug;

use crate::{ControlTransport, TransportError};

/// 已打开的 USB 设备句柄
pub struct UsbControlDevice {
    handle: DeviceHandle<GlobalContext>,
    bus: u8,
    address: u8,
}

impl UsbControlDevice {
    /// 按总线号和设备地址打开设备
    ///
    /// 枚举由上层完成；这里只负责找到已枚举的设备并打开它。
    pub fn open(bus: u8, address: u8) -> Result<Self, TransportError> {
        for device in rusb::devices()?.iter() {
            if device.bus_number() == bus && device.address() == address {
                let handle = device.open()?;
                debug!("Opened USB device on bus {} at address {}", bus, address);
                return Ok(Self {
                    handle,
                    bus,
                    address,
                });
            }
        }

        Err(TransportError::DeviceNotFound { bus, address })
    }

    /// 包装一个已经打开的设备句柄
    pub fn from_handle(handle: DeviceHandle<GlobalContext>) -> Self {
        let device = handle.device();
        let bus = device.bus_number();
        let address = device.address();
        Self {
            handle,
            bus,
            address,
        }
    }

    pub fn bus(&self) -> u8 {
        self.bus
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    /// 读取设备序列号（没有序列号描述符时返回 `None`）
    pub fn serial_number(&self) -> Option<String> {
        let desc = self.handle.device().device_descriptor().ok()?;
        match desc.serial_number_string_index() {
            Some(idx) if idx != 0 => self.handle.read_string_descriptor_ascii(idx).ok(),
            _ => None,
        }
    }
}

impl ControlTransport for UsbControlDevice {
    fn read_control(
        &self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<usize, TransportError> {
        self.handle
            .read_control(request_type, request, value, index, buf, timeout)
            .map_err(TransportError::Usb)
    }

    fn write_control(
        &self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        data: &[u8],
        timeout: Duration,
    ) -> Result<usize, TransportError> {
        self.handle
            .write_control(request_type, request, value, index, data, timeout)
            .map_err(TransportError::Usb)
    }
}

impl std::fmt::Debug for UsbControlDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UsbControlDevice")
            .field("bus", &self.bus)
            .field("address", &self.address)
            .finish()
    }
}
