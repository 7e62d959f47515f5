//! I/O 板（Ruggeduino）
//!
//! 每个操作都是一次完整的命令交换，由通道锁保证多线程下命令与响应一一对应。

use sr_driver::{
    ChannelConfig, CommandChannel, DriverError, FirmwareExpectation, FirmwarePolicy,
    query_firmware, verify_firmware,
};
use sr_protocol::{
    Pin, PinMode, RUGGEDUINO_BAUD_RATE, RuggeduinoCommand, SRDUINO_FIRMWARE_PREFIX, adc_to_voltage,
    decode_analogue, decode_digital, is_srduino_version,
};
use sr_transport::{LineTransport, SerialPortTransport};
use std::fmt;
use tracing::info;

/// 通过串口连接的 I/O 板
pub type SerialRuggeduino = Ruggeduino<SerialPortTransport>;

/// 运行 SR 固件的 I/O 板
pub struct Ruggeduino<T: LineTransport> {
    link: CommandChannel<T>,
    serial_number: Option<String>,
}

impl Ruggeduino<SerialPortTransport> {
    /// 打开串口并检查固件
    pub fn open(
        path: &str,
        serial_number: Option<String>,
        policy: FirmwarePolicy,
        config: ChannelConfig,
    ) -> Result<Self, DriverError> {
        let transport =
            SerialPortTransport::open(path, RUGGEDUINO_BAUD_RATE, config.read_timeout())?;
        let serial_number = serial_number.or_else(|| Some(path.to_string()));
        Self::new(transport, serial_number, policy, config)
    }
}

impl<T: LineTransport> Ruggeduino<T> {
    /// 接管已打开的传输并检查是否为 SR 固件
    ///
    /// 推荐使用 [`FirmwarePolicy::Warn`]：非 SR 固件只记录警告。
    pub fn new(
        transport: T,
        serial_number: Option<String>,
        policy: FirmwarePolicy,
        config: ChannelConfig,
    ) -> Result<Self, DriverError> {
        let device = serial_number
            .clone()
            .unwrap_or_else(|| "ruggeduino".to_string());
        let link = CommandChannel::new(transport, config, device)?;

        if let Err(e) = verify_firmware(
            &link,
            RuggeduinoCommand::Version.encode().as_bytes(),
            FirmwareExpectation::Family(SRDUINO_FIRMWARE_PREFIX),
            policy,
        ) {
            link.close();
            return Err(e);
        }

        info!(device = link.device(), "ruggeduino opened");
        Ok(Self {
            link,
            serial_number,
        })
    }

    pub fn serial_number(&self) -> Option<&str> {
        self.serial_number.as_deref()
    }

    /// 发送原始命令并返回一行响应（供自定义固件使用）
    pub fn command(&self, data: &[u8]) -> Result<Vec<u8>, DriverError> {
        self.link.exchange(data)
    }

    /// 读取固件版本行
    pub fn firmware_version_read(&self) -> Result<String, DriverError> {
        query_firmware(&self.link, RuggeduinoCommand::Version.encode().as_bytes())
    }

    /// 板子是否运行 SR 固件
    pub fn is_srduino(&self) -> Result<bool, DriverError> {
        Ok(is_srduino_version(&self.firmware_version_read()?))
    }

    /// 设置引脚模式
    pub fn set_pin_mode(&self, pin: u8, mode: PinMode) -> Result<(), DriverError> {
        let pin = Self::pin(pin)?;
        self.run(RuggeduinoCommand::SetPinMode { pin, mode })?;
        Ok(())
    }

    /// 读数字引脚（高电平返回 `true`）
    pub fn digital_read(&self, pin: u8) -> Result<bool, DriverError> {
        let pin = Self::pin(pin)?;
        let response = self.run(RuggeduinoCommand::DigitalRead(pin))?;
        Ok(decode_digital(&response))
    }

    /// 写数字引脚
    pub fn digital_write(&self, pin: u8, high: bool) -> Result<(), DriverError> {
        let pin = Self::pin(pin)?;
        self.run(RuggeduinoCommand::DigitalWrite { pin, high })?;
        Ok(())
    }

    /// 读模拟引脚，返回电压（V，0.0–5.0）
    pub fn analogue_read(&self, pin: u8) -> Result<f64, DriverError> {
        let pin = Self::pin(pin)?;
        let response = self.run(RuggeduinoCommand::AnalogueRead(pin))?;
        Ok(adc_to_voltage(decode_analogue(&response)?))
    }

    pub fn close(&self) {
        if !self.link.is_closed() {
            self.link.close();
            info!(device = self.link.device(), "ruggeduino closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.link.is_closed()
    }

    fn pin(index: u8) -> Result<Pin, DriverError> {
        Pin::new(index).map_err(DriverError::invalid_argument)
    }

    fn run(&self, command: RuggeduinoCommand) -> Result<Vec<u8>, DriverError> {
        self.link.exchange(command.encode().as_bytes())
    }
}

impl<T: LineTransport> fmt::Debug for Ruggeduino<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ruggeduino")
            .field("serial_number", &self.serial_number)
            .finish()
    }
}

/// 运行非 SR 固件、不应由本库驱动的 I/O 板
///
/// 只记录设备位置，方便用户自行打开。
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct IgnoredRuggeduino {
    pub path: String,
    pub serial_number: Option<String>,
}

impl IgnoredRuggeduino {
    pub fn new(path: impl Into<String>, serial_number: Option<String>) -> Self {
        Self {
            path: path.into(),
            serial_number,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sr_transport::mock::MockSerial;

    /// 模拟 SR 固件：`r` 读回 `h`，`a` 读回 512，其余回显
    fn srduino() -> MockSerial {
        MockSerial::new(|cmd| match cmd {
            b"v" => b"SRduino:1\n".to_vec(),
            [b'r', _] => b"h\n".to_vec(),
            [b'a', _] => b"512\n".to_vec(),
            other => {
                let mut reply = other.to_vec();
                reply.push(b'\n');
                reply
            },
        })
    }

    fn open(serial: MockSerial) -> Ruggeduino<MockSerial> {
        Ruggeduino::new(serial, None, FirmwarePolicy::Warn, ChannelConfig::default()).unwrap()
    }

    #[test]
    fn test_commands_on_wire() {
        let serial = srduino();
        let wire = serial.clone();
        let board = open(serial);
        wire.clear_events();

        board.set_pin_mode(2, PinMode::Output).unwrap();
        board.digital_write(2, true).unwrap();
        board.digital_write(2, false).unwrap();
        assert!(board.digital_read(3).unwrap());

        assert_eq!(
            wire.writes(),
            vec![b"oc".to_vec(), b"hc".to_vec(), b"lc".to_vec(), b"rd".to_vec()]
        );
    }

    #[test]
    fn test_analogue_read_scales_to_volts() {
        let board = open(srduino());
        let volts = board.analogue_read(0).unwrap();
        assert!((volts - 512.0 / 1023.0 * 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_pin_rejected_before_transfer() {
        let serial = srduino();
        let wire = serial.clone();
        let board = open(serial);
        let before = wire.write_count();

        assert!(matches!(
            board.digital_write(26, true),
            Err(DriverError::InvalidArgument(_))
        ));
        assert_eq!(wire.write_count(), before);
    }

    #[test]
    fn test_non_sr_firmware_with_warn_policy() {
        let serial = MockSerial::new(|_| b"Arduino:1\n".to_vec());
        let board = open(serial);
        assert!(!board.is_srduino().unwrap());
    }

    #[test]
    fn test_ignored_ruggeduino_record() {
        let ignored = IgnoredRuggeduino::new("/dev/ttyACM1", Some("752303138333517171B1".into()));
        assert_eq!(ignored.path, "/dev/ttyACM1");
        assert!(format!("{ignored:?}").contains("752303138333517171B1"));
    }
}
