//! 电机板（MCV4B）
//!
//! 一块电机板有两个独立通道，两者共享同一个 [`CommandChannel`]，
//! 所以两个通道的命令在线上严格串行。
//!
//! 电机板没有读回功率的命令，通道功率和刹车设置是本地缓存，只在命令
//! 成功写出后更新。

use parking_lot::Mutex;
use sr_driver::{
    ChannelConfig, CommandChannel, DriverError, FirmwareExpectation, FirmwarePolicy,
    verify_firmware,
};
use sr_protocol::{
    BOOTLOADER_MAGIC, EXPECTED_MOTOR_FIRMWARE, MOTOR_BAUD_RATE, MOTOR_USB_MODEL, MotorChannelId,
    MotorCommand, SpeedCommand, clamp_power,
};
use sr_transport::{LineTransport, SerialPortTransport};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 通过串口连接的电机板
pub type SerialMotor = Motor<SerialPortTransport>;

/// 电机板
pub struct Motor<T: LineTransport> {
    link: Arc<CommandChannel<T>>,
    serial_number: Option<String>,
    firmware_version: String,
    channels: [MotorChannel<T>; 2],
}

impl Motor<SerialPortTransport> {
    /// 打开串口并初始化电机板
    pub fn open(
        path: &str,
        serial_number: Option<String>,
        policy: FirmwarePolicy,
        config: ChannelConfig,
    ) -> Result<Self, DriverError> {
        let transport = SerialPortTransport::open(path, MOTOR_BAUD_RATE, config.read_timeout())?;
        let serial_number = serial_number.or_else(|| Some(path.to_string()));
        Self::new(transport, serial_number, policy, config)
    }
}

impl<T: LineTransport> Motor<T> {
    /// 接管已打开的传输：复位电机板，然后查询固件版本
    ///
    /// 没有序列号时日志和错误里用 USB 型号名标识设备。
    ///
    /// 板子可能刚上电，版本查询按通道配置重试。`Strict` 策略下版本不符会关闭
    /// 传输并返回 [`DriverError::IncorrectFirmware`]。
    pub fn new(
        transport: T,
        serial_number: Option<String>,
        policy: FirmwarePolicy,
        config: ChannelConfig,
    ) -> Result<Self, DriverError> {
        let device = serial_number
            .clone()
            .unwrap_or_else(|| MOTOR_USB_MODEL.to_string());
        let link = Arc::new(CommandChannel::new(transport, config, device)?);

        let status = link
            .write(&MotorCommand::Reset.to_bytes())
            .and_then(|_| {
                verify_firmware(
                    &link,
                    &MotorCommand::Version.to_bytes(),
                    FirmwareExpectation::Exact(EXPECTED_MOTOR_FIRMWARE),
                    policy,
                )
            });
        let status = match status {
            Ok(status) => status,
            Err(e) => {
                link.close();
                return Err(e);
            },
        };

        info!(device = link.device(), "motor board opened");
        let channels = MotorChannelId::ALL.map(|id| MotorChannel::new(id, Arc::clone(&link)));
        Ok(Self {
            link,
            serial_number,
            firmware_version: status.version,
            channels,
        })
    }

    pub fn serial_number(&self) -> Option<&str> {
        self.serial_number.as_deref()
    }

    /// 连接时读到的固件版本行
    pub fn firmware_version(&self) -> &str {
        &self.firmware_version
    }

    /// 通道 0
    pub fn m0(&self) -> &MotorChannel<T> {
        &self.channels[0]
    }

    /// 通道 1
    pub fn m1(&self) -> &MotorChannel<T> {
        &self.channels[1]
    }

    /// 按索引取通道，超出 `0..2` 返回参数错误
    pub fn channel(&self, index: usize) -> Result<&MotorChannel<T>, DriverError> {
        let id = MotorChannelId::try_from(index).map_err(DriverError::invalid_argument)?;
        Ok(&self.channels[id.index()])
    }

    /// 跳转到 bootloader（固件更新用）
    ///
    /// 握手字符串不符只记录警告。之后丢弃电机板发出的一个多余字节。
    pub fn jump_to_bootloader(&self) -> Result<(), DriverError> {
        let mut guard = self.link.lock()?;
        let timeout = self.link.config().bootloader_timeout();
        guard.with_read_timeout(timeout, |g| {
            g.write(&MotorCommand::Bootloader.to_bytes())?;
            let reply = g.read_up_to(BOOTLOADER_MAGIC.len())?;
            if reply != BOOTLOADER_MAGIC.as_bytes() {
                warn!(
                    device = self.link.device(),
                    reply = %reply.escape_ascii(),
                    "incorrect bootloader entry string received"
                );
            }
            let junk = g.read_up_to(1)?;
            debug!(discarded = junk.len(), "bootloader trailing bytes drained");
            Ok(())
        })
    }

    /// 关闭串口，之后的命令都返回 `Transport(Closed)`
    pub fn close(&self) {
        if !self.link.is_closed() {
            self.link.close();
            info!(device = self.link.device(), "motor board closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.link.is_closed()
    }
}

impl<T: LineTransport> fmt::Debug for Motor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Motor")
            .field("serial_number", &self.serial_number)
            .finish()
    }
}

#[derive(Debug, Clone, Copy)]
struct ChannelState {
    /// 最近一次成功写出的请求功率（未限幅）
    power: i32,
    use_brake: bool,
}

/// 电机通道
pub struct MotorChannel<T: LineTransport> {
    id: MotorChannelId,
    link: Arc<CommandChannel<T>>,
    /// 加锁顺序：先状态锁，再传输锁
    state: Mutex<ChannelState>,
}

impl<T: LineTransport> MotorChannel<T> {
    fn new(id: MotorChannelId, link: Arc<CommandChannel<T>>) -> Self {
        Self {
            id,
            link,
            state: Mutex::new(ChannelState {
                power: 0,
                use_brake: true,
            }),
        }
    }

    pub fn id(&self) -> MotorChannelId {
        self.id
    }

    /// 最近一次设置的功率（未限幅的请求值）
    pub fn power(&self) -> i32 {
        self.state.lock().power
    }

    /// 实际发送给电机板的功率（`[-100, 100]`）
    pub fn applied_power(&self) -> i32 {
        clamp_power(self.power())
    }

    /// 设置功率
    ///
    /// 超出 `[-100, 100]` 的值会被限幅后发送，但缓存保留原始请求值。
    pub fn set_power(&self, power: i32) -> Result<(), DriverError> {
        let mut state = self.state.lock();
        self.send_speed(power, state.use_brake)?;
        state.power = power;
        Ok(())
    }

    /// 功率为 0 时是否刹车
    pub fn use_brake(&self) -> bool {
        self.state.lock().use_brake
    }

    /// 修改刹车设置；当前功率为 0 时立即重发速度命令使其生效
    pub fn set_use_brake(&self, use_brake: bool) -> Result<(), DriverError> {
        let mut state = self.state.lock();
        if state.power == 0 {
            self.send_speed(0, use_brake)?;
        }
        state.use_brake = use_brake;
        Ok(())
    }

    fn send_speed(&self, power: i32, use_brake: bool) -> Result<(), DriverError> {
        let command = SpeedCommand::new(self.id, power, use_brake);
        let bytes = command.to_bytes();
        self.link.write(&bytes)?;
        debug!(
            device = self.link.device(),
            channel = self.id.index(),
            power,
            speed_byte = bytes[1],
            "motor speed set"
        );
        Ok(())
    }
}

impl<T: LineTransport> fmt::Debug for MotorChannel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = *self.state.lock();
        f.debug_struct("MotorChannel")
            .field("channel", &self.id.index())
            .field("power", &state.power)
            .field("use_brake", &state.use_brake)
            .finish()
    }
}
