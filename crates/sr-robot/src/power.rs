//! 电源板
//!
//! 电源板通过 USB 控制传输访问，没有重试。输出电源轨没有可靠的读回，
//! [`Outputs::get`] 返回的是最近一次成功写出的值。

use parking_lot::Mutex;
use sr_driver::{ControlConfig, ControlProtocol, DriverError};
use sr_protocol::{
    BATTERY_RESPONSE_LEN, BUTTON_RESPONSE_LEN, BatteryReading, Beep, OUTPUT_COUNT, OutputIndex,
    PiezoTone, PowerReadOpcode, PowerWriteOpcode, bool_value, decode_button, encode_piezo,
    resolve_beeps,
};
use sr_transport::{ControlTransport, UsbControlDevice};
use std::fmt;
use tracing::{debug, info};

/// 通过 rusb 连接的电源板
pub type UsbPower = Power<UsbControlDevice>;

/// 电源板
pub struct Power<T: ControlTransport> {
    protocol: ControlProtocol<T>,
    serial_number: Option<String>,
    outputs: Mutex<[bool; OUTPUT_COUNT]>,
}

impl Power<UsbControlDevice> {
    /// 按总线号和设备地址打开电源板
    pub fn open(
        bus: u8,
        address: u8,
        serial_number: Option<String>,
        config: ControlConfig,
    ) -> Result<Self, DriverError> {
        let device = UsbControlDevice::open(bus, address)?;
        Ok(Self::new(device, serial_number, config))
    }
}

impl<T: ControlTransport> Power<T> {
    pub fn new(transport: T, serial_number: Option<String>, config: ControlConfig) -> Self {
        info!(serial_number = ?serial_number, "power board opened");
        Self {
            protocol: ControlProtocol::new(transport, config),
            serial_number,
            outputs: Mutex::new([false; OUTPUT_COUNT]),
        }
    }

    pub fn serial_number(&self) -> Option<&str> {
        self.serial_number.as_deref()
    }

    /// 电池遥测
    pub fn battery(&self) -> Battery<'_, T> {
        Battery { power: self }
    }

    /// 输出电源轨
    pub fn outputs(&self) -> Outputs<'_, T> {
        Outputs { power: self }
    }

    pub fn set_run_led(&self, on: bool) -> Result<(), DriverError> {
        self.protocol.write(PowerWriteOpcode::RunLed, bool_value(on), &[])
    }

    pub fn set_error_led(&self, on: bool) -> Result<(), DriverError> {
        self.protocol
            .write(PowerWriteOpcode::ErrorLed, bool_value(on), &[])
    }

    /// 按钮是否被按下
    pub fn read_button(&self) -> Result<bool, DriverError> {
        let data = self
            .protocol
            .read(PowerReadOpcode::Button, BUTTON_RESPONSE_LEN)?;
        Ok(decode_button(&data)?)
    }

    /// 以 `frequency` Hz 蜂鸣 `duration_ms` 毫秒
    pub fn buzz_piezo(&self, duration_ms: u16, frequency: u16) -> Result<(), DriverError> {
        self.play(&[PiezoTone::new(frequency, duration_ms)])
    }

    /// 按音符或频率蜂鸣
    ///
    /// 音符无法识别，或同时给出音符和频率时返回 [`DriverError::InvalidArgument`]；
    /// 两者都没有时使用 440 Hz。
    pub fn beep(&self, beep: &Beep) -> Result<(), DriverError> {
        self.beep_sequence(std::slice::from_ref(beep))
    }

    /// 在一次传输中排队多个蜂鸣音
    ///
    /// 任何一个无效则整组都不发送。
    pub fn beep_sequence(&self, beeps: &[Beep]) -> Result<(), DriverError> {
        if beeps.is_empty() {
            return Err(DriverError::invalid_argument("beep sequence is empty"));
        }
        let tones = resolve_beeps(beeps).map_err(DriverError::invalid_argument)?;
        self.play(&tones)
    }

    fn play(&self, tones: &[PiezoTone]) -> Result<(), DriverError> {
        let payload = encode_piezo(tones);
        self.protocol.write(PowerWriteOpcode::Piezo, 0, &payload)?;
        debug!(tones = tones.len(), "piezo queued");
        Ok(())
    }

    /// 关闭 USB 句柄，之后的操作都返回 `Transport(Closed)`
    pub fn close(&self) {
        if !self.protocol.is_closed() {
            self.protocol.close();
            info!(serial_number = ?self.serial_number, "power board closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.protocol.is_closed()
    }
}

impl<T: ControlTransport> fmt::Debug for Power<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Power")
            .field("serial_number", &self.serial_number)
            .finish()
    }
}

/// 电池遥测视图
///
/// 每次访问都会发起一次控制读。需要同时读取电压和电流时用 [`Battery::reading`]。
pub struct Battery<'a, T: ControlTransport> {
    power: &'a Power<T>,
}

impl<T: ControlTransport> Battery<'_, T> {
    /// 原始读数（一次传输）
    pub fn reading(&self) -> Result<BatteryReading, DriverError> {
        let data = self
            .power
            .protocol
            .read(PowerReadOpcode::Battery, BATTERY_RESPONSE_LEN)?;
        Ok(BatteryReading::decode(&data)?)
    }

    /// 电压（V，两位小数）
    pub fn voltage(&self) -> Result<f64, DriverError> {
        Ok(self.reading()?.voltage())
    }

    /// 电流（A，两位小数）
    pub fn current(&self) -> Result<f64, DriverError> {
        Ok(self.reading()?.current())
    }
}

/// 输出电源轨视图
pub struct Outputs<'a, T: ControlTransport> {
    power: &'a Power<T>,
}

impl<T: ControlTransport> Outputs<'_, T> {
    /// 打开或关闭第 `index` 路输出
    ///
    /// 缓存锁覆盖整个传输，缓存只在传输成功后更新。
    pub fn set(&self, index: usize, on: bool) -> Result<(), DriverError> {
        let index = OutputIndex::new(index).map_err(DriverError::invalid_argument)?;
        let mut cache = self.power.outputs.lock();
        self.power
            .protocol
            .write(index.write_opcode(), bool_value(on), &[])?;
        cache[index.index()] = on;
        Ok(())
    }

    /// 最近一次成功写出的状态（不访问硬件）
    pub fn get(&self, index: usize) -> Result<bool, DriverError> {
        let index = OutputIndex::new(index).map_err(DriverError::invalid_argument)?;
        Ok(self.power.outputs.lock()[index.index()])
    }

    pub fn len(&self) -> usize {
        OUTPUT_COUNT
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}
