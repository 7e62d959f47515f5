//! 传输层硬件测试
//!
//! 需要实际外设板才能运行，设备路径通过环境变量指定：
//!
//! ```bash
//! SR_MOTOR_PORT=/dev/ttyACM0 SR_POWER_BUS=1 SR_POWER_ADDRESS=7 \
//!     cargo test -p sr-transport --test hardware_tests -- --ignored --test-threads=1
//! ```

use std::time::Duration;

use sr_transport::{ControlTransport, LineTransport, SerialPortTransport, UsbControlDevice};

fn env_u8(name: &str) -> u8 {
    std::env::var(name)
        .unwrap_or_else(|_| panic!("{name} not set"))
        .parse()
        .unwrap_or_else(|_| panic!("{name} is not a number"))
}

/// 电机板版本查询（原始字节）
#[test]
#[ignore]
fn test_motor_board_version_line() {
    let path = std::env::var("SR_MOTOR_PORT").expect("SR_MOTOR_PORT not set");
    let mut port = SerialPortTransport::open(&path, 1_000_000, Duration::from_millis(100))
        .expect("Failed to open motor board");

    let mut line = Vec::new();
    for _ in 0..10 {
        port.write_all(&[0x01]).expect("write failed");
        line = port.read_line().expect("read failed");
        if line.last() == Some(&b'\n') {
            break;
        }
    }
    println!("Motor firmware: {:?}", String::from_utf8_lossy(&line));
    assert_eq!(line.last(), Some(&b'\n'));
}

/// 电源板按钮读取（原始控制传输）
#[test]
#[ignore]
fn test_power_board_button_read() {
    let device = UsbControlDevice::open(env_u8("SR_POWER_BUS"), env_u8("SR_POWER_ADDRESS"))
        .expect("Failed to open power board");

    let mut buf = [0u8; 4];
    let n = device
        .read_control(0x80, 64, 0, 8, &mut buf, Duration::from_millis(1000))
        .expect("control read failed");
    assert_eq!(n, 4);
    println!("Button raw: {:?}", buf);
}

/// 不存在的总线号返回 DeviceNotFound
#[test]
#[ignore]
fn test_open_missing_device() {
    let result = UsbControlDevice::open(255, 255);
    assert!(result.is_err());
}
