//! 硬件配置文件测试

use sr_robot::HardwareConfig;
use sr_robot::config::{MotorBoardConfig, PowerBoardConfig, RuggeduinoConfig};
use sr_robot::{ChannelConfig, ConfigError, FirmwarePolicy};

fn sample() -> HardwareConfig {
    HardwareConfig {
        motors: vec![MotorBoardConfig {
            path: "/dev/ttyACM0".into(),
            serial_number: Some("SR0XJ1F".into()),
            firmware_policy: FirmwarePolicy::Strict,
        }],
        ruggeduinos: vec![RuggeduinoConfig {
            path: "/dev/ttyACM1".into(),
            serial_number: None,
            firmware_policy: FirmwarePolicy::Skip,
        }],
        power: Some(PowerBoardConfig {
            bus: 1,
            address: 7,
            serial_number: Some("SR0PJ1W".into()),
        }),
        channel: ChannelConfig {
            command_retries: 5,
            ..Default::default()
        },
        ..Default::default()
    }
}

#[test]
fn test_save_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hardware.toml");

    let config = sample();
    config.save_to_file(&path).unwrap();
    let loaded = HardwareConfig::load_from_file(&path).unwrap();

    assert_eq!(loaded, config);
}

#[test]
fn test_load_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let result = HardwareConfig::load_from_file(dir.path().join("missing.toml"));
    assert!(matches!(result, Err(ConfigError::Io(_))));
}

#[test]
fn test_partial_tuning_sections() {
    let config = HardwareConfig::from_toml_str(
        r#"
        [power]
        bus = 3
        address = 12

        [channel]
        read_timeout_ms = 250

        [control]
        transfer_timeout_ms = 200
        "#,
    )
    .unwrap();

    let power = config.power.unwrap();
    assert_eq!((power.bus, power.address), (3, 12));
    assert_eq!(config.channel.read_timeout_ms, 250);
    assert_eq!(config.channel.command_retries, 10);
    assert_eq!(config.control.transfer_timeout_ms, 200);
}
