//! 设备探测测试
//!
//! 用脚本化的端口集合模拟系统串口，验证探测顺序、记录内容和超时恢复。

use thermocam_driver::{DiscoveryConfig, DriverError, ThermoCamBuilder, discover};
use thermocam_protocol::{HANDSHAKE_REQUEST, HANDSHAKE_RESPONSE};
use thermocam_serial::mock::MockTransport;
use thermocam_serial::{Timeouts, Transport};

/// 端口 2、5、7 可以打开，只有 7 是相机
fn scripted_ports() -> MockTransport {
    MockTransport::new()
        .with_port(2, "/dev/ttyACM2")
        .with_reply(5, "/dev/ttyACM5", "<INFO:dev=Printer>\r\n")
        .with_reply(7, "/dev/ttyACM7", HANDSHAKE_RESPONSE)
        .with_reply(9, "/dev/ttyACM9", HANDSHAKE_RESPONSE)
}

#[test]
fn test_port_seven_is_found() {
    let mut mock = scripted_ports();
    let report = discover(&mut mock, &DiscoveryConfig::default());

    assert!(report.found);
    let indices: Vec<_> = report.probed.iter().map(|p| p.index).collect();
    assert_eq!(indices, vec![2, 5, 7]);
    assert_eq!(report.probed[0].response, "");
    assert_eq!(report.probed[1].response, "<INFO:dev=Printer>\r\n");
    assert_eq!(report.matched().map(|p| p.label.as_str()), Some("/dev/ttyACM7"));

    // 找到后停止，端口 7 保持打开
    assert_eq!(mock.open_attempts(), (0..=7u16).collect::<Vec<_>>());
    assert!(mock.is_open());
    assert_eq!(mock.port_index(), Some(7));
}

#[test]
fn test_handshake_sent_to_every_opened_port() {
    let mut mock = scripted_ports();
    discover(&mut mock, &DiscoveryConfig::default());
    for index in [2, 5, 7] {
        assert_eq!(mock.written_to(index), HANDSHAKE_REQUEST.as_bytes());
    }
    assert!(mock.written_to(9).is_empty());
}

#[test]
fn test_not_found_closes_transport() {
    let mut mock = MockTransport::new()
        .with_port(2, "/dev/ttyACM2")
        .with_reply(5, "/dev/ttyACM5", "<INFO:dev=ThermalCamera>\n");
    let report = discover(&mut mock, &DiscoveryConfig::default());

    assert!(!report.found);
    assert_eq!(report.probed.len(), 2);
    assert!(!mock.is_open());
    assert_eq!(mock.open_attempts().len(), 256);
}

#[test]
fn test_discovery_is_deterministic() {
    let first = discover(&mut scripted_ports(), &DiscoveryConfig::default());
    let second = discover(&mut scripted_ports(), &DiscoveryConfig::default());
    assert_eq!(first, second);
}

#[test]
fn test_timeouts_restored_on_both_outcomes() {
    let custom = Timeouts::new(
        std::time::Duration::from_millis(7),
        std::time::Duration::from_millis(70),
    );

    let mut found = scripted_ports();
    found.set_timeouts(custom).unwrap();
    discover(&mut found, &DiscoveryConfig::default());
    assert_eq!(found.timeouts(), custom);
    assert_eq!(found.timeout_history(), vec![custom, Timeouts::PROBE, custom]);

    let mut missing = MockTransport::new();
    missing.set_timeouts(custom).unwrap();
    discover(&mut missing, &DiscoveryConfig::default());
    assert_eq!(missing.timeouts(), custom);
}

#[test]
fn test_custom_range_and_handshake() {
    let mut mock = MockTransport::new()
        .with_reply(7, "seven", HANDSHAKE_RESPONSE)
        .with_reply(20, "twenty", "pong\n");
    let config = DiscoveryConfig {
        ports: 10..=30,
        handshake: Some("ping\n".to_string()),
        expected_response: "pong\n".to_string(),
        ..Default::default()
    };
    let report = discover(&mut mock, &config);
    assert!(report.found);
    assert_eq!(report.matched().map(|p| p.index), Some(20));
    assert_eq!(mock.written_to(20), b"ping\n");
}

#[test]
fn test_builder_reports_probed_ports() {
    let mock = MockTransport::new().with_reply(5, "/dev/ttyACM5", "<INFO:dev=Printer>\r\n");
    match ThermoCamBuilder::new().probe_range(0..=15).discover_with(mock) {
        Err(DriverError::DeviceNotFound { probed }) => {
            assert_eq!(probed.len(), 1);
            assert_eq!(probed[0].label, "/dev/ttyACM5");
        },
        Err(e) => panic!("unexpected error: {}", e),
        Ok(_) => panic!("discovery should fail"),
    }
}
