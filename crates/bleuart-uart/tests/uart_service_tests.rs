//! Integration tests for the UART service against the simulated radio

use std::io::{Read, Write};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use bleuart_core::sim::SimCommand;
use bleuart_core::{
    AttrPermissions, Ble, BleConfig, BleError, BleState, BleUuid, CharProperties, Command,
    GattEventMask, Role, ServiceType, SimRadio, Status,
};
use bleuart_uart::{UartConfig, UartError, UartService, UART_SERVICE_UUID};

fn initialized_ble(radio: SimRadio) -> Arc<Ble<SimRadio>> {
    let ble = Ble::with_config(radio, BleConfig::testing()).expect("valid config");
    ble.init(Role::Server).expect("init should succeed");
    Arc::new(ble)
}

#[test]
fn init_registers_service_and_characteristics() {
    let ble = initialized_ble(SimRadio::new());
    let (uart, _reader) = UartService::init(&ble).unwrap();
    let handles = uart.handles();

    let commands = ble.stack().commands();
    assert!(commands.contains(&SimCommand::AddService {
        uuid: BleUuid::Uuid128(UART_SERVICE_UUID),
        service_type: ServiceType::Primary,
        max_attribute_records: 7,
    }));

    let characteristics: Vec<_> = commands
        .iter()
        .filter_map(|c| match c {
            SimCommand::AddCharacteristic(params) => Some(*params),
            _ => None,
        })
        .collect();
    assert_eq!(characteristics.len(), 2);

    let rx = characteristics[0];
    assert_eq!(rx.service, handles.service);
    assert_eq!(rx.max_len, 20);
    assert_eq!(
        rx.properties,
        CharProperties::WRITE | CharProperties::WRITE_WITHOUT_RESPONSE
    );
    assert_eq!(rx.permissions, AttrPermissions::NONE);
    assert_eq!(rx.events, GattEventMask::ATTRIBUTE_WRITE);
    assert_eq!(rx.encryption_key_size, 16);
    assert!(rx.variable_length);

    let tx = characteristics[1];
    assert_eq!(tx.properties, CharProperties::NOTIFY);
    assert_eq!(tx.events, GattEventMask::NONE);
    assert_ne!(handles.rx, handles.tx);
}

#[test]
fn init_requires_initialized_stack() {
    let ble = Arc::new(Ble::with_config(SimRadio::new(), BleConfig::testing()).unwrap());
    assert_eq!(
        UartService::init(&ble).unwrap_err(),
        UartError::Ble(BleError::NotInitialized)
    );
}

#[test]
fn init_surfaces_gatt_failures() {
    let ble = initialized_ble(SimRadio::new());
    ble.stack().set_failure(Command::AddCharacteristic, Status::FAILED);
    let err = UartService::init(&ble).unwrap_err();
    assert_eq!(
        err,
        UartError::Ble(BleError::Command {
            command: Command::AddCharacteristic,
            status: Status::FAILED
        })
    );
}

#[test]
fn peer_writes_reach_reader_in_order() {
    for radio in [SimRadio::with_version(0x30, 0x0600), SimRadio::new()] {
        let ble = initialized_ble(radio);
        let (uart, reader) = UartService::init(&ble).unwrap();
        let rx_value = uart.handles().rx_value();

        ble.stack().inject_attribute_write(rx_value, b"hello ").unwrap();
        ble.stack().inject_attribute_write(rx_value, b"world").unwrap();
        ble.process_events();

        assert_eq!(reader.available(), 11);
        let mut buf = [0u8; 32];
        assert_eq!(reader.read_into(&mut buf), 11);
        assert_eq!(&buf[..11], b"hello world");
        assert_eq!(reader.available(), 0);
        assert_eq!(reader.read(), None);
    }
}

#[test]
fn writes_to_other_handles_are_ignored() {
    let ble = initialized_ble(SimRadio::new());
    let (uart, reader) = UartService::init(&ble).unwrap();
    let handles = uart.handles();

    // Declaration handle, TX value and TX client configuration
    ble.stack().inject_attribute_write(handles.rx, b"decl").unwrap();
    ble.stack().inject_attribute_write(handles.tx_value(), b"tx").unwrap();
    ble.stack().inject_attribute_write(handles.tx_value() + 1, &[0x01, 0x00]).unwrap();
    ble.process_events();

    assert_eq!(reader.available(), 0);
}

#[test]
fn write_updates_tx_characteristic() {
    let ble = initialized_ble(SimRadio::new());
    let (uart, _reader) = UartService::init(&ble).unwrap();
    let handles = uart.handles();

    uart.write(b"ping").unwrap();
    uart.write_str("pong").unwrap();

    assert!(ble.stack().commands().contains(&SimCommand::UpdateCharValue {
        service: handles.service,
        characteristic: handles.tx,
        offset: 0,
        value: b"ping".to_vec(),
    }));
    assert_eq!(
        ble.stack().char_updates(),
        vec![(handles.tx, b"ping".to_vec()), (handles.tx, b"pong".to_vec())]
    );
}

#[test]
fn oversized_write_is_rejected() {
    let ble = initialized_ble(SimRadio::new());
    let (uart, _reader) = UartService::init(&ble).unwrap();

    assert!(uart.write(&[0u8; 20]).is_ok());
    assert_eq!(
        uart.write(&[0u8; 21]),
        Err(UartError::PayloadTooLarge {
            size: 21,
            max_size: 20
        })
    );
    assert_eq!(ble.stack().command_count(Command::UpdateCharValue), 1);
}

#[test]
fn write_failure_is_reported() {
    let ble = initialized_ble(SimRadio::new());
    let (uart, _reader) = UartService::init(&ble).unwrap();
    ble.stack().set_failure(Command::UpdateCharValue, Status::NOT_ALLOWED);

    let err = uart.write(b"x").unwrap_err();
    assert!(matches!(err, UartError::Ble(e) if e.status() == Some(Status::NOT_ALLOWED)));
}

#[test]
fn io_write_sends_one_attribute_at_a_time() {
    let ble = initialized_ble(SimRadio::new());
    let (mut uart, _reader) = UartService::init(&ble).unwrap();

    let data = [7u8; 45];
    uart.write_all(&data).unwrap();
    let sizes: Vec<usize> = ble
        .stack()
        .char_updates()
        .iter()
        .map(|(_, value)| value.len())
        .collect();
    assert_eq!(sizes, vec![20, 20, 5]);
}

#[test]
fn io_write_of_empty_buffer_sends_nothing() {
    let ble = initialized_ble(SimRadio::new());
    let (mut uart, _reader) = UartService::init(&ble).unwrap();

    assert_eq!(Write::write(&mut uart, &[]).unwrap(), 0);
    assert_eq!(ble.stack().command_count(Command::UpdateCharValue), 0);
}

#[test]
fn largest_configured_write_reaches_reader() {
    for radio in [SimRadio::with_version(0x30, 0x0600), SimRadio::new()] {
        let ble = initialized_ble(radio);
        let config = UartConfig::default().with_max_attribute_len(246);
        let (uart, reader) = UartService::with_config(&ble, config).unwrap();

        let data = [0x55u8; 246];
        ble.stack()
            .inject_attribute_write(uart.handles().rx_value(), &data)
            .unwrap();
        ble.process_events();

        assert_eq!(reader.available(), 246);
        assert_eq!(reader.read_available(), data.to_vec());
    }
}

#[test]
fn write_length_beyond_event_capacity_is_rejected() {
    let ble = initialized_ble(SimRadio::new());
    let config = UartConfig::default().with_max_attribute_len(247);

    assert!(matches!(
        UartService::with_config(&ble, config),
        Err(UartError::InvalidConfiguration(_))
    ));
}

#[test]
fn uart_test_advertising() {
    let ble = initialized_ble(SimRadio::new());
    let (uart, _reader) = UartService::init(&ble).unwrap();

    uart.advertise("UART Test").unwrap();
    assert_eq!(ble.state(), BleState::Advertising);
    assert_eq!(ble.advertising_payload().len(), 27);

    let record = ble.stack().last_discoverable().unwrap();
    assert_eq!(record.local_name, b"\x09UART Test".to_vec());
    assert_eq!(record.service_uuids.len(), 17);
    assert_eq!(record.service_uuids[0], 0x06);
    assert_eq!(record.service_uuids[1], 0x9E);
    assert_eq!(record.service_uuids[16], 0x6E);

    // Re-advertising replaces the payload
    uart.advertise("Other").unwrap();
    assert_eq!(ble.stack().command_count(Command::SetNonDiscoverable), 1);
    assert_eq!(ble.advertising_payload().len(), 6 + 17);
}

#[test]
fn scan_is_not_implemented() {
    let ble = initialized_ble(SimRadio::new());
    let (uart, _reader) = UartService::init(&ble).unwrap();
    assert_eq!(uart.scan(), Err(UartError::NotImplemented("scanning")));
}

#[test]
fn full_queue_backpressures_event_thread() {
    let ble = initialized_ble(SimRadio::new());
    let config = UartConfig::default().with_rx_queue_capacity(8);
    let (uart, mut reader) = UartService::with_config(&ble, config).unwrap();
    let rx_value = uart.handles().rx_value();

    let expected: Vec<u8> = (0..60).collect();
    for chunk in expected.chunks(20) {
        ble.stack().inject_attribute_write(rx_value, chunk).unwrap();
    }

    let events = ble.spawn_event_thread().unwrap();

    let mut received = Vec::new();
    let deadline = Instant::now() + Duration::from_secs(10);
    while received.len() < expected.len() && Instant::now() < deadline {
        assert!(reader.available() <= 8);
        let mut buf = [0u8; 4];
        let n = Read::read(&mut reader, &mut buf).unwrap();
        received.extend_from_slice(&buf[..n]);
        if n == 0 {
            thread::sleep(Duration::from_millis(1));
        }
    }

    events.shutdown();
    assert_eq!(received, expected);
}
