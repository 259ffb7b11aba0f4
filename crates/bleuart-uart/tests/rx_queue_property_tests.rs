//! Property-based tests for the RX path
//!
//! These tests verify FIFO delivery and handle filtering for arbitrary
//! sequences of peer writes.

use std::sync::Arc;

use bleuart_core::{Ble, BleConfig, Role, SimRadio};
use bleuart_uart::queue::rx_queue;
use bleuart_uart::UartService;
use proptest::prelude::*;

/// Generate a single peer write, at most one attribute long
fn arb_write() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=20)
}

proptest! {
    /// Property: bytes within capacity are read back in push order
    #[test]
    fn queue_preserves_order(bytes in prop::collection::vec(any::<u8>(), 0..=256)) {
        let (producer, consumer) = rx_queue(256);
        producer.push_all(&bytes);
        prop_assert_eq!(consumer.len(), bytes.len());

        let mut out = Vec::new();
        while let Some(byte) = consumer.pop() {
            out.push(byte);
        }
        prop_assert_eq!(out, bytes);
        prop_assert_eq!(consumer.len(), 0);
    }

    /// Property: only writes to the RX value handle reach the reader
    #[test]
    fn only_rx_value_writes_are_delivered(
        writes in prop::collection::vec((any::<bool>(), arb_write()), 0..10),
        stray_offset in 1u16..8,
    ) {
        let ble = Ble::with_config(SimRadio::new(), BleConfig::testing()).unwrap();
        ble.init(Role::Server).unwrap();
        let ble = Arc::new(ble);
        let (uart, reader) = UartService::init(&ble).unwrap();
        let rx_value = uart.handles().rx_value();

        let mut expected = Vec::new();
        for (to_rx, data) in &writes {
            if *to_rx {
                ble.stack().inject_attribute_write(rx_value, data).unwrap();
                expected.extend_from_slice(data);
            } else {
                ble.stack().inject_attribute_write(rx_value + stray_offset, data).unwrap();
            }
        }
        ble.process_events();

        prop_assert_eq!(reader.read_available(), expected);
    }
}
