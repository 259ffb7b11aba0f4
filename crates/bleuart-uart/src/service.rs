//! UART GATT service
//!
//! A primary service with two characteristics: the peer writes into RX, and this
//! device sends by updating the TX value, which notifies the peer. Received
//! bytes travel from the event thread to the [`UartReader`] through the RX queue.

use std::io;
use std::sync::Arc;

use bleuart_core::{
    AttrPermissions, Ble, BleError, CharProperties, CharacteristicParams, Command,
    EventHandler, ExpansionBoard, GattEventMask, RadioEvent, RadioStack, RawEvent, ServiceType,
};
use tracing::{debug, info, trace};

use crate::config::UartConfig;
use crate::error::{Result, UartError};
use crate::protocol::{rx_uuid, service_uuid, tx_uuid, ServiceHandles};
use crate::queue::{rx_queue, RxProducer};
use crate::reader::UartReader;

/// Byte-stream service over a GATT characteristic pair
pub struct UartService<S: RadioStack> {
    ble: Arc<Ble<S>>,
    handles: ServiceHandles,
    config: UartConfig,
}

impl<S: RadioStack> UartService<S> {
    /// Register the service with the default configuration
    pub fn init(ble: &Arc<Ble<S>>) -> Result<(Self, UartReader)> {
        Self::with_config(ble, UartConfig::default())
    }

    /// Register the service, its characteristics and its receive handler
    ///
    /// The BLE stack must be initialized, since the board revision selects how
    /// peer writes are decoded. Returns the service and the only reader of its
    /// received bytes.
    pub fn with_config(ble: &Arc<Ble<S>>, config: UartConfig) -> Result<(Self, UartReader)> {
        config.validate().map_err(UartError::InvalidConfiguration)?;

        let board = ble.board();
        if !ble.is_initialized() || !board.is_known() {
            return Err(BleError::NotInitialized.into());
        }

        let stack = ble.stack();
        let service = stack
            .add_service(&service_uuid(), ServiceType::Primary, config.max_attribute_records)
            .map_err(|status| status.fail(Command::AddService))?;

        let rx = stack
            .add_characteristic(&CharacteristicParams {
                service,
                uuid: rx_uuid(),
                max_len: config.max_attribute_len,
                properties: CharProperties::WRITE | CharProperties::WRITE_WITHOUT_RESPONSE,
                permissions: AttrPermissions::NONE,
                events: GattEventMask::ATTRIBUTE_WRITE,
                encryption_key_size: config.encryption_key_size,
                variable_length: true,
            })
            .map_err(|status| status.fail(Command::AddCharacteristic))?;

        let tx = stack
            .add_characteristic(&CharacteristicParams {
                service,
                uuid: tx_uuid(),
                max_len: config.max_attribute_len,
                properties: CharProperties::NOTIFY,
                permissions: AttrPermissions::NONE,
                events: GattEventMask::NONE,
                encryption_key_size: config.encryption_key_size,
                variable_length: true,
            })
            .map_err(|status| status.fail(Command::AddCharacteristic))?;

        let handles = ServiceHandles { service, rx, tx };
        info!(
            "UART service 0x{:04X} (RX 0x{:04X}, TX 0x{:04X})",
            service, rx, tx
        );

        let (producer, consumer) = rx_queue(config.rx_queue_capacity);
        ble.register_event_handler(Arc::new(ReceiveHandler {
            producer,
            rx_value: handles.rx_value(),
            board,
        }))?;

        let service = Self {
            ble: Arc::clone(ble),
            handles,
            config,
        };
        Ok((service, UartReader::new(consumer)))
    }

    /// Advertise `name` together with the service UUID
    ///
    /// Replaces any previous advertising payload.
    pub fn advertise(&self, name: &str) -> Result<()> {
        // Idle either way; a refused stop is already logged
        let _ = self.ble.stop_advertising();
        self.ble.clear_advertising();
        self.ble.add_name(name)?;
        self.ble.add_uuid(&service_uuid())?;
        self.ble.start_advertising()?;
        Ok(())
    }

    /// Send `bytes` to the peer in one TX value update
    ///
    /// Writes longer than the characteristic are rejected; nothing is split.
    pub fn write(&self, bytes: &[u8]) -> Result<()> {
        let max_size = usize::from(self.config.max_attribute_len);
        if bytes.len() > max_size {
            return Err(UartError::PayloadTooLarge {
                size: bytes.len(),
                max_size,
            });
        }

        self.ble
            .stack()
            .update_char_value(self.handles.service, self.handles.tx, 0, bytes)
            .check(Command::UpdateCharValue)?;
        trace!("UART sent {} bytes", bytes.len());
        Ok(())
    }

    pub fn write_str(&self, text: &str) -> Result<()> {
        self.write(text.as_bytes())
    }

    pub fn handles(&self) -> ServiceHandles {
        self.handles
    }

    /// Largest accepted write
    pub fn max_write_len(&self) -> usize {
        usize::from(self.config.max_attribute_len)
    }

    pub fn ble(&self) -> &Arc<Ble<S>> {
        &self.ble
    }

    /// Scanning for UART peers is not supported
    pub fn scan(&self) -> Result<()> {
        Err(UartError::NotImplemented("scanning"))
    }
}

impl<S: RadioStack> io::Write for UartService<S> {
    /// Sends at most one characteristic's worth of `buf`
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let len = buf.len().min(self.max_write_len());
        UartService::write(self, &buf[..len]).map_err(io::Error::other)?;
        Ok(len)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<S: RadioStack> core::fmt::Debug for UartService<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("UartService")
            .field("handles", &self.handles)
            .field("config", &self.config)
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Receive Path
// ----------------------------------------------------------------------------

/// Registry handler feeding peer writes on the RX value into the queue
struct ReceiveHandler {
    producer: RxProducer,
    rx_value: u16,
    board: ExpansionBoard,
}

impl EventHandler for ReceiveHandler {
    fn on_event(&self, event: &RawEvent<'_>) {
        let attr = match event.decode(self.board) {
            Ok(Some(RadioEvent::AttributeModified(attr))) => attr,
            _ => return,
        };

        if attr.attr_handle != self.rx_value {
            debug!(
                "Ignoring write to attribute 0x{:04X} (RX value is 0x{:04X})",
                attr.attr_handle, self.rx_value
            );
            return;
        }

        trace!("UART received {} bytes", attr.data.len());
        self.producer.push_all(attr.data);
    }
}
