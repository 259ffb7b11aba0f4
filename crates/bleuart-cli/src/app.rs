//! Application logic for the bleuart CLI
//!
//! Every session runs against [`SimRadio`]: peer activity (connections, writes,
//! disconnections) is injected into the radio and flows back through the
//! regular event path.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, Instant};
use tracing::{debug, info, warn};

use bleuart_core::{Ble, BleState, ExpansionBoard, RadioEvent, RawEvent, Role, SimRadio};
use bleuart_uart::{UartReader, UartService};

use crate::config::AppConfig;
use crate::error::Result;

/// HCI reason code: remote user terminated connection
const REMOTE_USER_TERMINATED: u8 = 0x13;

pub struct BleuartApp {
    config: AppConfig,
}

impl BleuartApp {
    pub fn new(config: AppConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Create and bring up a host context over a fresh simulated radio
    pub fn start_stack(&self, role: Role) -> Result<Arc<Ble<SimRadio>>> {
        let session = &self.config.session;
        let radio = SimRadio::with_version(session.hw_version, session.fw_version);
        let ble = Ble::with_config(radio, self.config.ble.clone())?;
        ble.init(role)?;
        Ok(Arc::new(ble))
    }

    /// Advertise `name`, then accept and drop one simulated connection
    pub async fn run_demo(&self, name: &str, role: Role) -> Result<Vec<BleState>> {
        let ble = self.start_stack(role)?;
        let mut states = vec![ble.state()];

        ble.add_name(name)?;
        ble.start_advertising()?;
        states.push(ble.state());
        info!("Advertising as {:?} on {}", name, ble.board());

        let pump = EventPump::start(&ble);

        ble.stack().inject_connection(self.config.session.peer_address);
        states.push(wait_for_state(&ble, BleState::Connected).await);

        ble.stack().inject_disconnection(REMOTE_USER_TERMINATED);
        states.push(wait_for_state(&ble, BleState::Idle).await);

        pump.stop().await?;
        Ok(states)
    }

    /// Serve the UART service while replaying `script` as peer writes
    ///
    /// Returns every byte the reader received. Stops `linger` after the script
    /// has been read back, or on Ctrl-C.
    pub async fn run_uart(
        &self,
        name: &str,
        script: Vec<Vec<u8>>,
        linger: Duration,
    ) -> Result<Vec<u8>> {
        let ble = self.start_stack(self.config.session.role)?;
        let (uart, reader) = UartService::with_config(&ble, self.config.uart.clone())?;
        uart.advertise(name)?;
        info!("UART service advertising as {:?}", name);

        let pump = EventPump::start(&ble);

        ble.stack().inject_connection(self.config.session.peer_address);
        wait_for_state(&ble, BleState::Connected).await;

        let rx_value = uart.handles().rx_value();
        let expected: usize = script.iter().map(Vec::len).sum();
        for write in &script {
            for chunk in write.chunks(uart.max_write_len()) {
                ble.stack().inject_attribute_write(rx_value, chunk)?;
            }
        }

        let received = tokio::select! {
            received = self.serve(&uart, &reader, expected, linger) => received?,
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, shutting down");
                reader.read_available()
            }
        };

        ble.stack().inject_disconnection(REMOTE_USER_TERMINATED);
        wait_for_state(&ble, BleState::Idle).await;
        pump.stop().await?;

        Ok(received)
    }

    async fn serve(
        &self,
        uart: &UartService<SimRadio>,
        reader: &UartReader,
        expected: usize,
        linger: Duration,
    ) -> Result<Vec<u8>> {
        let mut ticker = interval(self.config.session.read_interval());
        let mut received = Vec::with_capacity(expected);
        let mut done_at: Option<Instant> = None;

        loop {
            ticker.tick().await;

            let bytes = reader.read_available();
            if !bytes.is_empty() {
                info!("Received {:?}", String::from_utf8_lossy(&bytes));
                if self.config.session.echo {
                    for chunk in bytes.chunks(uart.max_write_len()) {
                        uart.write(chunk)?;
                    }
                }
                received.extend_from_slice(&bytes);
            }

            if received.len() >= expected && done_at.is_none() {
                done_at = Some(Instant::now() + linger);
            }
            if done_at.is_some_and(|at| Instant::now() >= at) {
                return Ok(received);
            }
        }
    }
}

/// Describe a raw event frame
pub fn describe_frame(bytes: &[u8], board: ExpansionBoard) -> Result<String> {
    let event = RawEvent::new(bytes);
    let description = match event.decode(board)? {
        Some(RadioEvent::DisconnectComplete(disconnect)) => format!(
            "Disconnect complete: status 0x{:02X}, handle 0x{:04X}, reason 0x{:02X}",
            disconnect.status, disconnect.handle, disconnect.reason
        ),
        Some(RadioEvent::ConnectionComplete(conn)) => format!(
            "Connection complete: status 0x{:02X}, handle 0x{:04X}, peer {}, interval {}, latency {}, timeout {}",
            conn.status,
            conn.handle,
            conn.peer_address_string(),
            conn.interval,
            conn.latency,
            conn.supervision_timeout
        ),
        Some(RadioEvent::AttributeModified(attr)) => format!(
            "Attribute modified: connection 0x{:04X}, attribute 0x{:04X}, offset {}, data {}",
            attr.conn_handle,
            attr.attr_handle,
            attr.offset.map_or_else(|| "-".to_string(), |o| o.to_string()),
            hex::encode(attr.data)
        ),
        None => match event.event_code() {
            Some(code) => format!("Unhandled event code 0x{:02X}", code),
            None => format!(
                "Not a controller event (packet type 0x{:02X})",
                event.packet_type().unwrap_or_default()
            ),
        },
    };
    Ok(description)
}

// ----------------------------------------------------------------------------
// Event Pump
// ----------------------------------------------------------------------------

/// Blocking event pump running on the runtime's blocking pool
struct EventPump {
    stop: Arc<AtomicBool>,
    handle: JoinHandle<usize>,
}

impl EventPump {
    fn start(ble: &Arc<Ble<SimRadio>>) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        let ble = Arc::clone(ble);
        let poll_interval = ble.config().event_loop.poll_interval;

        let handle = tokio::task::spawn_blocking(move || {
            let mut routed = 0;
            while !stop_flag.load(Ordering::Acquire) {
                let count = ble.process_events();
                routed += count;
                if count == 0 {
                    std::thread::sleep(poll_interval);
                }
            }
            routed
        });

        Self { stop, handle }
    }

    async fn stop(self) -> Result<()> {
        self.stop.store(true, Ordering::Release);
        let routed = self.handle.await.context("event pump task failed")?;
        debug!("Event pump routed {} events", routed);
        Ok(())
    }
}

/// Wait until the router has moved to `state`, giving up after a second
async fn wait_for_state(ble: &Ble<SimRadio>, state: BleState) -> BleState {
    let deadline = Instant::now() + Duration::from_secs(1);
    while ble.state() != state && Instant::now() < deadline {
        sleep(Duration::from_millis(1)).await;
    }

    let current = ble.state();
    if current != state {
        warn!("Expected state {}, still {}", state, current);
    }
    current
}
