//! Raw radio event buffers and their typed decodings
//!
//! A raw event is the byte buffer delivered by the stack's receive path:
//!
//! ```text
//! [packet type][event code][param len][params ...]
//! ```
//!
//! Only the events this adapter acts on are decoded: disconnect complete, LE
//! connection complete (inside the LE meta event) and the vendor GATT
//! attribute-modified event, whose layout depends on the board revision.

use core::fmt;

use smallvec::SmallVec;

use crate::board::ExpansionBoard;
use crate::errors::DecodeError;

// ----------------------------------------------------------------------------
// Protocol Constants
// ----------------------------------------------------------------------------

/// HCI packet type of controller events
pub const HCI_EVENT_PKT: u8 = 0x04;

pub const EVT_DISCONN_COMPLETE: u8 = 0x05;
pub const EVT_LE_META_EVENT: u8 = 0x3E;
pub const EVT_VENDOR: u8 = 0xFF;

/// LE meta sub-event: connection complete
pub const EVT_LE_CONN_COMPLETE: u8 = 0x01;

/// Vendor event code: GATT attribute modified
pub const EVT_BLUE_GATT_ATTRIBUTE_MODIFIED: u16 = 0x0C01;

const HEADER_LEN: usize = 3;
const DISCONN_COMPLETE_LEN: usize = 4;
const CONN_COMPLETE_LEN: usize = 18;
const ATTR_MODIFIED_IDB04A1_HEADER: usize = 5;
const ATTR_MODIFIED_IDB05A1_HEADER: usize = 7;
const VENDOR_ECODE_LEN: usize = 2;

// ----------------------------------------------------------------------------
// Typed Events
// ----------------------------------------------------------------------------

/// Disconnection complete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisconnectComplete {
    pub status: u8,
    pub handle: u16,
    pub reason: u8,
}

/// LE connection complete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionComplete {
    pub status: u8,
    pub handle: u16,
    pub role: u8,
    pub peer_address_type: u8,
    /// Peer address, least significant byte first
    pub peer_address: [u8; 6],
    pub interval: u16,
    pub latency: u16,
    pub supervision_timeout: u16,
    pub master_clock_accuracy: u8,
}

impl ConnectionComplete {
    /// Peer address formatted most significant byte first
    pub fn peer_address_string(&self) -> String {
        let a = &self.peer_address;
        format!(
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            a[5], a[4], a[3], a[2], a[1], a[0]
        )
    }
}

/// GATT attribute written by the peer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeModified<'a> {
    pub conn_handle: u16,
    pub attr_handle: u16,
    /// Write offset, reported by IDB05A1 only
    pub offset: Option<u16>,
    pub data: &'a [u8],
}

/// The decoded events this adapter understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioEvent<'a> {
    DisconnectComplete(DisconnectComplete),
    ConnectionComplete(ConnectionComplete),
    AttributeModified(AttributeModified<'a>),
}

// ----------------------------------------------------------------------------
// Raw Event View
// ----------------------------------------------------------------------------

/// Borrowed view of one raw event buffer
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct RawEvent<'a> {
    bytes: &'a [u8],
}

impl<'a> RawEvent<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    pub fn packet_type(&self) -> Option<u8> {
        self.bytes.first().copied()
    }

    /// Whether the buffer carries a controller event
    pub fn is_hci_event(&self) -> bool {
        self.packet_type() == Some(HCI_EVENT_PKT)
    }

    pub fn event_code(&self) -> Option<u8> {
        if self.is_hci_event() {
            self.bytes.get(1).copied()
        } else {
            None
        }
    }

    /// Event parameters, bounded by the declared parameter length
    pub fn params(&self) -> Result<&'a [u8], DecodeError> {
        if self.bytes.len() < HEADER_LEN {
            return Err(DecodeError::Truncated {
                what: "event header",
                needed: HEADER_LEN,
                actual: self.bytes.len(),
            });
        }

        let declared = self.bytes[2] as usize;
        let available = self.bytes.len() - HEADER_LEN;
        if available < declared {
            return Err(DecodeError::Truncated {
                what: "event parameters",
                needed: declared,
                actual: available,
            });
        }

        Ok(&self.bytes[HEADER_LEN..HEADER_LEN + declared])
    }

    /// Decode into a typed event
    ///
    /// Returns `Ok(None)` for non-HCI packets and for event codes this adapter
    /// does not act on. The board revision selects the attribute-modified layout.
    pub fn decode(&self, board: ExpansionBoard) -> Result<Option<RadioEvent<'a>>, DecodeError> {
        let packet_type = self.packet_type().ok_or(DecodeError::Empty)?;
        if packet_type != HCI_EVENT_PKT {
            return Ok(None);
        }

        let code = self.bytes.get(1).copied().ok_or(DecodeError::Truncated {
            what: "event header",
            needed: HEADER_LEN,
            actual: self.bytes.len(),
        })?;
        let params = self.params()?;

        match code {
            EVT_DISCONN_COMPLETE => decode_disconnect_complete(params)
                .map(|event| Some(RadioEvent::DisconnectComplete(event))),
            EVT_LE_META_EVENT => match params.split_first() {
                Some((&EVT_LE_CONN_COMPLETE, data)) => decode_connection_complete(data)
                    .map(|event| Some(RadioEvent::ConnectionComplete(event))),
                Some(_) => Ok(None),
                None => Err(DecodeError::Truncated {
                    what: "LE meta event",
                    needed: 1,
                    actual: 0,
                }),
            },
            EVT_VENDOR => {
                if params.len() < 2 {
                    return Err(DecodeError::Truncated {
                        what: "vendor event",
                        needed: 2,
                        actual: params.len(),
                    });
                }
                let ecode = u16::from_le_bytes([params[0], params[1]]);
                if ecode != EVT_BLUE_GATT_ATTRIBUTE_MODIFIED {
                    return Ok(None);
                }
                decode_attribute_modified(&params[2..], board)
                    .map(|event| Some(RadioEvent::AttributeModified(event)))
            }
            _ => Ok(None),
        }
    }
}

impl fmt::Debug for RawEvent<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RawEvent({})", hex::encode(self.bytes))
    }
}

// ----------------------------------------------------------------------------
// Decoders
// ----------------------------------------------------------------------------

fn read_u16(data: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([data[offset], data[offset + 1]])
}

fn require(what: &'static str, data: &[u8], needed: usize) -> Result<(), DecodeError> {
    if data.len() < needed {
        Err(DecodeError::Truncated {
            what,
            needed,
            actual: data.len(),
        })
    } else {
        Ok(())
    }
}

/// Decode disconnection complete parameters
pub fn decode_disconnect_complete(params: &[u8]) -> Result<DisconnectComplete, DecodeError> {
    require("disconnect complete", params, DISCONN_COMPLETE_LEN)?;
    Ok(DisconnectComplete {
        status: params[0],
        handle: read_u16(params, 1),
        reason: params[3],
    })
}

/// Decode LE connection complete sub-event data
pub fn decode_connection_complete(data: &[u8]) -> Result<ConnectionComplete, DecodeError> {
    require("connection complete", data, CONN_COMPLETE_LEN)?;
    let mut peer_address = [0u8; 6];
    peer_address.copy_from_slice(&data[5..11]);
    Ok(ConnectionComplete {
        status: data[0],
        handle: read_u16(data, 1),
        role: data[3],
        peer_address_type: data[4],
        peer_address,
        interval: read_u16(data, 11),
        latency: read_u16(data, 13),
        supervision_timeout: read_u16(data, 15),
        master_clock_accuracy: data[17],
    })
}

/// Decode GATT attribute-modified vendor data for a board revision
pub fn decode_attribute_modified(
    data: &[u8],
    board: ExpansionBoard,
) -> Result<AttributeModified<'_>, DecodeError> {
    let (header, offset) = match board {
        ExpansionBoard::Idb05a1 => {
            require("attribute modified", data, ATTR_MODIFIED_IDB05A1_HEADER)?;
            (ATTR_MODIFIED_IDB05A1_HEADER, Some(read_u16(data, 5)))
        }
        ExpansionBoard::Idb04a1 => {
            require("attribute modified", data, ATTR_MODIFIED_IDB04A1_HEADER)?;
            (ATTR_MODIFIED_IDB04A1_HEADER, None)
        }
        ExpansionBoard::Unknown => return Err(DecodeError::UnknownBoard),
    };

    let data_len = data[4] as usize;
    require("attribute data", &data[header..], data_len)?;

    Ok(AttributeModified {
        conn_handle: read_u16(data, 0),
        attr_handle: read_u16(data, 2),
        offset,
        data: &data[header..header + data_len],
    })
}

// ----------------------------------------------------------------------------
// Encoders
// ----------------------------------------------------------------------------

/// Raw event buffer, sized for the largest event built here
pub type EventBuf = SmallVec<[u8; 64]>;

/// Largest attribute value one attribute-modified event can carry on `board`
pub const fn max_attribute_data_len(board: ExpansionBoard) -> usize {
    let header = match board {
        ExpansionBoard::Idb04a1 => ATTR_MODIFIED_IDB04A1_HEADER,
        _ => ATTR_MODIFIED_IDB05A1_HEADER,
    };
    u8::MAX as usize - VENDOR_ECODE_LEN - header
}

fn hci_event(code: u8, len: u8, params: &[u8]) -> EventBuf {
    let mut buf = EventBuf::new();
    buf.push(HCI_EVENT_PKT);
    buf.push(code);
    buf.push(len);
    buf.extend_from_slice(params);
    buf
}

/// Build a raw disconnection complete event
pub fn encode_disconnect_complete(event: &DisconnectComplete) -> EventBuf {
    let mut params = [0u8; DISCONN_COMPLETE_LEN];
    params[0] = event.status;
    params[1..3].copy_from_slice(&event.handle.to_le_bytes());
    params[3] = event.reason;
    hci_event(EVT_DISCONN_COMPLETE, DISCONN_COMPLETE_LEN as u8, &params)
}

/// Build a raw LE connection complete event
pub fn encode_connection_complete(event: &ConnectionComplete) -> EventBuf {
    let mut params: SmallVec<[u8; 32]> = SmallVec::new();
    params.push(EVT_LE_CONN_COMPLETE);
    params.push(event.status);
    params.extend_from_slice(&event.handle.to_le_bytes());
    params.push(event.role);
    params.push(event.peer_address_type);
    params.extend_from_slice(&event.peer_address);
    params.extend_from_slice(&event.interval.to_le_bytes());
    params.extend_from_slice(&event.latency.to_le_bytes());
    params.extend_from_slice(&event.supervision_timeout.to_le_bytes());
    params.push(event.master_clock_accuracy);
    hci_event(EVT_LE_META_EVENT, (CONN_COMPLETE_LEN + 1) as u8, &params)
}

/// Build a raw attribute-modified vendor event in a board revision's layout
///
/// The offset is only encoded for IDB05A1; `Unknown` uses the IDB05A1 layout.
/// Returns `None` if `data` is longer than [`max_attribute_data_len`] allows.
pub fn encode_attribute_modified(
    conn_handle: u16,
    attr_handle: u16,
    data: &[u8],
    board: ExpansionBoard,
) -> Option<EventBuf> {
    if data.len() > max_attribute_data_len(board) {
        return None;
    }
    let data_len = u8::try_from(data.len()).ok()?;

    let mut params: SmallVec<[u8; 64]> = SmallVec::new();
    params.extend_from_slice(&EVT_BLUE_GATT_ATTRIBUTE_MODIFIED.to_le_bytes());
    params.extend_from_slice(&conn_handle.to_le_bytes());
    params.extend_from_slice(&attr_handle.to_le_bytes());
    params.push(data_len);
    if board != ExpansionBoard::Idb04a1 {
        params.extend_from_slice(&0u16.to_le_bytes());
    }
    params.extend_from_slice(data);

    let len = u8::try_from(params.len()).ok()?;
    Some(hci_event(EVT_VENDOR, len, &params))
}
