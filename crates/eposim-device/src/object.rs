//! Read Object and Write Object payload layouts.
//!
//! All multi-byte fields are little-endian. Requests carry the object index,
//! subindex and target node; responses carry a 32-bit error code and, for
//! reads, the 32-bit value.

use std::fmt;

use bytes::{Buf, BufMut, BytesMut};
use eposim_frame::Frame;

use crate::error::{RequestError, Result};

/// Opcode of a Read Object request.
pub const READ_OBJECT: u8 = 0x10;

/// Opcode of a Write Object request.
pub const WRITE_OBJECT: u8 = 0x11;

/// Opcode of every device response.
pub const RESPONSE: u8 = 0x00;

/// Minimum payload of a Read Object request: index, subindex, node.
pub const READ_REQUEST_MIN: usize = 4;

/// Minimum payload of a Write Object request: address plus a 32-bit value.
pub const WRITE_REQUEST_MIN: usize = 8;

/// Payload of a Read Object response: error code plus value.
pub const READ_RESPONSE_LEN: usize = 8;

/// Payload of a Write Object response: error code only.
pub const WRITE_RESPONSE_LEN: usize = 4;

/// An object dictionary entry: 16-bit index plus 8-bit subindex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectAddress {
    pub index: u16,
    pub subindex: u8,
}

impl ObjectAddress {
    pub const fn new(index: u16, subindex: u8) -> Self {
        Self { index, subindex }
    }

    /// Register key used by controller stores: `(index << 8) | subindex`.
    pub const fn key(self) -> u32 {
        ((self.index as u32) << 8) | self.subindex as u32
    }

    /// Inverse of [`ObjectAddress::key`]. Bits above 24 are ignored.
    pub const fn from_key(key: u32) -> Self {
        Self {
            index: (key >> 8) as u16,
            subindex: key as u8,
        }
    }
}

impl fmt::Display for ObjectAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}[{}]", self.index, self.subindex)
    }
}

/// A decoded master request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    ReadObject {
        node: u8,
        address: ObjectAddress,
    },
    WriteObject {
        node: u8,
        address: ObjectAddress,
        value: u32,
    },
}

impl Request {
    /// Interpret a received frame as a request.
    ///
    /// Bytes beyond the fields an operation needs are ignored.
    pub fn parse(frame: &Frame) -> Result<Self> {
        let min = match frame.opcode {
            READ_OBJECT => READ_REQUEST_MIN,
            WRITE_OBJECT => WRITE_REQUEST_MIN,
            other => return Err(RequestError::UnsupportedOpcode(other)),
        };
        if frame.payload.len() < min {
            return Err(RequestError::ShortPayload {
                opcode: frame.opcode,
                len: frame.payload.len(),
                min,
            });
        }

        let mut buf = &frame.payload[..];
        let index = buf.get_u16_le();
        let subindex = buf.get_u8();
        let node = buf.get_u8();
        let address = ObjectAddress::new(index, subindex);

        Ok(match frame.opcode {
            READ_OBJECT => Request::ReadObject { node, address },
            _ => Request::WriteObject {
                node,
                address,
                value: buf.get_u32_le(),
            },
        })
    }

    /// Target node identifier.
    pub fn node(&self) -> u8 {
        match *self {
            Request::ReadObject { node, .. } | Request::WriteObject { node, .. } => node,
        }
    }

    /// Addressed object.
    pub fn address(&self) -> ObjectAddress {
        match *self {
            Request::ReadObject { address, .. } | Request::WriteObject { address, .. } => address,
        }
    }

    pub fn opcode(&self) -> u8 {
        match self {
            Request::ReadObject { .. } => READ_OBJECT,
            Request::WriteObject { .. } => WRITE_OBJECT,
        }
    }

    /// Build the frame a master sends for this request.
    pub fn to_frame(&self) -> Frame {
        let mut buf = BytesMut::with_capacity(WRITE_REQUEST_MIN);
        let address = self.address();
        buf.put_u16_le(address.index);
        buf.put_u8(address.subindex);
        buf.put_u8(self.node());
        if let Request::WriteObject { value, .. } = *self {
            buf.put_u32_le(value);
        }
        Frame::new(self.opcode(), buf.freeze())
    }
}

/// A device response to a [`Request`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response {
    ReadObject { error: u32, value: u32 },
    WriteObject { error: u32 },
}

impl Response {
    /// Device error code, zero on success.
    pub fn error(&self) -> u32 {
        match *self {
            Response::ReadObject { error, .. } | Response::WriteObject { error } => error,
        }
    }

    /// Value read, if this answers a read.
    pub fn value(&self) -> Option<u32> {
        match *self {
            Response::ReadObject { value, .. } => Some(value),
            Response::WriteObject { .. } => None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error() == 0
    }

    /// Build the response frame a device sends.
    pub fn to_frame(&self) -> Frame {
        let mut buf = BytesMut::with_capacity(READ_RESPONSE_LEN);
        buf.put_u32_le(self.error());
        if let Response::ReadObject { value, .. } = *self {
            buf.put_u32_le(value);
        }
        Frame::new(RESPONSE, buf.freeze())
    }

    /// Interpret a frame received in answer to `request`.
    ///
    /// The frame must carry the response opcode and exactly the payload
    /// length of the matching response kind.
    pub fn parse_for(request: &Request, frame: &Frame) -> Result<Self> {
        if frame.opcode != RESPONSE {
            return Err(RequestError::BadResponse(format!(
                "opcode {:#04x}, expected {RESPONSE:#04x}",
                frame.opcode
            )));
        }

        let expected = match request {
            Request::ReadObject { .. } => READ_RESPONSE_LEN,
            Request::WriteObject { .. } => WRITE_RESPONSE_LEN,
        };
        if frame.payload.len() != expected {
            return Err(RequestError::BadResponse(format!(
                "{} payload bytes, expected {expected}",
                frame.payload.len()
            )));
        }

        let mut buf = &frame.payload[..];
        let error = buf.get_u32_le();
        Ok(match request {
            Request::ReadObject { .. } => Response::ReadObject {
                error,
                value: buf.get_u32_le(),
            },
            Request::WriteObject { .. } => Response::WriteObject { error },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use eposim_frame::{decode_frame, encode_frame};

    const SERIAL: ObjectAddress = ObjectAddress::new(0x1018, 4);

    fn wire(frame: &Frame) -> Vec<u8> {
        let mut buf = BytesMut::new();
        encode_frame(frame.opcode, &frame.payload, &mut buf).unwrap();
        buf.to_vec()
    }

    #[test]
    fn address_key_layout() {
        assert_eq!(SERIAL.key(), 0x0010_1804);
        assert_eq!(ObjectAddress::from_key(0x0060_4000), ObjectAddress::new(0x6040, 0));
        assert_eq!(SERIAL.to_string(), "0x1018[4]");
    }

    #[test]
    fn parses_read_request() {
        let frame = decode_frame(&[0x10, 0x01, 0x18, 0x10, 0x04, 0x01, 0x05, 0x32]).unwrap();

        let request = Request::parse(&frame).unwrap();

        assert_eq!(
            request,
            Request::ReadObject {
                node: 1,
                address: SERIAL
            }
        );
    }

    #[test]
    fn parses_write_request() {
        let frame = decode_frame(&[
            0x11, 0x03, 0x40, 0x60, 0x00, 0x03, 0xEF, 0xBE, 0xAD, 0xDE, 0xC7, 0xC5,
        ])
        .unwrap();

        let request = Request::parse(&frame).unwrap();

        assert_eq!(
            request,
            Request::WriteObject {
                node: 3,
                address: ObjectAddress::new(0x6040, 0),
                value: 0xDEAD_BEEF
            }
        );
    }

    #[test]
    fn trailing_request_bytes_are_ignored() {
        let frame = Frame::new(READ_OBJECT, vec![0x41, 0x60, 0x00, 0x02, 0xFF, 0xFF]);

        let request = Request::parse(&frame).unwrap();

        assert_eq!(request.node(), 2);
        assert_eq!(request.address(), ObjectAddress::new(0x6041, 0));
    }

    #[test]
    fn short_write_payload_rejected() {
        let frame = Frame::new(WRITE_OBJECT, vec![0x40, 0x60, 0x00, 0x03]);

        let err = Request::parse(&frame).unwrap_err();

        assert!(matches!(
            err,
            RequestError::ShortPayload {
                opcode: WRITE_OBJECT,
                len: 4,
                min: 8
            }
        ));
    }

    #[test]
    fn unknown_opcode_rejected() {
        let frame = Frame::new(0x20, vec![0x01, 0x02]);

        let err = Request::parse(&frame).unwrap_err();

        assert!(matches!(err, RequestError::UnsupportedOpcode(0x20)));
    }

    #[test]
    fn request_frames_match_wire_layout() {
        let read = Request::ReadObject {
            node: 1,
            address: SERIAL,
        };
        assert_eq!(
            wire(&read.to_frame()),
            vec![0x10, 0x01, 0x18, 0x10, 0x04, 0x01, 0x05, 0x32]
        );

        let write = Request::WriteObject {
            node: 3,
            address: ObjectAddress::new(0x6040, 0),
            value: 0xDEAD_BEEF,
        };
        let frame = write.to_frame();
        assert_eq!(frame.length_field(), 3);
        assert_eq!(
            wire(&frame),
            vec![0x11, 0x03, 0x40, 0x60, 0x00, 0x03, 0xEF, 0xBE, 0xAD, 0xDE, 0xC7, 0xC5]
        );
    }

    #[test]
    fn requests_survive_the_wire_at_boundaries() {
        for node in [0u8, 15, 255] {
            for index in [0x0000u16, 0xFFFF] {
                for subindex in [0u8, 255] {
                    let address = ObjectAddress::new(index, subindex);
                    let requests = [
                        Request::ReadObject { node, address },
                        Request::WriteObject {
                            node,
                            address,
                            value: 0xFFFF_FFFF,
                        },
                    ];
                    for request in requests {
                        let decoded = decode_frame(&wire(&request.to_frame())).unwrap();
                        assert_eq!(Request::parse(&decoded).unwrap(), request);
                    }
                }
            }
        }
    }

    #[test]
    fn response_frames_match_wire_layout() {
        let read = Response::ReadObject {
            error: 0,
            value: 0x0901_0537,
        };
        assert_eq!(
            wire(&read.to_frame()),
            vec![0x00, 0x03, 0, 0, 0, 0, 0x37, 0x05, 0x01, 0x09, 0x8D, 0x7B]
        );

        let write = Response::WriteObject { error: 0 };
        assert_eq!(
            wire(&write.to_frame()),
            vec![0x00, 0x01, 0, 0, 0, 0, 0x51, 0xAA]
        );

        let unknown = Response::WriteObject { error: 0x0F00_FFB9 };
        assert_eq!(
            wire(&unknown.to_frame()),
            vec![0x00, 0x01, 0xB9, 0xFF, 0x00, 0x0F, 0xA2, 0x91]
        );
    }

    #[test]
    fn parse_for_reads_value() {
        let request = Request::ReadObject {
            node: 1,
            address: SERIAL,
        };
        let frame = Frame::new(
            RESPONSE,
            Bytes::from_static(&[0, 0, 0, 0, 0x37, 0x05, 0x01, 0x09]),
        );

        let response = Response::parse_for(&request, &frame).unwrap();

        assert!(response.is_success());
        assert_eq!(response.value(), Some(0x0901_0537));
    }

    #[test]
    fn parse_for_rejects_wrong_shape() {
        let request = Request::ReadObject {
            node: 1,
            address: SERIAL,
        };

        let wrong_opcode = Frame::new(0x10, vec![0u8; 8]);
        assert!(matches!(
            Response::parse_for(&request, &wrong_opcode),
            Err(RequestError::BadResponse(_))
        ));

        let write_sized = Frame::new(RESPONSE, vec![0u8; 4]);
        assert!(matches!(
            Response::parse_for(&request, &write_sized),
            Err(RequestError::BadResponse(_))
        ));
    }

    #[test]
    fn write_response_has_no_value() {
        let request = Request::WriteObject {
            node: 1,
            address: ObjectAddress::new(0x6040, 0),
            value: 6,
        };
        let frame = Frame::new(RESPONSE, vec![0xB9, 0xFF, 0x00, 0x0F]);

        let response = Response::parse_for(&request, &frame).unwrap();

        assert_eq!(response.error(), 0x0F00_FFB9);
        assert_eq!(response.value(), None);
        assert!(!response.is_success());
    }
}
