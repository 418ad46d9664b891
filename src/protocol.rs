// printex - Distributed mutual exclusion among peer processes via
// Ricart-Agrawala, guarding a single shared printer resource
// Copyright (C) 2026  printex contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

// Wire format for the peer-to-peer and peer-to-printer RPCs, grounded in the
// same header-plus-variant, nom-parsed binary framing this crate's teacher
// uses for its own lookup protocol: a one-byte protocol version, a one-byte
// message variant, then a variant-specific body. Each frame here is carried
// inside one `tokio_util::codec::LengthDelimitedCodec` frame, so, unlike the
// teacher, a parser never has to cope with a partial or fused message.

use std::convert::TryFrom;

use bytes::{BufMut, Bytes, BytesMut};

use nom::bytes::complete::take;
use nom::combinator::map;
use nom::number::complete::{le_u32, le_u64, le_u8};
use nom::IResult;

use crate::error::Error;

pub const PROTOCOL_VERSION: u8 = 1;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Variant {
    AccessRequest = 0,
    AccessResponse = 1,
    AccessRelease = 2,
    PrintRequest = 3,
    PrintResponse = 4,
}

impl TryFrom<u8> for Variant {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            x if x == Variant::AccessRequest as u8 => Ok(Variant::AccessRequest),
            x if x == Variant::AccessResponse as u8 => Ok(Variant::AccessResponse),
            x if x == Variant::AccessRelease as u8 => Ok(Variant::AccessRelease),
            x if x == Variant::PrintRequest as u8 => Ok(Variant::PrintRequest),
            x if x == Variant::PrintResponse as u8 => Ok(Variant::PrintResponse),
            x => Err(Error::InvalidVariant(x)),
        }
    }
}

struct Header {
    protocol_version: u8,
    raw_variant: u8,
}

impl Header {
    fn parse(input: &[u8]) -> IResult<&[u8], Header> {
        let (input, protocol_version) = le_u8(input)?;
        let (input, raw_variant) = le_u8(input)?;

        Ok((
            input,
            Header {
                protocol_version,
                raw_variant,
            },
        ))
    }

    fn put(buf: &mut BytesMut, variant: Variant) {
        buf.put_u8(PROTOCOL_VERSION);
        buf.put_u8(variant as u8);
    }
}

/// `AccessRequest { client_id, lamport_timestamp, request_number }` (spec.md §6).
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct AccessRequest {
    pub client_id: u32,
    pub lamport_timestamp: u64,
    pub request_number: u64,
}

/// `AccessResponse { access_granted, lamport_timestamp }` (spec.md §6).
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct AccessResponse {
    pub access_granted: bool,
    pub lamport_timestamp: u64,
}

/// `AccessRelease { client_id, lamport_timestamp, request_number }` (spec.md §6).
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct AccessRelease {
    pub client_id: u32,
    pub lamport_timestamp: u64,
    pub request_number: u64,
}

/// `PrintRequest { client_id, message_content, lamport_timestamp, request_number }` (spec.md §6).
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct PrintRequest {
    pub client_id: u32,
    pub message_content: String,
    pub lamport_timestamp: u64,
    pub request_number: u64,
}

/// `PrintResponse { success, confirmation_message, lamport_timestamp }` (spec.md §6).
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct PrintResponse {
    pub success: bool,
    pub confirmation_message: String,
    pub lamport_timestamp: u64,
}

/// A parsed, framed message — the request/response handler dispatches on this.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Message {
    AccessRequest(AccessRequest),
    AccessResponse(AccessResponse),
    AccessRelease(AccessRelease),
    PrintRequest(PrintRequest),
    PrintResponse(PrintResponse),
}

impl Message {
    pub fn parse(input: &[u8]) -> Result<Message, Error> {
        let (body, header) = Header::parse(input).map_err(|_| Error::MalformedFrame)?;

        if header.protocol_version != PROTOCOL_VERSION {
            return Err(Error::VersionMismatch {
                expected: PROTOCOL_VERSION,
                received: header.protocol_version,
            });
        }

        let variant = Variant::try_from(header.raw_variant)?;

        parse_body(variant, body)
            .map(|(_, message)| message)
            .map_err(|_: nom::Err<nom::error::Error<&[u8]>>| Error::MalformedFrame)
    }

    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::new();

        match self {
            Message::AccessRequest(m) => {
                Header::put(&mut buf, Variant::AccessRequest);
                buf.put_u32_le(m.client_id);
                buf.put_u64_le(m.lamport_timestamp);
                buf.put_u64_le(m.request_number);
            }
            Message::AccessResponse(m) => {
                Header::put(&mut buf, Variant::AccessResponse);
                buf.put_u8(m.access_granted as u8);
                buf.put_u64_le(m.lamport_timestamp);
            }
            Message::AccessRelease(m) => {
                Header::put(&mut buf, Variant::AccessRelease);
                buf.put_u32_le(m.client_id);
                buf.put_u64_le(m.lamport_timestamp);
                buf.put_u64_le(m.request_number);
            }
            Message::PrintRequest(m) => {
                Header::put(&mut buf, Variant::PrintRequest);
                buf.put_u32_le(m.client_id);
                buf.put_u64_le(m.lamport_timestamp);
                buf.put_u64_le(m.request_number);
                put_string(&mut buf, &m.message_content);
            }
            Message::PrintResponse(m) => {
                Header::put(&mut buf, Variant::PrintResponse);
                buf.put_u8(m.success as u8);
                buf.put_u64_le(m.lamport_timestamp);
                put_string(&mut buf, &m.confirmation_message);
            }
        }

        buf.freeze()
    }
}

fn put_string(buf: &mut BytesMut, s: &str) {
    buf.put_u32_le(s.len() as u32);
    buf.put_slice(s.as_bytes());
}

fn parse_string(input: &[u8]) -> IResult<&[u8], String> {
    let (input, len) = le_u32(input)?;
    let (input, raw) = take(len)(input)?;

    let s = std::str::from_utf8(raw)
        .map_err(|_| nom::Err::Failure(nom::error::Error::new(input, nom::error::ErrorKind::Verify)))?;

    Ok((input, s.to_owned()))
}

fn parse_body(variant: Variant, input: &[u8]) -> IResult<&[u8], Message> {
    match variant {
        Variant::AccessRequest => {
            let (input, client_id) = le_u32(input)?;
            let (input, lamport_timestamp) = le_u64(input)?;
            let (input, request_number) = le_u64(input)?;

            Ok((
                input,
                Message::AccessRequest(AccessRequest {
                    client_id,
                    lamport_timestamp,
                    request_number,
                }),
            ))
        }
        Variant::AccessResponse => {
            let (input, access_granted) = map(le_u8, |b| b != 0)(input)?;
            let (input, lamport_timestamp) = le_u64(input)?;

            Ok((
                input,
                Message::AccessResponse(AccessResponse {
                    access_granted,
                    lamport_timestamp,
                }),
            ))
        }
        Variant::AccessRelease => {
            let (input, client_id) = le_u32(input)?;
            let (input, lamport_timestamp) = le_u64(input)?;
            let (input, request_number) = le_u64(input)?;

            Ok((
                input,
                Message::AccessRelease(AccessRelease {
                    client_id,
                    lamport_timestamp,
                    request_number,
                }),
            ))
        }
        Variant::PrintRequest => {
            let (input, client_id) = le_u32(input)?;
            let (input, lamport_timestamp) = le_u64(input)?;
            let (input, request_number) = le_u64(input)?;
            let (input, message_content) = parse_string(input)?;

            Ok((
                input,
                Message::PrintRequest(PrintRequest {
                    client_id,
                    lamport_timestamp,
                    request_number,
                    message_content,
                }),
            ))
        }
        Variant::PrintResponse => {
            let (input, success) = map(le_u8, |b| b != 0)(input)?;
            let (input, lamport_timestamp) = le_u64(input)?;
            let (input, confirmation_message) = parse_string(input)?;

            Ok((
                input,
                Message::PrintResponse(PrintResponse {
                    success,
                    lamport_timestamp,
                    confirmation_message,
                }),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_access_request() {
        let msg = Message::AccessRequest(AccessRequest {
            client_id: 2,
            lamport_timestamp: 5,
            request_number: 3,
        });

        let bytes = msg.to_bytes();
        let parsed = Message::parse(&bytes).unwrap();

        assert_eq!(parsed, msg);
    }

    #[test]
    fn round_trips_access_response() {
        let msg = Message::AccessResponse(AccessResponse {
            access_granted: true,
            lamport_timestamp: 42,
        });

        let bytes = msg.to_bytes();
        assert_eq!(Message::parse(&bytes).unwrap(), msg);
    }

    #[test]
    fn round_trips_print_request_with_message_content() {
        let msg = Message::PrintRequest(PrintRequest {
            client_id: 1,
            message_content: "print job from client 1".to_string(),
            lamport_timestamp: 10,
            request_number: 1,
        });

        let bytes = msg.to_bytes();
        assert_eq!(Message::parse(&bytes).unwrap(), msg);
    }

    #[test]
    fn rejects_unknown_variant() {
        let bytes: &[u8] = &[PROTOCOL_VERSION, 0xEE];

        assert!(matches!(
            Message::parse(bytes),
            Err(Error::InvalidVariant(0xEE))
        ));
    }
}
