//! Frame codec
//!
//! Each message on the wire is a 4-byte big-endian length followed by a
//! msgpack encoded map. Messages are handled as `serde_json::Value` maps
//! in memory so the same code serves requests, responses and the test mock.

use std::io::{self, Read, Write};

use serde_json::Value;

use super::messages::Request;
use crate::error::BngError;

/// Largest frame we are willing to allocate for.
pub const MAX_FRAME_LEN: usize = 64 * 1024 * 1024;

/// Key carrying the request id.
pub const ID_KEY: &str = "_id";

/// Serialize a request and stamp it with `id`.
///
/// # Errors
/// Returns an error if the request cannot be encoded.
pub fn encode_request(id: u64, request: &Request) -> Result<Vec<u8>, BngError> {
    let mut value = serde_json::to_value(request)?;
    let map = value.as_object_mut().ok_or_else(|| {
        BngError::Protocol(format!(
            "{} did not serialize to a map",
            request.type_name()
        ))
    })?;
    map.insert(ID_KEY.to_string(), Value::from(id));
    encode_message(&value)
}

/// Encode an arbitrary message map as msgpack.
///
/// Structs are written with field names so the peer sees maps, not arrays.
///
/// # Errors
/// Returns [`BngError::Encode`] on serialization failure.
pub fn encode_message(message: &Value) -> Result<Vec<u8>, BngError> {
    Ok(rmp_serde::to_vec_named(message)?)
}

/// Decode a msgpack payload into a message map.
///
/// # Errors
/// Returns [`BngError::Decode`] for malformed payloads and
/// [`BngError::Protocol`] if the payload is not a map.
pub fn decode_message(payload: &[u8]) -> Result<Value, BngError> {
    let value: Value = rmp_serde::from_slice(payload)?;
    if value.is_object() {
        Ok(value)
    } else {
        Err(BngError::Protocol(format!("expected a map, got {value}")))
    }
}

/// Write one length-prefixed frame.
///
/// # Errors
/// Returns an error if the payload is too large or the write fails.
pub fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> Result<(), BngError> {
    if payload.len() > MAX_FRAME_LEN {
        return Err(BngError::Protocol(format!(
            "outgoing frame of {} bytes exceeds limit of {MAX_FRAME_LEN}",
            payload.len()
        )));
    }
    let len = u32::try_from(payload.len())
        .map_err(|_| BngError::Protocol("frame length does not fit in u32".to_string()))?;
    writer.write_all(&len.to_be_bytes())?;
    writer.write_all(payload)?;
    writer.flush()?;
    Ok(())
}

/// Read one length-prefixed frame.
///
/// # Errors
/// Returns [`BngError::ConnectionFailed`] if the peer closed the stream,
/// [`BngError::Timeout`] if the read timed out, and [`BngError::Protocol`]
/// for oversized frames.
pub fn read_frame<R: Read>(reader: &mut R) -> Result<Vec<u8>, BngError> {
    let mut header = [0u8; 4];
    reader.read_exact(&mut header).map_err(eof_as_closed)?;
    let len = u32::from_be_bytes(header) as usize;
    if len > MAX_FRAME_LEN {
        return Err(BngError::Protocol(format!(
            "incoming frame of {len} bytes exceeds limit of {MAX_FRAME_LEN}"
        )));
    }
    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).map_err(eof_as_closed)?;
    Ok(payload)
}

fn eof_as_closed(err: io::Error) -> BngError {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        BngError::ConnectionFailed("simulator closed the connection".to_string())
    } else {
        err.into()
    }
}

/// Validate a response against the request it answers.
///
/// Checks, in order: simulator error markers, the echoed request id, and the
/// response `type`.
///
/// # Errors
/// Returns [`BngError::Simulator`], [`BngError::InvalidValue`],
/// [`BngError::Protocol`] or [`BngError::UnexpectedResponse`].
pub fn check_response(message: Value, expected: &str, id: Option<u64>) -> Result<Value, BngError> {
    if let Some(err) = message.get("bngError") {
        return Err(BngError::Simulator(value_text(err)));
    }
    if let Some(err) = message.get("bngValueError") {
        return Err(BngError::InvalidValue(value_text(err)));
    }
    if let (Some(sent), Some(echoed)) = (id, message.get(ID_KEY).and_then(Value::as_u64)) {
        if sent != echoed {
            return Err(BngError::Protocol(format!(
                "response id {echoed} does not match request id {sent}"
            )));
        }
    }
    let got = message.get("type").and_then(Value::as_str).unwrap_or("<untyped>");
    if got != expected {
        return Err(BngError::UnexpectedResponse {
            expected: expected.to_string(),
            got: got.to_string(),
        });
    }
    Ok(message)
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
