//! Server-Sent Events framing for JSON-RPC messages
//!
//! Every reply is one `data:` frame followed by the `data: [DONE]` sentinel.
//! The parser only consumes the first data frame; [`data_payloads`] yields all
//! of them for callers that need the whole stream.

use crate::error::ProtocolError;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Prefix of an SSE data line
const DATA_PREFIX: &str = "data: ";

/// Terminal sentinel payload; never JSON
pub const DONE_SENTINEL: &str = "[DONE]";

/// Frame a single message as one SSE event.
pub fn frame_as_sse<T: Serialize>(message: &T) -> Result<Vec<u8>, ProtocolError> {
    let json = serde_json::to_string(message)?;
    Ok(format!("{DATA_PREFIX}{json}\n\n").into_bytes())
}

/// Frame a complete reply stream: each message, then the `[DONE]` sentinel.
pub fn frame_stream<T: Serialize>(messages: &[T]) -> Result<Vec<u8>, ProtocolError> {
    let mut out = Vec::new();
    for message in messages {
        out.extend(frame_as_sse(message)?);
    }
    out.extend_from_slice(format!("{DATA_PREFIX}{DONE_SENTINEL}\n\n").as_bytes());
    Ok(out)
}

/// Iterate over every data payload in an SSE body, skipping the sentinel.
pub fn data_payloads(raw: &str) -> impl Iterator<Item = &str> {
    raw.lines()
        .map(str::trim)
        .filter_map(|line| line.strip_prefix(DATA_PREFIX))
        .filter(|payload| *payload != DONE_SENTINEL)
}

/// Decode the first data frame of an SSE body.
///
/// Later frames are ignored. A body with no data frame besides `[DONE]`
/// fails with [`ProtocolError::NoData`].
pub fn parse_sse<T: DeserializeOwned>(raw: &str) -> Result<T, ProtocolError> {
    let payload = data_payloads(raw).next().ok_or(ProtocolError::NoData)?;
    Ok(serde_json::from_str(payload)?)
}
