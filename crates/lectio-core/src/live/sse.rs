//! Server-sent-event encoding for streamed search results.
//!
//! The HTTP layer proper lives outside this crate; what it needs from us
//! is the exact wire shape of an event and the response headers that keep
//! proxies from buffering the stream. `write_event` flushes after every
//! event so the discovery phase reaches the client before scoring starts.

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::search::types::StreamedSearchEvent;

/// Response headers for an event-stream endpoint.
pub const SSE_HEADERS: &[(&str, &str)] = &[
    ("Content-Type", "text/event-stream"),
    ("Cache-Control", "no-cache"),
    ("Connection", "keep-alive"),
    ("X-Accel-Buffering", "no"),
];

/// Encodes one event as `event: <phase>\ndata: <json>\n\n`.
pub fn encode_event(event: &StreamedSearchEvent) -> String {
    let data = serde_json::to_string(&event.result).unwrap_or_else(|_| "{}".to_string());
    format!("event: {}\ndata: {}\n\n", event.phase.as_str(), data)
}

/// Writes and flushes one event.
pub async fn write_event<W: AsyncWrite + Unpin>(
    writer: &mut W,
    event: &StreamedSearchEvent,
) -> std::io::Result<()> {
    writer.write_all(encode_event(event).as_bytes()).await?;
    writer.flush().await
}
