//! Server-sent events over HTTP.
//!
//! [`SseDecoder`] turns raw response chunks into event payloads;
//! [`SseConnector`] is the production [`EventSourceConnector`].

use crate::error::FeedError;
use crate::feed::stream::{EventSourceConnector, EventStream};
use async_trait::async_trait;
use futures::{stream, StreamExt};
use reqwest::header::{ACCEPT, CACHE_CONTROL};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Longest single line kept; anything longer is discarded up to its newline
pub const MAX_LINE_BYTES: usize = 64 * 1024;
/// Largest event payload kept; a larger event is dropped whole
pub const MAX_EVENT_BYTES: usize = 256 * 1024;

/// Incremental `text/event-stream` frame decoder.
///
/// Only `data:` fields are kept; multiple data lines in one event are joined
/// with `\n`. Comments, `event:`, `id:` and `retry:` fields are ignored. An
/// event is emitted at each blank line.
///
/// Memory is bounded by [`MAX_LINE_BYTES`] and [`MAX_EVENT_BYTES`]. An
/// oversized line or event is skipped and decoding resumes with the next
/// event.
#[derive(Debug, Default)]
pub struct SseDecoder {
    pending: Vec<u8>,
    data: Vec<String>,
    data_len: usize,
    /// Inside an overlong line, waiting for its newline
    skipping_line: bool,
    /// Inside an oversized event, waiting for the blank line
    skipping_event: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of bytes; returns every event completed by it
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut events = Vec::new();
        let mut rest = chunk;

        while let Some(pos) = rest.iter().position(|&b| b == b'\n') {
            let (head, tail) = rest.split_at(pos);
            rest = &tail[1..];

            if self.skipping_line {
                self.skipping_line = false;
                self.pending.clear();
                continue;
            }
            if self.pending.len() + head.len() > MAX_LINE_BYTES {
                debug!(
                    bytes = self.pending.len() + head.len(),
                    "Dropping oversized event stream line"
                );
                self.pending.clear();
                self.drop_event();
                continue;
            }

            let line = if self.pending.is_empty() {
                self.decode_line(head)
            } else {
                let mut joined = std::mem::take(&mut self.pending);
                joined.extend_from_slice(head);
                self.decode_line(&joined)
            };
            if let Some(event) = line {
                events.push(event);
            }
        }

        if !self.skipping_line {
            if self.pending.len() + rest.len() > MAX_LINE_BYTES {
                debug!(
                    bytes = self.pending.len() + rest.len(),
                    "Dropping oversized event stream line"
                );
                self.pending.clear();
                self.skipping_line = true;
                self.drop_event();
            } else {
                self.pending.extend_from_slice(rest);
            }
        }
        events
    }

    fn decode_line(&mut self, raw: &[u8]) -> Option<String> {
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
        let line = String::from_utf8_lossy(raw);
        self.process_line(&line)
    }

    /// Discard the partial event and ignore its remaining lines
    fn drop_event(&mut self) {
        self.data.clear();
        self.data_len = 0;
        self.skipping_event = true;
    }

    fn process_line(&mut self, line: &str) -> Option<String> {
        if line.is_empty() {
            if self.skipping_event {
                self.skipping_event = false;
                return None;
            }
            if self.data.is_empty() {
                return None;
            }
            let event = self.data.join("\n");
            self.data.clear();
            self.data_len = 0;
            return Some(event);
        }

        if self.skipping_event || line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        if field == "data" {
            self.data_len += value.len() + 1;
            if self.data_len > MAX_EVENT_BYTES {
                debug!(bytes = self.data_len, "Dropping oversized event");
                self.drop_event();
                return None;
            }
            self.data.push(value.to_string());
        }
        None
    }
}

/// Opens the event stream endpoint with reqwest
pub struct SseConnector {
    client: Client,
    url: String,
}

impl SseConnector {
    /// `read_timeout` bounds the silence between chunks, so a half-open
    /// connection surfaces as an error instead of a stream that never ends.
    pub fn new(
        url: impl Into<String>,
        connect_timeout: Duration,
        read_timeout: Duration,
    ) -> Result<Self, FeedError> {
        // no overall request timeout: the response body is long-lived
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .read_timeout(read_timeout)
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl EventSourceConnector for SseConnector {
    async fn open(&self) -> Result<EventStream, FeedError> {
        debug!(url = %self.url, "Opening event stream");

        let response = self
            .client
            .get(&self.url)
            .header(ACCEPT, "text/event-stream")
            .header(CACHE_CONTROL, "no-cache")
            .send()
            .await?
            .error_for_status()?;

        let mut decoder = SseDecoder::new();
        let events = response
            .bytes_stream()
            .map(move |chunk| chunk.map(|bytes| decoder.feed(&bytes)))
            .flat_map(|chunk| match chunk {
                Ok(events) => stream::iter(events.into_iter().map(Ok::<_, FeedError>)).left_stream(),
                Err(e) => stream::once(async move { Err(FeedError::from(e)) }).right_stream(),
            });

        Ok(events.boxed())
    }
}
