//! Decoding of `text/event-stream` response bodies.
//!
//! Both providers stream completions as server-sent events; only the `data:`
//! field carries payload, everything else (`event:`, `id:`, comments, blank
//! separators) is skipped.

use brochure_common::{BrochureError, Result};
use brochure_http::ByteStream;
use futures::stream::{BoxStream, StreamExt};

/// Turn a raw byte stream into the sequence of `data:` payloads.
///
/// Lines are reassembled across chunk boundaries before decoding, so a
/// multi-byte character split between two network reads stays intact.
pub(crate) fn data_payloads(mut body: ByteStream) -> BoxStream<'static, Result<String>> {
    async_stream::stream! {
        let mut buf: Vec<u8> = Vec::new();
        while let Some(chunk) = body.next().await {
            match chunk {
                Ok(bytes) => buf.extend_from_slice(&bytes),
                Err(e) => {
                    yield Err(BrochureError::Llm(format!("stream interrupted: {e}")));
                    return;
                }
            }
            while let Some(pos) = buf.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = buf.drain(..=pos).collect();
                if let Some(data) = parse_data_line(&line) {
                    yield Ok(data);
                }
            }
        }
        if let Some(data) = parse_data_line(&buf) {
            yield Ok(data);
        }
    }
    .boxed()
}

fn parse_data_line(line: &[u8]) -> Option<String> {
    let line = String::from_utf8_lossy(line);
    let line = line.trim_end_matches(|c| c == '\r' || c == '\n');
    let data = line.strip_prefix("data:")?;
    Some(data.strip_prefix(' ').unwrap_or(data).to_string())
}
