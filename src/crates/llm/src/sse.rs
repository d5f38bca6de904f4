//! Shared SSE -> [`TextStream`] adapter.

use crate::error::{LlmError, Result};
use crate::provider::TextStream;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use reqwest::Response;
use tracing::error;

/// Convert an SSE HTTP [`Response`] into a [`TextStream`].
///
/// `handler` receives the SSE event name and data payload for each event and
/// returns `Ok(Some(text))` to emit a fragment, `Ok(None)` to skip the event,
/// or an error that is surfaced as [`LlmError::StreamError`]. Empty fragments
/// are dropped.
///
/// The returned stream owns the response body; dropping it closes the
/// connection.
pub fn text_stream_from_sse<H>(response: Response, mut handler: H) -> TextStream
where
    H: FnMut(&str, &str) -> Result<Option<String>> + Send + 'static,
{
    let stream = response
        .bytes_stream()
        .eventsource()
        .map(move |event| {
            let event = event.map_err(|e| {
                error!(error = %e, "event stream interrupted");
                LlmError::StreamError(e.to_string())
            })?;
            handler(event.event.as_str(), event.data.as_str()).map_err(to_stream_error)
        })
        .filter_map(|result| async move {
            match result {
                Ok(Some(text)) if !text.is_empty() => Some(Ok(text)),
                Ok(_) => None,
                Err(err) => Some(Err(err)),
            }
        });

    Box::pin(stream)
}

fn to_stream_error(err: LlmError) -> LlmError {
    error!(error = %err, "bad stream event");
    match err {
        LlmError::StreamError(msg) => LlmError::StreamError(msg),
        other => LlmError::StreamError(other.to_string()),
    }
}
