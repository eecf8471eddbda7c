use futures_util::TryStreamExt;
use futures_util::stream::{self, BoxStream};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio_util::io::StreamReader;

use crate::{ColloquyError, Result};

/// Bounds for SSE parsing; events past these are treated as a broken stream.
#[derive(Clone, Copy, Debug)]
pub struct SseLimits {
    pub max_line_bytes: usize,
    pub max_event_bytes: usize,
}

impl Default for SseLimits {
    fn default() -> Self {
        Self {
            max_line_bytes: 256 * 1024,
            max_event_bytes: 4 * 1024 * 1024,
        }
    }
}

async fn next_event<R>(
    reader: &mut R,
    line: &mut String,
    event: &mut String,
    limits: SseLimits,
) -> Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    event.clear();

    loop {
        line.clear();
        let mut limited = (&mut *reader).take(limits.max_line_bytes as u64 + 1);
        let read = limited.read_line(line).await?;
        if read == 0 {
            // End of stream; flush whatever a missing trailing blank line
            // left behind.
            if event.is_empty() || event == "[DONE]" {
                return Ok(None);
            }
            return Ok(Some(std::mem::take(event)));
        }
        if read > limits.max_line_bytes {
            return Err(ColloquyError::InvalidResponse(format!(
                "sse line exceeds {} bytes",
                limits.max_line_bytes
            )));
        }

        let trimmed = line.trim_end_matches(['\r', '\n']);
        if trimmed.is_empty() {
            if event.is_empty() {
                continue;
            }
            if event == "[DONE]" {
                return Ok(None);
            }
            return Ok(Some(std::mem::take(event)));
        }

        if let Some(data) = trimmed.strip_prefix("data:") {
            let data = data.trim_start();
            if event.len() + data.len() + 1 > limits.max_event_bytes {
                return Err(ColloquyError::InvalidResponse(format!(
                    "sse event exceeds {} bytes",
                    limits.max_event_bytes
                )));
            }
            if !event.is_empty() {
                event.push('\n');
            }
            event.push_str(data);
        }
    }
}

/// Stream of `data:` payloads from an SSE reader, one item per event,
/// terminated by `[DONE]` or end of stream.
pub fn sse_data_stream_from_reader<R>(
    reader: R,
    limits: SseLimits,
) -> BoxStream<'static, Result<String>>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    Box::pin(stream::try_unfold(
        (reader, String::new(), String::new(), limits),
        |(mut reader, mut line, mut event, limits)| async move {
            match next_event(&mut reader, &mut line, &mut event, limits).await? {
                Some(data) => Ok(Some((data, (reader, line, event, limits)))),
                None => Ok(None),
            }
        },
    ))
}

pub fn sse_data_stream(response: reqwest::Response) -> BoxStream<'static, Result<String>> {
    let bytes = response.bytes_stream().map_err(std::io::Error::other);
    let reader = BufReader::new(StreamReader::new(bytes));
    sse_data_stream_from_reader(reader, SseLimits::default())
}
