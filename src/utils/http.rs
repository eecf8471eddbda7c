use futures_util::StreamExt;
use serde::de::DeserializeOwned;

use crate::{ColloquyError, Result};

const MAX_ERROR_BODY_BYTES: usize = 64 * 1024;

/// Error bodies are capped so a misbehaving endpoint cannot balloon the
/// error value.
async fn error_body_truncated(response: reqwest::Response) -> String {
    let mut out = Vec::<u8>::new();
    let mut truncated = false;

    let mut stream = response.bytes_stream();
    while let Some(next) = stream.next().await {
        let Ok(chunk) = next else {
            break;
        };
        let remaining = MAX_ERROR_BODY_BYTES.saturating_sub(out.len());
        if remaining == 0 {
            truncated = true;
            break;
        }
        let take = chunk.len().min(remaining);
        out.extend_from_slice(&chunk[..take]);
        if take < chunk.len() {
            truncated = true;
            break;
        }
    }

    let mut body = String::from_utf8_lossy(&out).to_string();
    if truncated {
        body.push_str("\n...(truncated)");
    }
    body
}

pub(crate) async fn send_checked(req: reqwest::RequestBuilder) -> Result<reqwest::Response> {
    let response = req.send().await?;
    let status = response.status();
    if !status.is_success() {
        let body = error_body_truncated(response).await;
        return Err(ColloquyError::Api { status, body });
    }
    Ok(response)
}

pub(crate) async fn send_checked_json<T: DeserializeOwned>(
    req: reqwest::RequestBuilder,
) -> Result<T> {
    let response = send_checked(req).await?;
    Ok(response.json::<T>().await?)
}
