//! Bounded response body capture.

use reqwest::Response;
use tokio::time::Instant;

/// Read at most `cap` bytes of a response body.
///
/// Anything past the cap is silently discarded, as is a body that fails or
/// times out midway: the bytes collected so far are returned. The upstream
/// `Content-Length` is never trusted.
pub async fn read_capped(mut response: Response, cap: usize, deadline: Option<Instant>) -> Vec<u8> {
    let mut buf = Vec::new();

    while buf.len() < cap {
        let next = match deadline {
            Some(deadline) => match tokio::time::timeout_at(deadline, response.chunk()).await {
                Ok(next) => next,
                Err(_) => {
                    tracing::debug!(read = buf.len(), "Body read hit deadline");
                    break;
                }
            },
            None => response.chunk().await,
        };

        match next {
            Ok(Some(chunk)) => {
                let take = chunk.len().min(cap - buf.len());
                buf.extend_from_slice(&chunk[..take]);
            }
            Ok(None) => break,
            Err(e) => {
                tracing::debug!(read = buf.len(), error = %e, "Body read failed");
                break;
            }
        }
    }

    buf
}
