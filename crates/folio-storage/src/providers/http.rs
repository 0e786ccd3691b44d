//! Shared plumbing for the REST-backed clients.

use std::time::Duration;

use futures::stream::StreamExt;
use reqwest::{Response, StatusCode, Url};

use folio_core::error::{AppError, ErrorKind};
use folio_core::result::AppResult;
use folio_core::traits::storage::ByteStream;

/// Build an HTTP client with the configured round-trip timeout.
pub(crate) fn build_client(timeout: Duration) -> AppResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| AppError::with_source(ErrorKind::Configuration, "Failed to build HTTP client", e))
}

/// Parse a base URL, making sure it ends with `/` so joins keep its path.
pub(crate) fn parse_base(raw: &str) -> AppResult<Url> {
    let with_slash = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{raw}/")
    };
    Url::parse(&with_slash).map_err(|e| {
        AppError::with_source(ErrorKind::Configuration, format!("Invalid base URL: {raw}"), e)
    })
}

/// Append path segments to a base URL, percent-encoding each one.
pub(crate) fn url_with_segments<'a>(
    base: &Url,
    segments: impl IntoIterator<Item = &'a str>,
) -> AppResult<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| AppError::configuration(format!("Base URL cannot carry a path: {base}")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Transport failures never reached the backend's logic.
pub(crate) fn transport_error(e: reqwest::Error, context: &str) -> AppError {
    AppError::with_source(
        ErrorKind::BackendUnavailable,
        format!("{context}: {e}"),
        e,
    )
}

/// Map an HTTP status to the shared error taxonomy.
pub(crate) fn status_kind(status: StatusCode) -> ErrorKind {
    match status {
        StatusCode::NOT_FOUND => ErrorKind::NotFound,
        StatusCode::CONFLICT => ErrorKind::AlreadyExists,
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => ErrorKind::Validation,
        _ => ErrorKind::BackendUnavailable,
    }
}

/// Pass successful responses through and translate the rest.
pub(crate) async fn check(resp: Response, context: &str) -> AppResult<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(status_error(status, &body, context))
}

/// Build the error for a failed response.
pub(crate) fn status_error(status: StatusCode, body: &str, context: &str) -> AppError {
    AppError::new(
        status_kind(status),
        format!("{context} failed ({status}): {}", truncate(body)),
    )
}

/// Decode a JSON body.
pub(crate) async fn json<T: serde::de::DeserializeOwned>(resp: Response, context: &str) -> AppResult<T> {
    let bytes = resp.bytes().await.map_err(|e| transport_error(e, context))?;
    serde_json::from_slice(&bytes).map_err(|e| {
        AppError::with_source(
            ErrorKind::BackendUnavailable,
            format!("{context}: unexpected response body"),
            e,
        )
    })
}

/// Expose a response body as a byte stream.
pub(crate) fn body_stream(resp: Response) -> ByteStream {
    Box::pin(
        resp.bytes_stream()
            .map(|chunk| chunk.map_err(std::io::Error::other)),
    )
}

fn truncate(body: &str) -> &str {
    match body.char_indices().nth(300) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}
