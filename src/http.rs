//! HTTP client utilities.
//!
//! Client construction, header handling and error-body mapping shared by
//! every endpoint.

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

use crate::client::ClientError;
use crate::options::ClientOptions;

/// Content type announced by streaming endpoints.
pub const EVENT_STREAM: &str = "text/event-stream";

/// Build a configured HTTP client from client options.
pub fn build_http_client(options: &ClientOptions) -> Result<Client, ClientError> {
    let mut builder = Client::builder();

    if let Some(timeout) = options.timeout {
        builder = builder.timeout(timeout);
    }

    if let Some(proxy_url) = &options.proxy {
        let proxy = reqwest::Proxy::all(proxy_url)
            .map_err(|e| ClientError::Config(format!("invalid proxy {proxy_url}: {e}")))?;
        builder = builder.proxy(proxy);
    }

    Ok(builder.build()?)
}

/// Add extra headers to a request if specified in the options.
pub fn add_extra_headers(
    mut request: RequestBuilder,
    extra_headers: &Option<HashMap<String, String>>,
) -> RequestBuilder {
    if let Some(headers) = extra_headers {
        for (key, value) in headers {
            request = request.header(key, value);
        }
    }
    request
}

/// Pass successful responses through, turn the others into `ClientError::Api`.
pub async fn check_status(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let url = response.url().clone();
    let body = response.text().await.unwrap_or_default();
    log::warn!("request to {url} failed with {status}");
    Err(handle_error_response(status, &body))
}

#[derive(Deserialize)]
struct ErrorBody {
    detail: Value,
}

/// Map an error response to `ClientError::Api`.
///
/// The API reports failures as `{"detail": ...}`; anything else is passed
/// through verbatim.
pub fn handle_error_response(status: StatusCode, body: &str) -> ClientError {
    let message = match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            detail: Value::String(detail),
        }) => detail,
        Ok(ErrorBody { detail }) => detail.to_string(),
        Err(_) if body.is_empty() => status.to_string(),
        Err(_) => body.to_string(),
    };
    ClientError::Api {
        status: status.as_u16(),
        message,
    }
}
