use concourse_core::{GatewayError, GatewayResult};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

/// Map a reqwest transport failure onto the taxonomy. Timeouts and
/// connection errors are one class: the downstream was unavailable.
pub(crate) fn transport_error(service: &str, err: reqwest::Error) -> GatewayError {
    if err.is_timeout() {
        GatewayError::DownstreamUnavailable(format!("{} timed out: {}", service, err))
    } else {
        GatewayError::DownstreamUnavailable(format!("{} unreachable: {}", service, err))
    }
}

/// Classify a downstream response and decode its body.
///
/// 404 surfaces as `NotFound`, other 4xx as `DownstreamRejected` with the
/// upstream body attached, 5xx as `DownstreamUnavailable` (retriable), and
/// a body that fails to decode as `MalformedResponse`. A failure is never
/// converted into a fabricated success payload.
pub(crate) async fn read_json<T: DeserializeOwned>(
    service: &str,
    response: reqwest::Response,
) -> GatewayResult<T> {
    let status = response.status();

    if status == StatusCode::NOT_FOUND {
        let detail = body_text(response).await;
        return Err(GatewayError::NotFound(format!("{}: {}", service, detail)));
    }
    if status.is_client_error() {
        let detail = body_text(response).await;
        return Err(GatewayError::DownstreamRejected(format!(
            "{} returned {}: {}",
            service, status, detail
        )));
    }
    if !status.is_success() {
        return Err(GatewayError::DownstreamUnavailable(format!(
            "{} returned {}",
            service, status
        )));
    }

    response.json::<T>().await.map_err(|e| {
        GatewayError::MalformedResponse(format!("{} response did not match schema: {}", service, e))
    })
}

pub(crate) async fn body_text(response: reqwest::Response) -> String {
    response.text().await.unwrap_or_default()
}

pub(crate) fn trim_base_url(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}
