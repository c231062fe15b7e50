//! Error type shared by the feed adapters.

/// Failure talking to Umbrella or the event collector.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{url} answered {status}: {body}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("token response did not include an access_token")]
    MissingToken,
    #[error("could not encode event payload: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Decode a successful JSON response, or turn any other status into
/// [`FeedError::Status`] carrying the response body.
pub(crate) async fn read_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, FeedError> {
    let response = check_status(response).await?;
    Ok(response.json().await?)
}

pub(crate) async fn check_status(
    response: reqwest::Response,
) -> Result<reqwest::Response, FeedError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let url = response.url().to_string();
    let body = response.text().await.unwrap_or_default();
    Err(FeedError::Status { url, status, body })
}
