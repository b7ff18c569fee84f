use crate::error::{WatcherError, WatcherResult};
use regex::Regex;
use reqwest_middleware::ClientWithMiddleware;
use url::Url;

/// Fetch the anti-forgery token the portal requires on every
/// state-changing request. The token lives in a `<meta name="csrf-token"
/// content="...">` tag on the rewards landing page and is only valid for
/// the session that fetched it. An error status and a token-less page are
/// the same condition here: no usable token.
pub async fn fetch_csrf_token(
    client: &ClientWithMiddleware,
    rewards_url: &Url,
) -> WatcherResult<String> {
    let response = client.get(rewards_url.clone()).send().await?;
    let status = response.status();
    if !status.is_success() {
        tracing::debug!(%status, url = %rewards_url, "rewards page returned an error status");
        return Err(WatcherError::MissingToken);
    }

    let body = response.text().await?;
    extract_token(&body).ok_or(WatcherError::MissingToken)
}

/// Pull the token out of page markup. Attribute order varies between
/// portal revisions, so both orders are accepted, case-insensitively.
pub fn extract_token(html: &str) -> Option<String> {
    let name_first = Regex::new(
        r#"(?i)<meta[^>]*name=["']csrf-token["'][^>]*content=["']([^"']+)["']"#,
    )
    .expect("static regex");
    let content_first = Regex::new(
        r#"(?i)<meta[^>]*content=["']([^"']+)["'][^>]*name=["']csrf-token["']"#,
    )
    .expect("static regex");

    name_first
        .captures(html)
        .or_else(|| content_first.captures(html))
        .map(|caps| caps[1].to_string())
}
