use crate::config::Config;
use crate::error::{WatcherError, WatcherResult};
use reqwest::cookie::Jar;
use reqwest::Client;
use reqwest_middleware::ClientWithMiddleware;
use reqwest_retry::policies::ExponentialBackoff;
use reqwest_retry::RetryTransientMiddleware;
use serde::{Deserialize, Serialize};
use std::fs;
use std::sync::Arc;
use url::Url;

const DEFAULT_COOKIE_DOMAIN: &str = "shift.gearboxsoftware.com";

/// Transient failures (429 and 5xx) get this many transport-level
/// retries before the error surfaces to the redemption engine.
const MAX_TRANSPORT_RETRIES: u32 = 5;

/// One cookie as exported by the interactive login helper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CookieRecord {
    pub name: String,
    pub value: String,
    #[serde(default = "default_domain")]
    pub domain: String,
}

fn default_domain() -> String {
    DEFAULT_COOKIE_DOMAIN.to_string()
}

/// Build the authenticated HTTP client every portal request goes through:
/// cookie jar preloaded from the exported cookie file, the configured
/// User-Agent as a default header, the configured request timeout, and
/// transient-error retry mounted at the transport layer. Retrying 429/5xx
/// lives here, not in the redemption state machine.
pub fn build_client(config: &Config) -> WatcherResult<ClientWithMiddleware> {
    let records = load_cookies(&config.cookies_file)?;
    let jar = Jar::default();

    for record in &records {
        let domain = record.domain.trim_start_matches('.');
        let origin: Url = format!("https://{}/", domain)
            .parse()
            .map_err(|_| WatcherError::Config(format!("bad cookie domain: {}", record.domain)))?;
        jar.add_cookie_str(
            &format!("{}={}; Domain={}", record.name, record.value, domain),
            &origin,
        );
    }

    tracing::info!(cookies = records.len(), file = %config.cookies_file, "session cookies loaded");

    let client = Client::builder()
        .cookie_provider(Arc::new(jar))
        .user_agent(config.user_agent.as_str())
        .timeout(config.request_timeout)
        .build()?;
    Ok(with_retry(client, MAX_TRANSPORT_RETRIES))
}

/// Mount retry-on-transient-failure middleware (429 and 5xx statuses,
/// connection errors) with exponential backoff. Zero retries yields a
/// plain pass-through client.
pub fn with_retry(client: Client, max_retries: u32) -> ClientWithMiddleware {
    let policy = ExponentialBackoff::builder().build_with_max_retries(max_retries);
    reqwest_middleware::ClientBuilder::new(client)
        .with(RetryTransientMiddleware::new_with_policy(policy))
        .build()
}

fn load_cookies(path: &str) -> WatcherResult<Vec<CookieRecord>> {
    if !std::path::Path::new(path).exists() {
        return Err(WatcherError::Config(format!(
            "cookie file {} not found, run the login helper first",
            path
        )));
    }
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

/// Check whether the session cookies still authenticate. Logged-out
/// rewards pages carry a "Sign In" link; any request failure also counts
/// as not logged in, since the caller reacts the same way.
pub async fn verify_login(client: &ClientWithMiddleware, rewards_url: &Url) -> bool {
    let result = async {
        let response = client.get(rewards_url.clone()).send().await?;
        let response = response.error_for_status()?;
        Ok::<_, WatcherError>(response.text().await?)
    }
    .await;

    match result {
        Ok(body) => !body.contains("Sign In"),
        Err(error) => {
            tracing::warn!(%error, "login verification failed");
            false
        }
    }
}
