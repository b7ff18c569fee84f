use crate::error::WatcherError;
use reqwest_middleware::ClientWithMiddleware;
use serde_json::json;

/// Fire-and-forget webhook notifications. Delivery failure is logged and
/// swallowed; the watcher must never stall because a notification did not
/// go out.
#[derive(Debug, Clone)]
pub struct Notifier {
    client: ClientWithMiddleware,
    webhook_url: Option<String>,
}

impl Notifier {
    pub fn new(client: ClientWithMiddleware, webhook_url: Option<String>) -> Self {
        if webhook_url.is_none() {
            tracing::debug!("no webhook configured, notifications disabled");
        }
        Self {
            client,
            webhook_url,
        }
    }

    pub async fn send(&self, title: &str, body: &str) {
        let Some(url) = &self.webhook_url else {
            tracing::debug!(title, "notification skipped (no webhook)");
            return;
        };

        let result = async {
            let response = self
                .client
                .post(url)
                .json(&json!({ "title": title, "body": body }))
                .send()
                .await?;
            Ok::<_, WatcherError>(response.error_for_status()?)
        }
        .await;

        match result {
            Ok(_) => tracing::debug!(title, "notification delivered"),
            Err(error) => tracing::warn!(title, %error, "notification delivery failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::with_retry;

    #[tokio::test]
    async fn test_disabled_notifier_is_a_noop() {
        let notifier = Notifier::new(with_retry(reqwest::Client::new(), 0), None);
        // Must not attempt any network call; finishing is the assertion.
        notifier.send("title", "body").await;
    }
}
