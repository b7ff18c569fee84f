use crate::config::Config;
use crate::csrf::fetch_csrf_token;
use crate::error::{WatcherError, WatcherResult};
use crate::form_parser::extract_forms;
use crate::platform::{select_form, FormSubmission};
use reqwest::header::{ACCEPT, REFERER};
use reqwest_middleware::ClientWithMiddleware;
use std::fmt;
use std::sync::Arc;
use url::Url;

/// Lookup endpoints moved under this path in a portal revision; a 404 on
/// the configured endpoint gets one retry against the suffixed variant.
const LOOKUP_SUFFIX: &str = "/entitlement_offer_codes";

/// How a single redemption attempt ended. `Failed` covers transport and
/// protocol errors; the other five are successfully interpreted portal
/// responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedemptionOutcome {
    Redeemed,
    Used,
    Expired,
    Invalid,
    Unknown,
    Failed,
}

impl RedemptionOutcome {
    /// Terminal outcomes mean the code will never redeem for this account
    /// again and can be retired from the work list.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RedemptionOutcome::Redeemed
                | RedemptionOutcome::Used
                | RedemptionOutcome::Expired
                | RedemptionOutcome::Invalid
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RedemptionOutcome::Redeemed => "redeemed",
            RedemptionOutcome::Used => "used",
            RedemptionOutcome::Expired => "expired",
            RedemptionOutcome::Invalid => "invalid",
            RedemptionOutcome::Unknown => "unknown",
            RedemptionOutcome::Failed => "failed",
        }
    }
}

impl fmt::Display for RedemptionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered decision table over the lowercased response text; first match
/// wins. "expired" must come before "used"/"invalid" because expired-code
/// pages tend to carry generic phrasing from those families too.
const CLASSIFICATION: &[(&[&str], RedemptionOutcome)] = &[
    (&["expired"], RedemptionOutcome::Expired),
    (&["used"], RedemptionOutcome::Used),
    (&["invalid"], RedemptionOutcome::Invalid),
    (&["success", "redeemed"], RedemptionOutcome::Redeemed),
];

/// Map the final portal response text to an outcome.
pub fn classify(body: &str) -> RedemptionOutcome {
    let text = body.to_lowercase();
    for (needles, outcome) in CLASSIFICATION {
        if needles.iter().any(|needle| text.contains(needle)) {
            return *outcome;
        }
    }
    RedemptionOutcome::Unknown
}

/// Orchestrates one redemption attempt end to end:
/// token fetch -> code lookup -> optional platform form submission ->
/// response classification. Never returns an error; anything that goes
/// wrong inside collapses to `Failed` so the caller only has to decide
/// whether to back off.
pub struct Redeemer {
    client: ClientWithMiddleware,
    config: Arc<Config>,
}

impl Redeemer {
    pub fn new(client: ClientWithMiddleware, config: Arc<Config>) -> Self {
        Self { client, config }
    }

    pub async fn redeem(&self, code: &str) -> RedemptionOutcome {
        match self.try_redeem(code).await {
            Ok(outcome) => {
                tracing::info!(code, outcome = %outcome, "redemption attempt finished");
                outcome
            }
            Err(error) => {
                tracing::warn!(code, %error, "redemption attempt failed");
                RedemptionOutcome::Failed
            }
        }
    }

    async fn try_redeem(&self, code: &str) -> WatcherResult<RedemptionOutcome> {
        let token = fetch_csrf_token(&self.client, &self.config.rewards_url).await?;
        let (lookup_url, lookup_body) = self.lookup(code, &token).await?;

        let html = embedded_html(&lookup_body);
        let forms = extract_forms(&html);

        let final_body = match select_form(
            &forms,
            code,
            &self.config.platform,
            &self.config.rewards_url,
            &self.config.redemption_url,
        ) {
            Some(submission) => {
                tracing::debug!(
                    action = %submission.action,
                    commit = %submission.commit,
                    "submitting redemption form"
                );
                self.submit(&submission, &token, lookup_url.as_str()).await?
            }
            // No disambiguation form in the response; the lookup body is
            // already the final answer.
            None => html,
        };

        Ok(classify(&final_body))
    }

    /// POST the code to the entitlement lookup endpoint with XHR-style
    /// headers. A 404 on an endpoint that predates the suffixed path gets
    /// exactly one retry against the suffixed variant.
    async fn lookup(&self, code: &str, token: &str) -> WatcherResult<(Url, String)> {
        let url = self.config.lookup_url.clone();
        let response = self.lookup_once(&url, code, token).await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND
            && !url.path().ends_with(LOOKUP_SUFFIX)
        {
            let alternate = suffixed_lookup_url(&url);
            tracing::debug!(url = %alternate, "lookup endpoint 404, retrying suffixed variant");
            let response = self.lookup_once(&alternate, code, token).await?;
            return Self::read_ok(alternate, response).await;
        }

        Self::read_ok(url, response).await
    }

    async fn lookup_once(
        &self,
        url: &Url,
        code: &str,
        token: &str,
    ) -> WatcherResult<reqwest::Response> {
        let response = self
            .client
            .post(url.clone())
            .header(ACCEPT, "application/json, text/javascript, */*; q=0.01")
            .header("X-Requested-With", "XMLHttpRequest")
            .header("X-CSRF-Token", token)
            .form(&[("authenticity_token", token), ("code", code)])
            .send()
            .await?;
        Ok(response)
    }

    async fn read_ok(url: Url, response: reqwest::Response) -> WatcherResult<(Url, String)> {
        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            return Err(WatcherError::bad_status(status, url.as_str()));
        }
        let body = response.text().await?;
        Ok((url, body))
    }

    /// POST the selected platform form, with the lookup page as referer.
    async fn submit(
        &self,
        submission: &FormSubmission,
        token: &str,
        referer: &str,
    ) -> WatcherResult<String> {
        let response = self
            .client
            .post(submission.action.clone())
            .header(REFERER, referer)
            .header("X-CSRF-Token", token)
            .form(&submission.payload)
            .send()
            .await?;

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            return Err(WatcherError::bad_status(status, submission.action.as_str()));
        }
        Ok(response.text().await?)
    }
}

/// Convert a lookup response body into HTML. JSON bodies embed their
/// markup under one of a few well-known keys; anything else is taken to
/// be HTML already.
fn embedded_html(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["html", "body", "content"] {
            if let Some(html) = value.get(key).and_then(|v| v.as_str()) {
                return html.to_string();
            }
        }
    }
    body.to_string()
}

fn suffixed_lookup_url(url: &Url) -> Url {
    let mut alternate = url.clone();
    let path = format!("{}{}", url.path().trim_end_matches('/'), LOOKUP_SUFFIX);
    alternate.set_path(&path);
    alternate
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expired_wins_over_used_and_invalid() {
        let body = "This code has EXPIRED and was already used; invalid request.";
        assert_eq!(classify(body), RedemptionOutcome::Expired);
    }

    #[test]
    fn test_used_without_expired() {
        assert_eq!(
            classify("This SHiFT code has already been used"),
            RedemptionOutcome::Used
        );
    }

    #[test]
    fn test_invalid_without_used_or_expired() {
        assert_eq!(
            classify("This SHiFT code is invalid"),
            RedemptionOutcome::Invalid
        );
    }

    #[test]
    fn test_success_and_redeemed_both_map_to_redeemed() {
        assert_eq!(
            classify("Congratulations! Code redeemed successfully!"),
            RedemptionOutcome::Redeemed
        );
        assert_eq!(
            classify("Your SHiFT code was a success."),
            RedemptionOutcome::Redeemed
        );
    }

    #[test]
    fn test_unrecognized_text_is_unknown() {
        assert_eq!(
            classify("Please wait while we process your request"),
            RedemptionOutcome::Unknown
        );
        assert_eq!(classify(""), RedemptionOutcome::Unknown);
    }

    #[test]
    fn test_classification_is_case_insensitive() {
        assert_eq!(classify("CODE ALREADY USED"), RedemptionOutcome::Used);
    }

    #[test]
    fn test_embedded_html_prefers_known_json_keys() {
        let body = r#"{"status":"ok","html":"<form></form>"}"#;
        assert_eq!(embedded_html(body), "<form></form>");

        let body = r#"{"content":"<div>used</div>"}"#;
        assert_eq!(embedded_html(body), "<div>used</div>");
    }

    #[test]
    fn test_embedded_html_passes_plain_html_through() {
        let body = "<html><body>expired</body></html>";
        assert_eq!(embedded_html(body), body);
    }

    #[test]
    fn test_embedded_html_passes_unrelated_json_through() {
        let body = r#"{"status":"ok"}"#;
        assert_eq!(embedded_html(body), body);
    }

    #[test]
    fn test_suffixed_lookup_url() {
        let url = Url::parse("https://shift.example.com/lookup").unwrap();
        assert_eq!(
            suffixed_lookup_url(&url).as_str(),
            "https://shift.example.com/lookup/entitlement_offer_codes"
        );

        let url = Url::parse("https://shift.example.com/lookup/").unwrap();
        assert_eq!(
            suffixed_lookup_url(&url).as_str(),
            "https://shift.example.com/lookup/entitlement_offer_codes"
        );
    }

    #[test]
    fn test_terminal_outcomes() {
        assert!(RedemptionOutcome::Redeemed.is_terminal());
        assert!(RedemptionOutcome::Used.is_terminal());
        assert!(RedemptionOutcome::Expired.is_terminal());
        assert!(RedemptionOutcome::Invalid.is_terminal());
        assert!(!RedemptionOutcome::Unknown.is_terminal());
        assert!(!RedemptionOutcome::Failed.is_terminal());
    }
}
