use crate::error::WatcherResult;
use regex::Regex;
use reqwest_middleware::ClientWithMiddleware;
use std::collections::BTreeSet;

/// SHiFT codes are five groups of five uppercase alphanumerics separated
/// by hyphens, e.g. `ABCDE-FGHIJ-KLMNO-PQRST-UVWXY`.
const CODE_PATTERN: &str = r"[A-Z0-9]{5}-[A-Z0-9]{5}-[A-Z0-9]{5}-[A-Z0-9]{5}-[A-Z0-9]{5}";

/// Extract every code-shaped string from a blob of text.
pub fn extract_codes(text: &str) -> BTreeSet<String> {
    let pattern = Regex::new(CODE_PATTERN).expect("static regex");
    pattern
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Scan the configured source pages for codes. Per-source failures are
/// logged and skipped; discovery is best-effort by nature.
pub async fn fetch_new_codes(client: &ClientWithMiddleware, sources: &[String]) -> Vec<String> {
    let mut codes = BTreeSet::new();

    for source in sources {
        match fetch_source(client, source).await {
            Ok(found) => {
                if !found.is_empty() {
                    tracing::info!(source, count = found.len(), "codes found");
                }
                codes.extend(found);
            }
            Err(error) => tracing::warn!(source, %error, "failed fetching source"),
        }
    }

    codes.into_iter().collect()
}

async fn fetch_source(
    client: &ClientWithMiddleware,
    source: &str,
) -> WatcherResult<BTreeSet<String>> {
    let body = client
        .get(source)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;
    Ok(extract_codes(&body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_codes_from_surrounding_text() {
        let text = "New drop: ABCDE-FGHIJ-KLMNO-PQRST-UVWXY (expires Friday), \
                    also Z9Z9Z-Y8Y8Y-X7X7X-W6W6W-V5V5V!";
        let codes = extract_codes(text);
        assert_eq!(codes.len(), 2);
        assert!(codes.contains("ABCDE-FGHIJ-KLMNO-PQRST-UVWXY"));
        assert!(codes.contains("Z9Z9Z-Y8Y8Y-X7X7X-W6W6W-V5V5V"));
    }

    #[test]
    fn test_near_misses_are_ignored() {
        // lowercase, short group, missing group
        let text = "abcde-fghij-klmno-pqrst-uvwxy \
                    ABCD-FGHIJ-KLMNO-PQRST-UVWXY \
                    ABCDE-FGHIJ-KLMNO-PQRST";
        assert!(extract_codes(text).is_empty());
    }

    #[test]
    fn test_duplicates_collapse() {
        let code = "ABCDE-FGHIJ-KLMNO-PQRST-UVWXY";
        let text = format!("{} and again {}", code, code);
        assert_eq!(extract_codes(&text).len(), 1);
    }
}
