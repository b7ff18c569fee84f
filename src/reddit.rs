use crate::code_fetcher::extract_codes;
use crate::error::WatcherResult;
use regex::Regex;
use reqwest_middleware::ClientWithMiddleware;
use std::collections::BTreeSet;

/// The feed URL already caps itself via its limit parameter; a noisy or
/// misbehaving feed still only gets this many entries scanned per poll.
const MAX_ENTRIES: usize = 20;

/// Poll the subreddit feed for codes. Failures are logged and yield an
/// empty batch; the monitor just tries again next poll.
pub async fn fetch_reddit_codes(client: &ClientWithMiddleware, feed_url: &str) -> Vec<String> {
    match fetch_feed(client, feed_url).await {
        Ok(codes) => {
            tracing::info!(count = codes.len(), "unique codes found in feed");
            codes.into_iter().collect()
        }
        Err(error) => {
            tracing::warn!(feed_url, %error, "failed fetching reddit feed");
            Vec::new()
        }
    }
}

async fn fetch_feed(
    client: &ClientWithMiddleware,
    feed_url: &str,
) -> WatcherResult<BTreeSet<String>> {
    let body = client
        .get(feed_url)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;
    Ok(extract_feed_codes(&body))
}

/// Codes found across the feed's entries.
///
/// Reddit serves Atom (`<entry>`); older RSS feeds use `<item>`. Post
/// bodies arrive as entity-escaped HTML inside the XML, but the code
/// alphabet (uppercase alphanumerics and hyphens) is untouched by entity
/// escaping, so extraction runs on the raw entry text. A body with no
/// recognizable entries is scanned whole as a fallback.
pub fn extract_feed_codes(feed: &str) -> BTreeSet<String> {
    let entries = feed_entries(feed);
    if entries.is_empty() {
        tracing::debug!("no feed entries recognized, scanning body as-is");
        return extract_codes(feed);
    }

    let mut codes = BTreeSet::new();
    for entry in entries {
        let found = extract_codes(entry);
        if !found.is_empty() {
            tracing::info!(count = found.len(), "codes found in feed entry");
        }
        codes.extend(found);
    }
    codes
}

fn feed_entries(feed: &str) -> Vec<&str> {
    let entry_pattern =
        Regex::new(r"(?is)<entry[\s>].*?</entry>|<item[\s>].*?</item>").expect("static regex");
    entry_pattern
        .find_iter(feed)
        .take(MAX_ENTRIES)
        .map(|m| m.as_str())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn atom_feed(entries: &[&str]) -> String {
        let mut feed = String::from(
            r#"<?xml version="1.0" encoding="UTF-8"?><feed xmlns="http://www.w3.org/2005/Atom">"#,
        );
        for entry in entries {
            feed.push_str(&format!(
                "<entry><title>SHiFT drop</title><content type=\"html\">{}</content></entry>",
                entry
            ));
        }
        feed.push_str("</feed>");
        feed
    }

    #[test]
    fn test_codes_extracted_from_atom_entries() {
        let feed = atom_feed(&[
            "&lt;p&gt;New code: ABCDE-FGHIJ-KLMNO-PQRST-UVWXY&lt;/p&gt;",
            "&lt;p&gt;nothing here&lt;/p&gt;",
            "Z9Z9Z-Y8Y8Y-X7X7X-W6W6W-V5V5V expires tonight",
        ]);

        let codes = extract_feed_codes(&feed);
        assert_eq!(codes.len(), 2);
        assert!(codes.contains("ABCDE-FGHIJ-KLMNO-PQRST-UVWXY"));
        assert!(codes.contains("Z9Z9Z-Y8Y8Y-X7X7X-W6W6W-V5V5V"));
    }

    #[test]
    fn test_codes_extracted_from_rss_items() {
        let feed = r#"<rss><channel>
            <item><title>codes</title><description>AAAAA-BBBBB-CCCCC-DDDDD-EEEEE</description></item>
        </channel></rss>"#;

        let codes = extract_feed_codes(feed);
        assert!(codes.contains("AAAAA-BBBBB-CCCCC-DDDDD-EEEEE"));
    }

    #[test]
    fn test_non_feed_body_scanned_whole() {
        let body = "plain page mentioning ABCDE-FGHIJ-KLMNO-PQRST-UVWXY";
        assert_eq!(extract_feed_codes(body).len(), 1);
    }

    #[test]
    fn test_entry_scan_is_capped() {
        let entries: Vec<String> = (0..25)
            .map(|i| format!("code A{:04}-FGHIJ-KLMNO-PQRST-UVWXY", i))
            .collect();
        let refs: Vec<&str> = entries.iter().map(String::as_str).collect();
        let feed = atom_feed(&refs);

        let codes = extract_feed_codes(&feed);
        assert_eq!(codes.len(), MAX_ENTRIES);
        assert!(codes.contains("A0000-FGHIJ-KLMNO-PQRST-UVWXY"));
        assert!(!codes.contains("A0024-FGHIJ-KLMNO-PQRST-UVWXY"));
    }
}
