use crate::error::{WatcherError, WatcherResult};
use std::env;
use std::time::Duration;
use url::Url;

const DEFAULT_REWARDS_URL: &str = "https://shift.gearboxsoftware.com/rewards";
const DEFAULT_LOOKUP_URL: &str = "https://shift.gearboxsoftware.com/entitlement_offer_codes";
const DEFAULT_REDEMPTION_URL: &str = "https://shift.gearboxsoftware.com/code_redemptions";
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64)";

const DEFAULT_SOURCES: &[&str] = &[
    "https://www.ign.com/wikis/borderlands-4/Borderlands_4_SHiFT_Codes",
    "https://game8.co/games/Borderlands-4/archives/548406",
];

const DEFAULT_REDDIT_FEED: &str = "https://www.reddit.com/r/Borderlands/new/.rss?limit=5";

#[derive(Debug, Clone)]
pub struct Config {
    /// Rewards landing page; serves the csrf-token meta tag.
    pub rewards_url: Url,
    /// Entitlement lookup endpoint the code is posted to first.
    pub lookup_url: Url,
    /// Fallback redemption endpoint for forms without an action attribute.
    pub redemption_url: Url,
    /// Preferred platform for codes valid on more than one ("xbox", "ps5", ...).
    /// Empty string means no preference.
    pub platform: String,
    /// Cookie jar exported by the interactive login helper.
    pub cookies_file: String,
    /// Every code ever seen.
    pub codes_file: String,
    /// Codes with a terminal outcome (used/expired/invalid/redeemed).
    pub used_file: String,
    /// Pages scanned for new codes.
    pub sources: Vec<String>,
    /// Subreddit feed polled in Reddit monitoring mode.
    pub reddit_feed_url: String,
    /// Optional webhook receiving {title, body} notifications.
    pub webhook_url: Option<String>,
    pub scan_interval: Duration,
    pub request_timeout: Duration,
    pub min_delay: f64,
    pub max_delay: f64,
    pub user_agent: String,
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables, falling back to
    /// defaults for everything. Call `dotenv::dotenv()` before this.
    pub fn from_env() -> WatcherResult<Self> {
        let rewards_url = parse_url("SHIFT_REWARDS_URL", DEFAULT_REWARDS_URL)?;
        let lookup_url = parse_url("SHIFT_LOOKUP_URL", DEFAULT_LOOKUP_URL)?;
        let redemption_url = parse_url("SHIFT_REDEMPTION_URL", DEFAULT_REDEMPTION_URL)?;

        let sources = match env::var("SHIFT_SOURCES") {
            Ok(raw) => raw
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            Err(_) => DEFAULT_SOURCES.iter().map(|s| s.to_string()).collect(),
        };

        let config = Self {
            rewards_url,
            lookup_url,
            redemption_url,
            platform: var_or("SHIFT_PLATFORM", ""),
            cookies_file: var_or("SHIFT_COOKIES_FILE", "cookies.json"),
            codes_file: var_or("SHIFT_CODES_FILE", "codes_log.json"),
            used_file: var_or("SHIFT_USED_FILE", "codes_used.json"),
            sources,
            reddit_feed_url: var_or("SHIFT_REDDIT_FEED", DEFAULT_REDDIT_FEED),
            webhook_url: env::var("SHIFT_WEBHOOK_URL").ok().filter(|s| !s.is_empty()),
            scan_interval: Duration::from_secs(parse_num("SCAN_INTERVAL", 3600)?),
            request_timeout: Duration::from_secs(parse_num("REQUEST_TIMEOUT", 15)?),
            min_delay: parse_float("MIN_DELAY", 2.0)?,
            max_delay: parse_float("MAX_DELAY", 30.0)?,
            user_agent: var_or("USER_AGENT", DEFAULT_USER_AGENT),
            log_level: var_or("LOG_LEVEL", "info"),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> WatcherResult<()> {
        if self.min_delay <= 0.0 {
            return Err(WatcherError::Config(
                "MIN_DELAY must be greater than 0".to_string(),
            ));
        }
        if self.max_delay < self.min_delay {
            return Err(WatcherError::Config(
                "MAX_DELAY must be at least MIN_DELAY".to_string(),
            ));
        }
        if self.request_timeout.is_zero() {
            return Err(WatcherError::Config(
                "REQUEST_TIMEOUT must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_url(key: &str, default: &str) -> WatcherResult<Url> {
    let raw = var_or(key, default);
    Url::parse(&raw).map_err(|e| WatcherError::Config(format!("{} is not a valid url: {}", key, e)))
}

fn parse_num(key: &str, default: u64) -> WatcherResult<u64> {
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| WatcherError::Config(format!("{} must be an integer", key))),
        Err(_) => Ok(default),
    }
}

fn parse_float(key: &str, default: f64) -> WatcherResult<f64> {
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| WatcherError::Config(format!("{} must be a number", key))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::from_env().unwrap();
        assert_eq!(config.rewards_url.as_str(), DEFAULT_REWARDS_URL);
        assert_eq!(config.scan_interval, Duration::from_secs(3600));
        assert_eq!(config.min_delay, 2.0);
        assert_eq!(config.max_delay, 30.0);
        assert_eq!(config.reddit_feed_url, DEFAULT_REDDIT_FEED);
        assert!(config.webhook_url.is_none());
    }

    #[test]
    fn test_delay_bounds_validated() {
        let config = Config {
            min_delay: 10.0,
            max_delay: 5.0,
            ..Config::from_env().unwrap()
        };
        assert!(config.validate().is_err());
    }
}
