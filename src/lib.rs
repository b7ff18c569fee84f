pub mod code_fetcher;
pub mod config;
pub mod csrf;
pub mod error;
pub mod form_parser;
pub mod notify;
pub mod platform;
pub mod rate_limiter;
pub mod reddit;
pub mod redeemer;
pub mod session;
pub mod storage;
pub mod watcher;

pub use config::Config;
pub use error::{WatcherError, WatcherResult};
pub use rate_limiter::RateLimiter;
pub use redeemer::{Redeemer, RedemptionOutcome};
pub use watcher::Watcher;
