use crate::code_fetcher::fetch_new_codes;
use crate::config::Config;
use crate::error::{WatcherError, WatcherResult};
use crate::notify::Notifier;
use crate::rate_limiter::RateLimiter;
use crate::reddit::fetch_reddit_codes;
use crate::redeemer::{Redeemer, RedemptionOutcome};
use crate::session::{build_client, verify_login};
use crate::storage::CodeStore;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

/// What a single scan/redeem cycle accomplished.
#[derive(Debug, Default, Clone, Copy)]
pub struct CycleStats {
    pub fresh: usize,
    pub redeemed: usize,
    pub not_available: usize,
}

/// The long-running orchestration loop: discover codes, redeem each fresh
/// one sequentially, persist outcomes, and pace requests through the rate
/// limiter.
pub struct Watcher {
    config: Arc<Config>,
    redeemer: Redeemer,
    store: CodeStore,
    notifier: Notifier,
    limiter: RateLimiter,
    client: reqwest_middleware::ClientWithMiddleware,
}

impl Watcher {
    pub fn new(config: Config) -> WatcherResult<Self> {
        let config = Arc::new(config);
        let client = build_client(&config)?;
        let store = CodeStore::load(&config.codes_file, &config.used_file);
        let notifier = Notifier::new(client.clone(), config.webhook_url.clone());
        let redeemer = Redeemer::new(client.clone(), config.clone());
        let limiter = RateLimiter::new(config.min_delay, config.max_delay);

        Ok(Self {
            config,
            redeemer,
            store,
            notifier,
            limiter,
            client,
        })
    }

    /// Run scan cycles forever (or once), sleeping `scan_interval` between
    /// them. A failed cycle is logged and the loop continues; a single bad
    /// response must never take the process down.
    pub async fn run(&mut self, once: bool) {
        loop {
            match self.run_cycle().await {
                Ok(stats) => tracing::info!(
                    fresh = stats.fresh,
                    redeemed = stats.redeemed,
                    not_available = stats.not_available,
                    "cycle finished"
                ),
                Err(error) => tracing::error!(%error, "cycle failed"),
            }

            if once {
                return;
            }
            tracing::info!(
                next_check_secs = self.config.scan_interval.as_secs(),
                "waiting for next scan"
            );
            sleep(self.config.scan_interval).await;
        }
    }

    pub async fn run_cycle(&mut self) -> WatcherResult<CycleStats> {
        if !verify_login(&self.client, &self.config.rewards_url).await {
            self.notifier
                .send("ShiftWatcher", "Session expired, refresh the cookie file.")
                .await;
            return Err(WatcherError::Config(
                "session is not authenticated, re-run the login helper".to_string(),
            ));
        }

        let discovered = fetch_new_codes(&self.client, &self.config.sources).await;
        let fresh: Vec<String> = discovered
            .into_iter()
            .filter(|code| !self.store.is_known(code))
            .collect();

        if fresh.is_empty() {
            tracing::info!("all current codes already checked");
            return Ok(CycleStats::default());
        }

        self.store.record_known(&fresh);
        self.notifier
            .send(
                "New SHiFT Codes Found",
                &format!("Found {} new code(s)", fresh.len()),
            )
            .await;

        Ok(self.redeem_batch(&fresh).await)
    }

    /// Watch the subreddit feed instead of running full scan cycles:
    /// poll every few minutes with a randomized interval, redeeming
    /// anything new. Hot codes get posted there long before the wikis
    /// pick them up.
    pub async fn run_reddit_monitor(&mut self) {
        tracing::info!(feed = %self.config.reddit_feed_url, "reddit monitoring started");

        loop {
            let discovered =
                fetch_reddit_codes(&self.client, &self.config.reddit_feed_url).await;
            let fresh: Vec<String> = discovered
                .into_iter()
                .filter(|code| !self.store.is_known(code))
                .collect();

            if fresh.is_empty() {
                tracing::debug!("no new codes in the feed");
            } else {
                self.store.record_known(&fresh);
                self.notifier
                    .send(
                        "New SHiFT Codes from Reddit",
                        &format!("Found {} new code(s)", fresh.len()),
                    )
                    .await;

                let stats = self.redeem_batch(&fresh).await;
                tracing::info!(
                    fresh = stats.fresh,
                    redeemed = stats.redeemed,
                    not_available = stats.not_available,
                    "feed batch finished"
                );
            }

            let wait_secs = rand::thread_rng().gen_range(180..=300);
            tracing::debug!(next_poll_secs = wait_secs, "waiting before next feed poll");
            sleep(Duration::from_secs(wait_secs)).await;
        }
    }

    /// Redeem a batch of fresh codes sequentially, pacing every request
    /// after the first through the rate limiter.
    async fn redeem_batch(&mut self, fresh: &[String]) -> CycleStats {
        let mut stats = CycleStats {
            fresh: fresh.len(),
            ..CycleStats::default()
        };

        for (i, code) in fresh.iter().enumerate() {
            if i > 0 {
                self.limiter.wait().await;
            }

            let outcome = self.redeemer.redeem(code).await;
            self.apply_outcome(code, outcome, &mut stats).await;
        }

        stats
    }

    /// Persist the outcome and drive the backoff: reset after a
    /// redemption, back off after everything else (including transport
    /// failures, which are the strongest throttle signal).
    async fn apply_outcome(&mut self, code: &str, outcome: RedemptionOutcome, stats: &mut CycleStats) {
        match outcome {
            RedemptionOutcome::Redeemed => {
                stats.redeemed += 1;
                self.store.record_used(code);
                self.notifier
                    .send("Code Redeemed", &format!("Redeemed {}", code))
                    .await;
                self.limiter.reset();
            }
            RedemptionOutcome::Used | RedemptionOutcome::Expired | RedemptionOutcome::Invalid => {
                stats.not_available += 1;
                self.store.record_used(code);
                self.limiter.increase();
            }
            RedemptionOutcome::Unknown | RedemptionOutcome::Failed => {
                stats.not_available += 1;
                self.limiter.increase();
            }
        }
    }
}
