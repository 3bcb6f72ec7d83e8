use core::{convert::Infallible, panic::AssertUnwindSafe, time::Duration};
use std::time::Instant;

use chrono::{DateTime, FixedOffset, TimeDelta};
use futures_util::FutureExt;
use reqwest::Client;

use crate::{
    auth::{Authenticator, Session},
    feed::{self, FeedEntry},
    issue::{IssueSnapshot, Selectors},
    message::{Translated, compose},
    notify::Notifier,
    novelty::{SentCache, caused_modification, dedup_key},
    translate::Translator,
    util::{KST, TIME_FMT, parse_local},
};

/// How a poll cycle ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    FeedUnavailable,
    EmptyFeed,
    /// Newest entry is not newer than the high-water mark.
    Stale,
    IssueUnavailable,
    NoComment,
    Duplicate,
    BadTimestamp,
    /// The newest comment did not cause the last modification.
    Unrelated,
    Delivered { issue_id: String, sent: bool },
}

/// Tunables of the change heuristic.
#[derive(Clone, Debug)]
pub struct Rules {
    pub time_format: String,
    pub timezone: FixedOffset,
    pub tolerance: TimeDelta,
    pub cache_capacity: usize,
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            time_format: TIME_FMT.to_owned(),
            timezone: KST,
            tolerance: TimeDelta::seconds(120),
            cache_capacity: 4096,
        }
    }
}

/// Time left until the next cycle should start; zero once a cycle overran.
pub const fn pause(interval: Duration, elapsed: Duration) -> Duration {
    interval.saturating_sub(elapsed)
}

/// Everything one monitor process remembers between polls.
pub struct Poller<A, T, N> {
    gateway: Client,
    feed_url: String,
    session: Session<A>,
    translator: T,
    notifier: N,
    selectors: Selectors,
    rules: Rules,
    high_water: Option<DateTime<FixedOffset>>,
    sent: SentCache,
}

impl<A, T, N> Poller<A, T, N>
where
    A: Authenticator,
    T: Translator,
    N: Notifier,
{
    pub fn new(
        gateway: Client,
        feed_url: String,
        authenticator: A,
        translator: T,
        notifier: N,
        rules: Rules,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            gateway,
            feed_url,
            session: Session::new(authenticator),
            translator,
            notifier,
            selectors: Selectors::new()?,
            sent: SentCache::new(rules.cache_capacity),
            rules,
            high_water: None,
        })
    }

    pub const fn high_water(&self) -> Option<DateTime<FixedOffset>> {
        self.high_water
    }

    pub const fn sent(&self) -> &SentCache {
        &self.sent
    }

    async fn latest(&self) -> Result<Option<FeedEntry>, Outcome> {
        let xml = match feed::fetch(&self.gateway, &self.feed_url).await {
            Ok(xml) => xml,
            Err(e) => {
                tracing::error!(target: "feed", "\x1b[31mRSS request failed\x1b[0m: {e}");
                return Err(Outcome::FeedUnavailable);
            }
        };
        feed::latest_entry(&xml).map_err(|e| {
            tracing::error!(target: "feed", "\x1b[31mRSS parse failed\x1b[0m: {e}");
            Outcome::FeedUnavailable
        })
    }

    /// One poll cycle. Operational failures are logged and folded into the
    /// returned [`Outcome`].
    pub async fn poll(&mut self) -> Outcome {
        let entry = match self.latest().await {
            Ok(Some(entry)) => entry,
            Ok(None) => return Outcome::EmptyFeed,
            Err(outcome) => return outcome,
        };

        if self.high_water.is_some_and(|mark| entry.published <= mark) {
            return Outcome::Stale;
        }
        self.high_water = Some(entry.published);

        let issue_id = entry.issue_id().to_owned();
        let url = entry.link;
        tracing::info!(target: "poller", "new feed entry \x1b[36m{url}\x1b[0m (#{issue_id})");

        let info = match self.fetch_issue(&url).await {
            Ok(Some(info)) => info,
            Ok(None) => return Outcome::NoComment,
            Err(e) => {
                tracing::error!(target: "poller", "\x1b[31missue parse failed\x1b[0m ({url}): {e:#}");
                return Outcome::IssueUnavailable;
            }
        };
        if info.comment.time.is_empty() {
            return Outcome::NoComment;
        }

        let key = dedup_key(&issue_id, &info.comment.time);
        if self.sent.contains(&key) {
            tracing::debug!(target: "poller", "{key} already relayed");
            return Outcome::Duplicate;
        }

        let rules = &self.rules;
        let parse = |s: &str| parse_local(s, &rules.time_format, rules.timezone);
        let (Some(last_modified), Some(comment_time)) =
            (parse(&info.last_modified), parse(&info.comment.time))
        else {
            tracing::warn!(
                target: "poller",
                "unreadable timestamps: modified {:?}, comment {:?}",
                info.last_modified,
                info.comment.time,
            );
            return Outcome::BadTimestamp;
        };

        if !caused_modification(last_modified, comment_time, rules.tolerance) {
            tracing::info!(
                target: "poller",
                "#{issue_id}: last change at {last_modified} is not the comment at {comment_time}",
            );
            return Outcome::Unrelated;
        }

        let translated = Translated::of(&self.translator, &info).await;
        let text = compose(&url, &info, &translated);
        let sent = match self.notifier.send(&text).await {
            Ok(()) => {
                tracing::info!(target: "slack", "\x1b[32mdelivered\x1b[0m #{issue_id} ({})", info.comment.time);
                true
            }
            Err(e) => {
                tracing::error!(target: "slack", "\x1b[31mdelivery failed\x1b[0m: {e:#}");
                false
            }
        };
        self.sent.insert(key);

        Outcome::Delivered { issue_id, sent }
    }

    async fn fetch_issue(&mut self, url: &str) -> anyhow::Result<Option<IssueSnapshot>> {
        let client = self.session.get().await?;
        let html = client.get(url).send().await?.error_for_status()?.text().await?;
        self.selectors.parse(&html)
    }

    /// Polls forever, starting a cycle every `interval` (or right after the
    /// previous one if it overran). Errors and panics end only their cycle.
    pub async fn run(mut self, interval: Duration) -> Infallible {
        loop {
            let start = Instant::now();
            tracing::info!(target: "poller", "poll started ...");

            match AssertUnwindSafe(self.poll()).catch_unwind().await {
                Ok(outcome) => tracing::debug!(target: "poller", "poll finished: {outcome:?}"),
                Err(panic) => {
                    let reason = panic
                        .downcast_ref::<&str>()
                        .map(|s| (*s).to_owned())
                        .or_else(|| panic.downcast_ref::<String>().cloned())
                        .unwrap_or_default();
                    tracing::error!(target: "poller", "\x1b[1;31mpoll panicked\x1b[0m: {reason}");
                }
            }

            tokio::time::sleep(pause(interval, start.elapsed())).await;
        }
    }
}
