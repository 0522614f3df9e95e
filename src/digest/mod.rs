//! Daily digest scheduler.
//!
//! Arms a timer for the configured UTC posting time, fires the
//! server-wide computation, posts the result, and re-arms on a fixed
//! 24-hour period. A failed firing (no data, upstream down, sink down)
//! is logged and skipped; it never breaks the re-arm chain.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveTime, Utc};
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::aggregate::{AggregateError, StatsAggregator};
use crate::present::{daily_embed, MessageSink};
use crate::store::EventStore;

/// Fixed period between automatic firings once armed.
const REARM_PERIOD: Duration = Duration::from_secs(24 * 60 * 60);

/// Delay from `now` to the next occurrence of the posting time.
/// If today's slot has already passed, the next one is tomorrow's.
pub fn delay_until(now: DateTime<Utc>, post_time: NaiveTime) -> Duration {
    let target = now.date_naive().and_time(post_time).and_utc();
    let mut delta = target - now;
    if delta < chrono::Duration::zero() {
        delta += chrono::Duration::hours(24);
    }
    delta.to_std().unwrap_or_default()
}

/// Scheduler lifecycle: `Idle -> Armed -> Firing -> Armed` (repeat).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Armed,
    Firing,
}

/// Posts the daily leaderboard digest on a fixed UTC schedule.
pub struct DigestScheduler<S, M> {
    aggregator: StatsAggregator<S>,
    sink: Arc<M>,
    post_time: NaiveTime,
    window_days: u32,
    embed_color: u32,
    state: SchedulerState,
}

impl<S: EventStore, M: MessageSink> DigestScheduler<S, M> {
    pub fn new(
        aggregator: StatsAggregator<S>,
        sink: Arc<M>,
        post_time: NaiveTime,
        window_days: u32,
        embed_color: u32,
    ) -> Self {
        Self {
            aggregator,
            sink,
            post_time,
            window_days,
            embed_color,
            state: SchedulerState::Idle,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Run until the shutdown signal flips. Fires once at the next
    /// configured posting time, then every 24 hours.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        let mut delay = delay_until(Utc::now(), self.post_time);
        info!(
            "Daily stats armed, next post at {} UTC (in {:?})",
            self.post_time, delay
        );
        self.state = SchedulerState::Armed;

        loop {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {
                    self.fire().await;
                    delay = REARM_PERIOD;
                }
                _ = shutdown.changed() => {
                    info!("Digest scheduler disarmed");
                    self.state = SchedulerState::Idle;
                    return;
                }
            }
        }
    }

    /// One firing: compute, render, post. Also used by the manual
    /// trigger path; a manual firing does not move the automatic
    /// schedule.
    pub async fn fire(&mut self) {
        self.state = SchedulerState::Firing;

        match self.aggregator.server_stats(self.window_days).await {
            Ok(snapshot) => {
                let embed = daily_embed(&snapshot, self.embed_color);
                if let Err(e) = self.sink.post(&embed).await {
                    error!("Failed to post daily stats: {}", e);
                }
            }
            Err(AggregateError::NoDataInWindow(days)) => {
                info!(
                    "Skipping daily stats: no qualifying events in the last {} day(s)",
                    days
                );
            }
            Err(e) => {
                warn!("Daily stats computation failed: {}", e);
            }
        }

        self.state = SchedulerState::Armed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DeathEvent, PlayerId, PlayerRecord};
    use crate::present::{MessageEmbed, SinkError};
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct RecordingSink {
        posts: Mutex<Vec<MessageEmbed>>,
    }

    impl RecordingSink {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                posts: Mutex::new(Vec::new()),
            })
        }

        fn count(&self) -> usize {
            self.posts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl MessageSink for RecordingSink {
        async fn post(&self, message: &MessageEmbed) -> Result<(), SinkError> {
            self.posts.lock().unwrap().push(message.clone());
            Ok(())
        }
    }

    struct FailingSink;

    #[async_trait]
    impl MessageSink for FailingSink {
        async fn post(&self, _message: &MessageEmbed) -> Result<(), SinkError> {
            Err(SinkError::Unavailable("channel gone".to_string()))
        }
    }

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        chrono::NaiveDate::from_ymd_opt(2026, 8, 27)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
            .and_utc()
    }

    fn populated_store() -> Arc<MemoryStore> {
        let store = MemoryStore::new();
        let alice = PlayerId::new(76561198000000001);
        store.upsert_player(PlayerRecord {
            id: alice,
            last_name: "Alice".to_string(),
        });
        store.record_death(DeathEvent {
            time: Utc::now(),
            wound_time: None,
            victim: Some(PlayerId::new(76561198000000002)),
            attacker: Some(alice),
            weapon: "BP_AK74_Rifle".to_string(),
            teamkill: Some(false),
        });
        Arc::new(store)
    }

    #[test]
    fn test_delay_until_target_ahead() {
        // 08:00 -> 10:00 is two hours out.
        let delay = delay_until(at(8, 0), time(10, 0));
        assert_eq!(delay, Duration::from_secs(2 * 3600));
    }

    #[test]
    fn test_delay_until_target_passed_adds_a_day() {
        // 23:50 -> 10:00 wraps to tomorrow: 10h10m.
        let delay = delay_until(at(23, 50), time(10, 0));
        assert_eq!(delay, Duration::from_secs(10 * 3600 + 10 * 60));
    }

    #[test]
    fn test_delay_until_exact_slot_is_zero() {
        let delay = delay_until(at(10, 0), time(10, 0));
        assert_eq!(delay, Duration::ZERO);
    }

    #[tokio::test]
    async fn test_fire_posts_digest() {
        let sink = RecordingSink::new();
        let mut scheduler = DigestScheduler::new(
            StatsAggregator::new(populated_store()),
            sink.clone(),
            time(10, 0),
            30,
            16759808,
        );

        scheduler.fire().await;
        assert_eq!(sink.count(), 1);
        assert_eq!(scheduler.state(), SchedulerState::Armed);
    }

    #[tokio::test]
    async fn test_fire_empty_window_rearms_without_posting() {
        let sink = RecordingSink::new();
        let mut scheduler = DigestScheduler::new(
            StatsAggregator::new(Arc::new(MemoryStore::new())),
            sink.clone(),
            time(10, 0),
            30,
            16759808,
        );

        scheduler.fire().await;
        assert_eq!(sink.count(), 0);
        assert_eq!(scheduler.state(), SchedulerState::Armed);
    }

    #[tokio::test]
    async fn test_fire_sink_failure_still_rearms() {
        let mut scheduler = DigestScheduler::new(
            StatsAggregator::new(populated_store()),
            Arc::new(FailingSink),
            time(10, 0),
            30,
            16759808,
        );

        scheduler.fire().await;
        assert_eq!(scheduler.state(), SchedulerState::Armed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_fires_and_shuts_down() {
        let sink = RecordingSink::new();
        let mut scheduler = DigestScheduler::new(
            StatsAggregator::new(populated_store()),
            sink.clone(),
            time(10, 0),
            30,
            16759808,
        );

        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(async move {
            scheduler.run(rx).await;
            scheduler
        });

        // Paused time fast-forwards through the armed delay (at most
        // 24h) plus one re-arm period.
        tokio::time::sleep(Duration::from_secs(49 * 3600)).await;
        tx.send(true).unwrap();

        let scheduler = handle.await.unwrap();
        assert_eq!(scheduler.state(), SchedulerState::Idle);
        assert!(sink.count() >= 1);
    }
}
