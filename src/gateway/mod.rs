//! Command gateway: authorization, cooldowns, dispatch.
//!
//! Both stat channels (in-game chat and the external chat platform)
//! funnel through here. The gateway checks permissions, enforces the
//! per-requester cooldown, resolves identities for the chat channel,
//! and hands off to the aggregator. Every failure maps to a
//! user-facing message; nothing here is allowed to crash the process.

mod command;

pub use command::{ChatCommand, CommandGrammar};

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tracing::{debug, warn};

use crate::aggregate::{AggregateError, StatsAggregator};
use crate::models::{ChatUserId, PlayerId, PlayerStatsSnapshot, RoleId, ServerStatsSnapshot};
use crate::resolver::{IdentityResolver, ResolveError};
use crate::store::EventStore;

/// Gateway failure taxonomy. Each variant carries enough to build the
/// reply the requester sees.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("not authorized: {0}")]
    NotAuthorized(String),

    #[error("command disabled: {0}")]
    Disabled(&'static str),

    #[error("cooldown active, {wait_minutes} minute(s) remaining")]
    RateLimited { wait_minutes: u64 },

    #[error("no stats recorded for player {0}")]
    IdentityNotFound(PlayerId),

    #[error("identity resolution failed: {0}")]
    ResolutionFailed(ResolveError),

    #[error("no qualifying events in the last {0} day(s)")]
    NoDataInWindow(u32),

    #[error("upstream service error: {0}")]
    Upstream(String),
}

impl GatewayError {
    /// The message shown to the requester. Never leaks internals.
    pub fn user_message(&self) -> String {
        match self {
            GatewayError::NotAuthorized(msg) => msg.clone(),
            GatewayError::Disabled(msg) => msg.to_string(),
            GatewayError::RateLimited { wait_minutes } => format!(
                "Please wait {} minute(s) before using this command again.",
                wait_minutes
            ),
            GatewayError::IdentityNotFound(id) => {
                format!("There is no statistics for player with id `{}` yet.", id)
            }
            GatewayError::ResolutionFailed(ResolveError::NotLinked(_)) => {
                "Your chat account is not linked to an in-game account.\n\
                 Use the whitelister to link it, or pass your 17-digit id directly."
                    .to_string()
            }
            GatewayError::ResolutionFailed(_) | GatewayError::Upstream(_) => {
                "Stats are unavailable right now, please try again later.".to_string()
            }
            GatewayError::NoDataInWindow(days) => {
                format!("No stats recorded in the last {} day(s).", days)
            }
        }
    }
}

impl From<AggregateError> for GatewayError {
    fn from(err: AggregateError) -> Self {
        match err {
            AggregateError::IdentityNotFound(id) => GatewayError::IdentityNotFound(id),
            AggregateError::NoDataInWindow(days) => GatewayError::NoDataInWindow(days),
            AggregateError::WindowTooShort(_) => GatewayError::Upstream(err.to_string()),
            AggregateError::Store(e) => GatewayError::Upstream(e.to_string()),
        }
    }
}

/// Time source, injectable so cooldown behavior is testable.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Who is asking: the key for cooldown bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RequesterId {
    Player(PlayerId),
    ChatUser(ChatUserId),
}

/// Per-requester cooldown map.
///
/// Process-local by design: entries reset on restart. A timestamp is
/// recorded only for requests that ran to completion, so a rejected
/// attempt never extends the wait.
pub struct CooldownStore {
    cooldown: Duration,
    last_served: Mutex<HashMap<RequesterId, DateTime<Utc>>>,
}

impl CooldownStore {
    pub fn new(cooldown_minutes: u64) -> Self {
        Self {
            cooldown: Duration::minutes(cooldown_minutes as i64),
            last_served: Mutex::new(HashMap::new()),
        }
    }

    /// Ok when the requester is outside their cooldown window;
    /// otherwise the remaining wait in minutes, rounded up.
    pub fn check(&self, who: &RequesterId, now: DateTime<Utc>) -> Result<(), u64> {
        let map = self.last_served.lock().expect("cooldown lock poisoned");
        let Some(last) = map.get(who) else {
            return Ok(());
        };

        let remaining = self.cooldown - (now - *last);
        if remaining <= Duration::zero() {
            return Ok(());
        }
        let ms = remaining.num_milliseconds().max(1) as u64;
        Err(ms.div_ceil(60_000))
    }

    /// Record a served request.
    pub fn mark(&self, who: &RequesterId, now: DateTime<Utc>) {
        let mut map = self.last_served.lock().expect("cooldown lock poisoned");
        map.insert(who.clone(), now);
    }
}

/// Gateway tunables, derived from configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Trailing window for every stats query, in days
    pub window_days: u32,

    /// Whether the in-game stats command is served at all
    pub ingame_enabled: bool,

    /// Whether the external-chat stats command is served at all
    pub chat_stats_enabled: bool,

    /// Whether the digest (and its manual trigger) is enabled
    pub digest_enabled: bool,

    /// Whether the in-game command requires the reserve permission
    pub require_reserve: bool,

    /// Role required for the manual digest trigger, if any
    pub digest_role: Option<RoleId>,
}

/// A stats request from in-game chat.
#[derive(Debug, Clone)]
pub struct IngameRequest {
    pub player: PlayerId,
    /// Whether the requester holds the reserve (allow-list) permission
    pub has_reserve: bool,
}

/// A parsed request from the external chat platform.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub user: ChatUserId,
    pub roles: Vec<RoleId>,
    pub command: ChatCommand,
}

/// Successful chat dispatch outcome, ready for the formatter.
#[derive(Debug)]
pub enum GatewayReply {
    Personal(PlayerStatsSnapshot),
    Digest(ServerStatsSnapshot),
}

const RESERVE_REQUIRED_MSG: &str = "You must be Whitelisted to use this Command.\n\
     You can use this Command in our Discord.\nUse !whitelist for more info.";
const ROLE_REQUIRED_MSG: &str = "You do not have permission to use this command.";
const INGAME_DISABLED_MSG: &str = "In Game Stats are not enabled.";
const CHAT_STATS_DISABLED_MSG: &str = "In Discord Stats are not enabled.";
const DAILY_DISABLED_MSG: &str = "Daily Stats are not enabled.";

/// Dispatches authorized, rate-limited stat requests to the aggregator.
pub struct CommandGateway<S, R> {
    aggregator: StatsAggregator<S>,
    resolver: Arc<R>,
    cooldowns: CooldownStore,
    clock: Arc<dyn Clock>,
    config: GatewayConfig,
}

impl<S: EventStore, R: IdentityResolver> CommandGateway<S, R> {
    pub fn new(
        aggregator: StatsAggregator<S>,
        resolver: Arc<R>,
        config: GatewayConfig,
        cooldown_minutes: u64,
    ) -> Self {
        Self {
            aggregator,
            resolver,
            cooldowns: CooldownStore::new(cooldown_minutes),
            clock: Arc::new(SystemClock),
            config,
        }
    }

    /// Replace the time source (tests).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Handle the in-game stats command for the requester's own identity.
    pub async fn handle_ingame(
        &self,
        request: IngameRequest,
    ) -> Result<PlayerStatsSnapshot, GatewayError> {
        if !self.config.ingame_enabled {
            return Err(GatewayError::Disabled(INGAME_DISABLED_MSG));
        }

        if self.config.require_reserve && !request.has_reserve {
            debug!("Rejecting in-game stats from {}: no reserve", request.player);
            return Err(GatewayError::NotAuthorized(RESERVE_REQUIRED_MSG.to_string()));
        }

        let who = RequesterId::Player(request.player);
        self.cooldowns
            .check(&who, self.clock.now())
            .map_err(|wait_minutes| GatewayError::RateLimited { wait_minutes })?;

        let snapshot = self
            .aggregator
            .player_stats(request.player, self.config.window_days)
            .await?;

        self.cooldowns.mark(&who, self.clock.now());
        Ok(snapshot)
    }

    /// Handle a parsed external-chat command.
    pub async fn handle_chat(&self, request: ChatRequest) -> Result<GatewayReply, GatewayError> {
        match request.command {
            ChatCommand::PostDigest => {
                if !self.config.digest_enabled {
                    return Err(GatewayError::Disabled(DAILY_DISABLED_MSG));
                }

                if let Some(required) = &self.config.digest_role {
                    if !request.roles.contains(required) {
                        warn!("Chat user {} tried the digest command without the role", request.user);
                        return Err(GatewayError::NotAuthorized(ROLE_REQUIRED_MSG.to_string()));
                    }
                }

                let snapshot = self
                    .aggregator
                    .server_stats(self.config.window_days)
                    .await?;
                Ok(GatewayReply::Digest(snapshot))
            }

            ChatCommand::PersonalStats { player } => {
                if !self.config.chat_stats_enabled {
                    return Err(GatewayError::Disabled(CHAT_STATS_DISABLED_MSG));
                }

                let who = RequesterId::ChatUser(request.user.clone());
                self.cooldowns
                    .check(&who, self.clock.now())
                    .map_err(|wait_minutes| GatewayError::RateLimited { wait_minutes })?;

                // An explicit argument wins; otherwise resolve through
                // the whitelister link.
                let player = match player {
                    Some(id) => id,
                    None => self
                        .resolver
                        .resolve(&request.user)
                        .await
                        .map_err(GatewayError::ResolutionFailed)?,
                };

                let snapshot = self
                    .aggregator
                    .player_stats(player, self.config.window_days)
                    .await?;

                self.cooldowns.mark(&who, self.clock.now());
                Ok(GatewayReply::Personal(snapshot))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DeathEvent, PlayerRecord};
    use crate::store::MemoryStore;
    use async_trait::async_trait;

    const ALICE: PlayerId = PlayerId::new(76561198000000001);
    const BOB: PlayerId = PlayerId::new(76561198000000002);

    struct StubResolver {
        result: Option<PlayerId>,
    }

    #[async_trait]
    impl IdentityResolver for StubResolver {
        async fn resolve(&self, user: &ChatUserId) -> Result<PlayerId, ResolveError> {
            self.result
                .ok_or_else(|| ResolveError::NotLinked(user.clone()))
        }
    }

    struct ManualClock {
        now: Mutex<DateTime<Utc>>,
    }

    impl ManualClock {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                now: Mutex::new(Utc::now()),
            })
        }

        fn advance_minutes(&self, minutes: i64) {
            let mut now = self.now.lock().unwrap();
            *now += Duration::minutes(minutes);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock().unwrap()
        }
    }

    fn store() -> Arc<MemoryStore> {
        let store = MemoryStore::new();
        store.upsert_player(PlayerRecord {
            id: ALICE,
            last_name: "Alice".to_string(),
        });
        store.upsert_player(PlayerRecord {
            id: BOB,
            last_name: "Bob".to_string(),
        });
        store.record_death(DeathEvent {
            time: Utc::now(),
            wound_time: None,
            victim: Some(BOB),
            attacker: Some(ALICE),
            weapon: "BP_AK74_Rifle".to_string(),
            teamkill: Some(false),
        });
        Arc::new(store)
    }

    fn gateway(
        resolver: StubResolver,
        config: GatewayConfig,
    ) -> CommandGateway<MemoryStore, StubResolver> {
        CommandGateway::new(
            StatsAggregator::new(store()),
            Arc::new(resolver),
            config,
            15,
        )
    }

    fn default_config() -> GatewayConfig {
        GatewayConfig {
            window_days: 30,
            ingame_enabled: true,
            chat_stats_enabled: true,
            digest_enabled: true,
            require_reserve: true,
            digest_role: Some(RoleId::from("667741905228136459")),
        }
    }

    #[tokio::test]
    async fn test_ingame_requires_reserve() {
        let gw = gateway(StubResolver { result: None }, default_config());
        let err = gw
            .handle_ingame(IngameRequest {
                player: ALICE,
                has_reserve: false,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::NotAuthorized(_)));
        assert!(err.user_message().contains("Whitelisted"));
    }

    #[tokio::test]
    async fn test_ingame_disabled() {
        let config = GatewayConfig {
            ingame_enabled: false,
            ..default_config()
        };
        let gw = gateway(StubResolver { result: None }, config);
        let err = gw
            .handle_ingame(IngameRequest {
                player: ALICE,
                has_reserve: true,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Disabled(_)));
        assert_eq!(err.user_message(), "In Game Stats are not enabled.");
    }

    #[tokio::test]
    async fn test_chat_stats_disabled() {
        let config = GatewayConfig {
            chat_stats_enabled: false,
            ..default_config()
        };
        let gw = gateway(StubResolver { result: Some(ALICE) }, config);
        let err = gw
            .handle_chat(ChatRequest {
                user: ChatUserId::from("111"),
                roles: vec![],
                command: ChatCommand::PersonalStats { player: None },
            })
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Disabled(_)));
        assert_eq!(err.user_message(), "In Discord Stats are not enabled.");
    }

    #[tokio::test]
    async fn test_digest_disabled_beats_role_check() {
        let config = GatewayConfig {
            digest_enabled: false,
            ..default_config()
        };
        let gw = gateway(StubResolver { result: None }, config);

        // Even the role holder gets the disabled reply.
        let err = gw
            .handle_chat(ChatRequest {
                user: ChatUserId::from("111"),
                roles: vec![RoleId::from("667741905228136459")],
                command: ChatCommand::PostDigest,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Disabled(_)));
        assert_eq!(err.user_message(), "Daily Stats are not enabled.");
    }

    #[tokio::test]
    async fn test_ingame_cooldown_cycle() {
        let clock = ManualClock::new();
        let gw = gateway(StubResolver { result: None }, default_config())
            .with_clock(clock.clone());
        let request = IngameRequest {
            player: ALICE,
            has_reserve: true,
        };

        // First request proceeds and starts the cooldown.
        gw.handle_ingame(request.clone()).await.unwrap();

        // Within the window: rejected, with the remaining wait.
        clock.advance_minutes(5);
        let err = gw.handle_ingame(request.clone()).await.unwrap_err();
        assert!(matches!(err, GatewayError::RateLimited { wait_minutes: 10 }));

        // The rejection must not have refreshed the timestamp: 10 more
        // minutes from the *first* request and we are clear again.
        clock.advance_minutes(10);
        gw.handle_ingame(request).await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_request_does_not_start_cooldown() {
        let clock = ManualClock::new();
        let gw = gateway(StubResolver { result: None }, default_config())
            .with_clock(clock.clone());

        let ghost = PlayerId::new(76561198099999999);
        let err = gw
            .handle_ingame(IngameRequest {
                player: ghost,
                has_reserve: true,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::IdentityNotFound(_)));

        // Same requester key would now be cooling down if the failure
        // had been marked; it must not be.
        let err = gw
            .handle_ingame(IngameRequest {
                player: ghost,
                has_reserve: true,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::IdentityNotFound(_)));
    }

    #[tokio::test]
    async fn test_chat_explicit_id_skips_resolver() {
        let gw = gateway(StubResolver { result: None }, default_config());
        let reply = gw
            .handle_chat(ChatRequest {
                user: ChatUserId::from("111"),
                roles: vec![],
                command: ChatCommand::PersonalStats {
                    player: Some(ALICE),
                },
            })
            .await
            .unwrap();

        match reply {
            GatewayReply::Personal(snap) => assert_eq!(snap.kills, 1),
            other => panic!("expected personal reply, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_chat_resolves_linked_identity() {
        let gw = gateway(
            StubResolver {
                result: Some(ALICE),
            },
            default_config(),
        );
        let reply = gw
            .handle_chat(ChatRequest {
                user: ChatUserId::from("111"),
                roles: vec![],
                command: ChatCommand::PersonalStats { player: None },
            })
            .await
            .unwrap();
        assert!(matches!(reply, GatewayReply::Personal(_)));
    }

    #[tokio::test]
    async fn test_chat_unlinked_gets_guidance() {
        let gw = gateway(StubResolver { result: None }, default_config());
        let err = gw
            .handle_chat(ChatRequest {
                user: ChatUserId::from("111"),
                roles: vec![],
                command: ChatCommand::PersonalStats { player: None },
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            GatewayError::ResolutionFailed(ResolveError::NotLinked(_))
        ));
        assert!(err.user_message().contains("not linked"));
    }

    #[tokio::test]
    async fn test_digest_role_gate() {
        let gw = gateway(StubResolver { result: None }, default_config());

        let err = gw
            .handle_chat(ChatRequest {
                user: ChatUserId::from("111"),
                roles: vec![RoleId::from("someone-else")],
                command: ChatCommand::PostDigest,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::NotAuthorized(_)));

        let reply = gw
            .handle_chat(ChatRequest {
                user: ChatUserId::from("111"),
                roles: vec![RoleId::from("667741905228136459")],
                command: ChatCommand::PostDigest,
            })
            .await
            .unwrap();
        assert!(matches!(reply, GatewayReply::Digest(_)));
    }

    #[test]
    fn test_cooldown_wait_rounds_up() {
        let store = CooldownStore::new(15);
        let who = RequesterId::Player(ALICE);
        let start = Utc::now();
        store.mark(&who, start);

        // 30 seconds in: 14m30s remaining rounds up to 15.
        let wait = store
            .check(&who, start + Duration::seconds(30))
            .unwrap_err();
        assert_eq!(wait, 15);

        // 14m30s in: 30s remaining rounds up to 1.
        let wait = store
            .check(&who, start + Duration::seconds(870))
            .unwrap_err();
        assert_eq!(wait, 1);

        assert!(store.check(&who, start + Duration::minutes(15)).is_ok());
    }

    #[test]
    fn test_cooldown_wait_rounds_up_fractional_seconds() {
        let store = CooldownStore::new(15);
        let who = RequesterId::Player(ALICE);
        let start = Utc::now();
        store.mark(&who, start);

        // 60.4s remaining is more than a minute, so the wait is 2.
        let wait = store
            .check(&who, start + Duration::milliseconds(15 * 60_000 - 60_400))
            .unwrap_err();
        assert_eq!(wait, 2);
    }
}
