use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::thread;
use std::time::Duration;

use arena::{
    ArenaPlayer, DebugInterface, MatchInfo, PlayerInfo, ThreadSafeTurnInfo, ThreadSafeTurnOrders,
    ThreadSafeTurnStatus, TurnOrders, TurnSnapshot, TurnStatus,
};
use tracing::{debug, info, warn};

use crate::colony::Colony;
use crate::config::{ClientConfig, ConfigError};
use crate::path_requests::PathChannels;

pub const PLAYER_NAME: &str = "Rusty Colony";
pub const AUTHOR_NAME: &str = "AntArena Rust client";
pub const PRIMARY_THREAD_INDEX: usize = 0;

static CLIENT_LOCK_POISON_WARNED: AtomicBool = AtomicBool::new(false);

fn warn_client_lock_poison_once(operation: &'static str) {
    if CLIENT_LOCK_POISON_WARNED
        .compare_exchange(false, true, Ordering::Relaxed, Ordering::Relaxed)
        .is_ok()
    {
        warn!(operation, "client lock poisoned; recovered inner value");
    }
}

fn lock_recovered<'a, T>(mutex: &'a Mutex<T>, operation: &'static str) -> MutexGuard<'a, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn_client_lock_poison_once(operation);
            poisoned.into_inner()
        }
    }
}

/// Everything that lives for exactly one match, shared by the host callbacks
/// and every lent thread.
pub struct MatchContext {
    pub match_info: MatchInfo,
    pub player_info: PlayerInfo,
    config: ClientConfig,
    debug: Arc<dyn DebugInterface>,
    status: ThreadSafeTurnStatus,
    turn_info: ThreadSafeTurnInfo,
    turn_orders: ThreadSafeTurnOrders,
    channels: Arc<PathChannels>,
    shutdown: AtomicBool,
    colony: Mutex<Option<Colony>>,
}

impl MatchContext {
    fn new(
        match_info: MatchInfo,
        player_info: PlayerInfo,
        config: ClientConfig,
        debug: Arc<dyn DebugInterface>,
    ) -> Self {
        let channels = Arc::new(PathChannels::new());
        let colony = Colony::new(
            match_info,
            player_info,
            config.clone(),
            debug.clone(),
            channels.clone(),
        );
        Self {
            match_info,
            player_info,
            config,
            debug,
            status: ThreadSafeTurnStatus::default(),
            turn_info: ThreadSafeTurnInfo::default(),
            turn_orders: ThreadSafeTurnOrders::default(),
            channels,
            shutdown: AtomicBool::new(false),
            colony: Mutex::new(Some(colony)),
        }
    }

    pub fn status(&self) -> TurnStatus {
        self.status.get()
    }

    pub fn channels(&self) -> &PathChannels {
        &self.channels
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    fn idle(&self) {
        idle_for(self.config.idle_backoff());
    }

    fn run_primary(&self) {
        let Some(mut colony) = lock_recovered(&self.colony, "take_colony").take() else {
            warn!("primary_thread_already_claimed_colony");
            self.run_path_worker(PRIMARY_THREAD_INDEX);
            return;
        };
        info!(
            assists_pathing = self.config.primary_assists_pathing,
            "primary_thread_started"
        );

        let mut snapshot = TurnSnapshot::default();
        let mut turns_processed = 0u32;
        while !self.is_shutting_down() {
            if self.status.get() != TurnStatus::ProcessingUpdate {
                if !(self.config.primary_assists_pathing && self.channels.service_one()) {
                    self.idle();
                }
                continue;
            }

            if !self.claim_snapshot(&mut snapshot) {
                continue;
            }

            let orders = colony.process_turn(&snapshot);
            self.turn_orders.copy_from(&orders);
            turns_processed += 1;
            if !self
                .status
                .transition(TurnStatus::WorkingOnOrders, TurnStatus::OrdersReady)
            {
                debug!(turn = snapshot.turn_number, "turn_orders_superseded");
            }
        }

        info!(
            turns_processed,
            ants = colony.ant_count(),
            nutrients = colony.current_nutrients(),
            "primary_thread_stopped"
        );
    }

    /// Moves `ProcessingUpdate` to `WorkingOnOrders` and only then copies the
    /// stored snapshot, so a snapshot delivered before the claim is never
    /// skipped. `out` is untouched when the claim fails.
    fn claim_snapshot(&self, out: &mut TurnSnapshot) -> bool {
        if !self.status.checked_transition(
            TurnStatus::ProcessingUpdate,
            TurnStatus::WorkingOnOrders,
            self.debug.as_ref(),
        ) {
            return false;
        }
        self.turn_info.copy_to(out);
        true
    }

    fn run_path_worker(&self, thread_index: usize) {
        debug!(thread_index, "path_worker_started");
        let mut serviced = 0u64;
        while !self.is_shutting_down() {
            if self.channels.service_one() {
                serviced += 1;
            } else {
                self.idle();
            }
        }
        debug!(thread_index, serviced, "path_worker_stopped");
    }
}

fn idle_for(backoff: Duration) {
    if backoff.is_zero() {
        thread::yield_now();
    } else {
        thread::sleep(backoff);
    }
}

/// The player the host loads. One instance outlives any number of matches.
pub struct ArenaClient {
    config: ClientConfig,
    context: RwLock<Option<Arc<MatchContext>>>,
}

impl Default for ArenaClient {
    fn default() -> Self {
        Self::new(ClientConfig::default())
    }
}

impl ArenaClient {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            context: RwLock::new(None),
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self::new(ClientConfig::load()?))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The running match, if any.
    pub fn context(&self) -> Option<Arc<MatchContext>> {
        match self.context.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => {
                warn_client_lock_poison_once("context_read");
                poisoned.into_inner().clone()
            }
        }
    }

    fn replace_context(&self, next: Option<Arc<MatchContext>>) -> Option<Arc<MatchContext>> {
        match self.context.write() {
            Ok(mut guard) => std::mem::replace(&mut *guard, next),
            Err(poisoned) => {
                warn_client_lock_poison_once("context_write");
                std::mem::replace(&mut *poisoned.into_inner(), next)
            }
        }
    }
}

impl ArenaPlayer for ArenaClient {
    fn player_name(&self) -> &str {
        PLAYER_NAME
    }

    fn author_name(&self) -> &str {
        AUTHOR_NAME
    }

    fn pre_game_startup(
        &self,
        match_info: MatchInfo,
        player_info: PlayerInfo,
        debug: Arc<dyn DebugInterface>,
    ) {
        let context = Arc::new(MatchContext::new(
            match_info,
            player_info,
            self.config.clone(),
            debug,
        ));
        context.status.set(TurnStatus::WaitingForNextUpdate);
        if let Some(previous) = self.replace_context(Some(context)) {
            warn!("previous_match_context_replaced");
            previous.shutdown.store(true, Ordering::Release);
        }
        info!(
            map_width = match_info.map_width,
            players = match_info.num_players,
            player_id = player_info.player_id.0,
            "match_started"
        );
    }

    fn post_game_shutdown(&self) {
        match self.replace_context(None) {
            Some(context) => {
                context.shutdown.store(true, Ordering::Release);
                info!(
                    pending_path_requests = context.channels.requests.len(),
                    "match_shutdown_signalled"
                );
            }
            None => warn!("shutdown_without_match"),
        }
    }

    fn thread_entry(&self, thread_index: usize) {
        let Some(context) = self.context() else {
            warn!(thread_index, "thread_entry_without_match");
            return;
        };
        if thread_index == PRIMARY_THREAD_INDEX {
            context.run_primary();
        } else {
            context.run_path_worker(thread_index);
        }
    }

    fn receive_turn_state(&self, snapshot: &TurnSnapshot) {
        let Some(context) = self.context() else {
            warn!(turn = snapshot.turn_number, "turn_state_without_match");
            return;
        };
        context
            .status
            .assert_status(TurnStatus::WaitingForNextUpdate, context.debug.as_ref());
        context.turn_info.copy_from(snapshot);
        context.status.set(TurnStatus::ProcessingUpdate);
    }

    fn turn_order_request(&self) -> Option<TurnOrders> {
        let context = self.context()?;
        if context.status.get() != TurnStatus::OrdersReady {
            return None;
        }
        let orders = context.turn_orders.get();
        context
            .status
            .transition(TurnStatus::OrdersReady, TurnStatus::WaitingForNextUpdate)
            .then_some(orders)
    }
}

#[cfg(test)]
mod tests {
    use arena::{CapturingDebugInterface, PlayerId};

    use super::*;

    fn start(client: &ArenaClient) -> Arc<CapturingDebugInterface> {
        let debug = Arc::new(CapturingDebugInterface::default());
        client.pre_game_startup(
            MatchInfo::default(),
            PlayerInfo {
                player_id: PlayerId(0),
                team_id: 0,
            },
            debug.clone(),
        );
        debug
    }

    #[test]
    fn orders_are_not_ready_before_a_turn_is_processed() {
        let client = ArenaClient::default();
        assert_eq!(client.turn_order_request(), None);
        start(&client);
        assert_eq!(
            client.context().map(|context| context.status()),
            Some(TurnStatus::WaitingForNextUpdate)
        );
        assert_eq!(client.turn_order_request(), None);
    }

    #[test]
    fn snapshot_during_processing_logs_mismatch_and_overwrites() {
        let client = ArenaClient::default();
        let debug = start(&client);
        let first = TurnSnapshot {
            turn_number: 1,
            ..TurnSnapshot::default()
        };
        let second = TurnSnapshot {
            turn_number: 2,
            ..TurnSnapshot::default()
        };
        client.receive_turn_state(&first);
        client.receive_turn_state(&second);

        assert_eq!(debug.log_count(), 1);
        let context = client.context().expect("match running");
        assert_eq!(context.status(), TurnStatus::ProcessingUpdate);
        assert_eq!(context.turn_info.get().turn_number, 2);
    }

    #[test]
    fn snapshot_is_claimed_before_it_is_copied() {
        let client = ArenaClient::default();
        let debug = start(&client);
        let context = client.context().expect("match running");
        context.turn_info.copy_from(&TurnSnapshot {
            turn_number: 5,
            ..TurnSnapshot::default()
        });

        let mut claimed = TurnSnapshot::default();
        assert!(!context.claim_snapshot(&mut claimed));
        assert_eq!(claimed.turn_number, 0);
        assert_eq!(debug.log_count(), 1);

        client.receive_turn_state(&TurnSnapshot {
            turn_number: 6,
            ..TurnSnapshot::default()
        });
        assert!(context.claim_snapshot(&mut claimed));
        assert_eq!(claimed.turn_number, 6);
        assert_eq!(context.status(), TurnStatus::WorkingOnOrders);

        // A newer turn landing mid-work is what the next claim picks up.
        client.receive_turn_state(&TurnSnapshot {
            turn_number: 7,
            ..TurnSnapshot::default()
        });
        assert!(context.claim_snapshot(&mut claimed));
        assert_eq!(claimed.turn_number, 7);
    }

    #[test]
    fn shutdown_releases_context_and_stops_threads() {
        let client = ArenaClient::default();
        start(&client);
        thread::scope(|scope| {
            scope.spawn(|| client.thread_entry(0));
            scope.spawn(|| client.thread_entry(1));
            thread::sleep(Duration::from_millis(5));
            client.post_game_shutdown();
        });
        assert!(client.context().is_none());
        // Entering after shutdown returns immediately.
        client.thread_entry(1);
    }

    #[test]
    fn identification_uses_crate_constants() {
        let client = ArenaClient::default();
        assert_eq!(client.player_name(), PLAYER_NAME);
        assert_eq!(client.author_name(), AUTHOR_NAME);
        assert_eq!(client.interface_version(), arena::INTERFACE_VERSION);
    }
}
