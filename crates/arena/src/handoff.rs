use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::debug::DebugInterface;
use crate::protocol::{TurnOrders, TurnSnapshot};

static HANDOFF_LOCK_POISON_WARNED: AtomicBool = AtomicBool::new(false);

fn warn_handoff_lock_poison_once(operation: &'static str) {
    if HANDOFF_LOCK_POISON_WARNED
        .compare_exchange(false, true, Ordering::Relaxed, Ordering::Relaxed)
        .is_ok()
    {
        warn!(operation, "handoff lock poisoned; recovered inner value");
    }
}

/// Single-slot cross-thread buffer. Every access is one full value copy under
/// the lock; a write replaces whatever was there, read or not.
#[derive(Debug, Default)]
pub struct HandOff<T> {
    slot: Mutex<T>,
}

impl<T: Clone> HandOff<T> {
    pub fn new(value: T) -> Self {
        Self {
            slot: Mutex::new(value),
        }
    }

    fn lock(&self, operation: &'static str) -> MutexGuard<'_, T> {
        match self.slot.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn_handoff_lock_poison_once(operation);
                poisoned.into_inner()
            }
        }
    }

    pub fn set(&self, value: T) {
        *self.lock("set") = value;
    }

    pub fn get(&self) -> T {
        self.lock("get").clone()
    }

    pub fn copy_from(&self, value: &T) {
        self.lock("copy_from").clone_from(value);
    }

    pub fn copy_to(&self, out: &mut T) {
        out.clone_from(&self.lock("copy_to"));
    }
}

pub type ThreadSafeTurnInfo = HandOff<TurnSnapshot>;
pub type ThreadSafeTurnOrders = HandOff<TurnOrders>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TurnStatus {
    #[default]
    WaitingForPregameStartup,
    WaitingForNextUpdate,
    ProcessingUpdate,
    WorkingOnOrders,
    OrdersReady,
}

impl TurnStatus {
    /// The status that legitimately follows this one.
    pub fn successor(self) -> TurnStatus {
        match self {
            Self::WaitingForPregameStartup => Self::WaitingForNextUpdate,
            Self::WaitingForNextUpdate => Self::ProcessingUpdate,
            Self::ProcessingUpdate => Self::WorkingOnOrders,
            Self::WorkingOnOrders => Self::OrdersReady,
            Self::OrdersReady => Self::WaitingForNextUpdate,
        }
    }
}

impl fmt::Display for TurnStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::WaitingForPregameStartup => "WAITING_FOR_PREGAME_STARTUP",
            Self::WaitingForNextUpdate => "WAITING_FOR_NEXT_UPDATE",
            Self::ProcessingUpdate => "PROCESSING_UPDATE",
            Self::WorkingOnOrders => "WORKING_ON_ORDERS",
            Self::OrdersReady => "ORDERS_READY",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Default)]
pub struct ThreadSafeTurnStatus {
    status: HandOff<TurnStatus>,
}

impl ThreadSafeTurnStatus {
    pub fn get(&self) -> TurnStatus {
        self.status.get()
    }

    pub fn set(&self, status: TurnStatus) {
        self.status.set(status);
    }

    /// Soft invariant check: a mismatch is logged and reported, never fatal.
    pub fn assert_status(&self, expected: TurnStatus, debug: &dyn DebugInterface) -> bool {
        let actual = self.get();
        if actual == expected {
            return true;
        }
        report_mismatch(expected, actual, debug);
        false
    }

    /// Moves `from -> to` only if the status is still `from`, in one lock hold.
    pub fn transition(&self, from: TurnStatus, to: TurnStatus) -> bool {
        let mut guard = self.status.lock("transition");
        if *guard != from {
            return false;
        }
        *guard = to;
        true
    }

    /// Like [`transition`](Self::transition) but logs the mismatch on failure.
    pub fn checked_transition(
        &self,
        from: TurnStatus,
        to: TurnStatus,
        debug: &dyn DebugInterface,
    ) -> bool {
        let mut guard = self.status.lock("checked_transition");
        let actual = *guard;
        if actual != from {
            drop(guard);
            report_mismatch(from, actual, debug);
            return false;
        }
        *guard = to;
        true
    }
}

fn report_mismatch(expected: TurnStatus, actual: TurnStatus, debug: &dyn DebugInterface) {
    warn!(%expected, %actual, "turn_status_mismatch");
    debug.log(&format!(
        "turn status mismatch: expected {expected}, found {actual}"
    ));
}

#[cfg(test)]
mod tests {
    use std::thread;

    use proptest::prelude::*;

    use super::*;
    use crate::coords::TileCoords;
    use crate::debug::CapturingDebugInterface;
    use crate::protocol::{
        AgentId, AgentReport, AgentResult, AgentState, AgentType, OrderCode, TileType,
    };

    fn poison_lock<T: Send>(lock: &Mutex<T>) {
        thread::scope(|scope| {
            let _ = scope
                .spawn(|| {
                    let _guard = lock.lock().expect("lock");
                    panic!("poison handoff lock");
                })
                .join();
        });
    }

    fn report(id: u32, x: i32, y: i32) -> AgentReport {
        AgentReport {
            agent_id: AgentId(id),
            position: TileCoords::new(x, y),
            exhaustion: 0,
            received_combat_damage: false,
            received_suffocation_damage: false,
            agent_type: AgentType::Worker,
            state: AgentState::Normal,
            result: AgentResult::OrderSuccessMoved,
        }
    }

    #[test]
    fn copy_to_after_copy_from_yields_empty_snapshot() {
        let handoff = ThreadSafeTurnInfo::default();
        let snapshot = TurnSnapshot::default();
        handoff.copy_from(&snapshot);

        let mut out = TurnSnapshot {
            turn_number: 99,
            reports: vec![report(1, 0, 0)],
            ..TurnSnapshot::default()
        };
        handoff.copy_to(&mut out);
        assert_eq!(out, snapshot);
    }

    #[test]
    fn copy_to_after_copy_from_yields_empty_orders() {
        let handoff = ThreadSafeTurnOrders::default();
        let mut stale = TurnOrders::default();
        stale.push(AgentId(4), OrderCode::MoveNorth);
        handoff.set(stale);

        handoff.copy_from(&TurnOrders::default());
        let mut out = TurnOrders::default();
        out.push(AgentId(8), OrderCode::Hold);
        handoff.copy_to(&mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn later_write_overwrites_unread_value() {
        let handoff = HandOff::new(1u32);
        handoff.set(2);
        handoff.set(3);
        assert_eq!(handoff.get(), 3);
    }

    #[test]
    fn handoff_recovers_after_poison_without_panic() {
        let handoff = HandOff::new(5u32);
        poison_lock(&handoff.slot);
        assert_eq!(handoff.get(), 5);
        handoff.set(6);
        assert_eq!(handoff.get(), 6);
    }

    #[test]
    fn documented_status_cycle_never_logs_mismatch() {
        let debug = CapturingDebugInterface::default();
        let status = ThreadSafeTurnStatus::default();
        let mut expected = TurnStatus::WaitingForPregameStartup;
        for _ in 0..9 {
            assert!(status.assert_status(expected, &debug));
            let next = expected.successor();
            status.set(next);
            expected = next;
        }
        assert_eq!(debug.log_count(), 0);
    }

    #[test]
    fn out_of_order_status_logs_mismatch_without_panicking() {
        let debug = CapturingDebugInterface::default();
        let status = ThreadSafeTurnStatus::default();
        status.set(TurnStatus::WorkingOnOrders);

        assert!(!status.assert_status(TurnStatus::WaitingForNextUpdate, &debug));
        assert!(!status.checked_transition(
            TurnStatus::OrdersReady,
            TurnStatus::WaitingForNextUpdate,
            &debug
        ));

        assert_eq!(status.get(), TurnStatus::WorkingOnOrders);
        let lines = debug.log_lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("WAITING_FOR_NEXT_UPDATE"));
        assert!(lines[0].contains("WORKING_ON_ORDERS"));
    }

    #[test]
    fn transition_only_applies_from_expected_state() {
        let status = ThreadSafeTurnStatus::default();
        status.set(TurnStatus::ProcessingUpdate);
        assert!(!status.transition(TurnStatus::WorkingOnOrders, TurnStatus::OrdersReady));
        assert!(status.transition(TurnStatus::ProcessingUpdate, TurnStatus::WorkingOnOrders));
        assert_eq!(status.get(), TurnStatus::WorkingOnOrders);
    }

    fn arb_report() -> impl Strategy<Value = AgentReport> {
        (0u32..64, 0i32..16, 0i32..16, 0u16..4).prop_map(|(id, x, y, exhaustion)| AgentReport {
            exhaustion,
            ..report(id, x, y)
        })
    }

    fn arb_tile() -> impl Strategy<Value = TileType> {
        prop_oneof![
            Just(TileType::Air),
            Just(TileType::Dirt),
            Just(TileType::Stone),
            Just(TileType::Water),
            Just(TileType::Unseen),
        ]
    }

    proptest! {
        #[test]
        fn copy_round_trip_preserves_any_snapshot(
            turn_number in 0u32..10_000,
            nutrients in -500i32..50_000,
            reports in prop::collection::vec(arb_report(), 0..12),
            tiles in prop::collection::vec(arb_tile(), 0..64),
        ) {
            let food = tiles.iter().map(|tile| *tile == TileType::Air).collect();
            let snapshot = TurnSnapshot {
                turn_number,
                current_nutrients: nutrients,
                fault_count: 0,
                reports,
                observed_agents: Vec::new(),
                observed_tiles: tiles,
                tiles_with_food: food,
            };
            let handoff = ThreadSafeTurnInfo::default();
            handoff.copy_from(&snapshot);
            let mut out = TurnSnapshot::default();
            handoff.copy_to(&mut out);
            prop_assert_eq!(out, snapshot);
        }
    }
}
