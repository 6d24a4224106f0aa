//! Host-facing contracts for AntArena players: the turn protocol, grid
//! coordinates, and the thread-safe primitives used to move turn data between
//! the host's callback threads and a player's own threads.

use std::sync::Arc;

mod coords;
mod debug;
mod handoff;
mod protocol;
mod queue;

pub use coords::{Direction, TileCoords};
pub use debug::{
    CapturingDebugInterface, DebugColor, DebugDraw, DebugInterface, TracingDebugInterface,
};
pub use handoff::{
    HandOff, ThreadSafeTurnInfo, ThreadSafeTurnOrders, ThreadSafeTurnStatus, TurnStatus,
};
pub use protocol::{
    map_area, AgentId, AgentOrder, AgentReport, AgentResult, AgentState, AgentType, BirthCosts,
    MatchInfo, ObservedAgent, OrderCode, PlayerId, PlayerInfo, SnapshotError, TileType,
    TurnOrders, TurnSnapshot, AGENT_TYPE_COUNT, INTERFACE_VERSION, MAX_ARENA_WIDTH,
    MAX_OBSERVED_AGENTS, MAX_ORDERS_PER_PLAYER, MAX_REPORTS_PER_PLAYER, TILE_TYPE_COUNT,
};
pub use queue::SynchronizedQueue;

/// Entry points a host calls on a player. Every method may be invoked from a
/// host-owned thread; implementations must never block for long.
pub trait ArenaPlayer: Send + Sync {
    fn interface_version(&self) -> u32 {
        INTERFACE_VERSION
    }

    fn player_name(&self) -> &str;

    fn author_name(&self) -> &str;

    fn pre_game_startup(
        &self,
        match_info: MatchInfo,
        player_info: PlayerInfo,
        debug: Arc<dyn DebugInterface>,
    );

    fn post_game_shutdown(&self);

    /// Called once on every thread the host lends to this player; returns
    /// when the match shuts down.
    fn thread_entry(&self, thread_index: usize);

    fn receive_turn_state(&self, snapshot: &TurnSnapshot);

    /// `None` means the orders for the current turn are not ready yet.
    fn turn_order_request(&self) -> Option<TurnOrders>;
}
