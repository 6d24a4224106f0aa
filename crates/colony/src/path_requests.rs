use arena::{AgentId, SynchronizedQueue, TileCoords, TileType};
use tracing::debug;

use crate::path_generator::generate_path;
use crate::traversal::TileCosts;

/// Everything a worker needs to plan one route without touching colony state.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratePathRequest {
    pub agent_id: AgentId,
    pub start: TileCoords,
    pub goal: TileCoords,
    pub tiles: Vec<TileType>,
    pub costs: TileCosts,
    pub map_width: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathResult {
    pub agent_id: AgentId,
    /// The goal the path was requested for, so empty results can be matched.
    pub goal: TileCoords,
    /// Goal-to-start; fewer than two entries means unreachable.
    pub path: Vec<TileCoords>,
}

impl PathResult {
    pub fn is_usable(&self) -> bool {
        self.path.len() >= 2
    }
}

impl GeneratePathRequest {
    pub fn solve(&self) -> PathResult {
        let path = generate_path(
            self.start,
            self.goal,
            &self.costs,
            &self.tiles,
            self.map_width,
        );
        PathResult {
            agent_id: self.agent_id,
            goal: self.goal,
            path,
        }
    }
}

#[derive(Debug, Default)]
pub struct PathChannels {
    pub requests: SynchronizedQueue<GeneratePathRequest>,
    pub results: SynchronizedQueue<PathResult>,
}

impl PathChannels {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pops one request, if any, and pushes its result. Returns whether work was done.
    pub fn service_one(&self) -> bool {
        let Some(request) = self.requests.pop() else {
            return false;
        };
        let result = request.solve();
        debug!(
            agent_id = request.agent_id.0,
            start = %request.start,
            goal = %request.goal,
            path_len = result.path.len(),
            "path_request_serviced"
        );
        self.results.push(result);
        true
    }
}
