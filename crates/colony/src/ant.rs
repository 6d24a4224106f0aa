use arena::{
    AgentId, AgentReport, AgentResult, AgentState, AgentType, Direction, OrderCode, TileCoords,
};

use crate::observed::ObservedMap;

pub const UNSAFE_STEP_PENALTY: i32 = 1000;
pub const REPEAT_VISIT_PENALTY: i32 = 4;
/// Direct stepping gives up once even the best candidate weighs this much.
pub const ABANDON_WEIGHT_THRESHOLD: i32 = UNSAFE_STEP_PENALTY / 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Job {
    CollectFood,
    StationaryQueen,
    DefendQueen,
    AttackQueen,
    Scout,
}

impl Job {
    /// `queens_born` includes the queen being assigned.
    pub fn for_birth(agent_type: AgentType, queens_born: u32) -> Job {
        match agent_type {
            AgentType::Queen if queens_born % 2 == 1 => Job::StationaryQueen,
            AgentType::Queen | AgentType::Worker => Job::CollectFood,
            AgentType::Soldier => Job::DefendQueen,
            AgentType::Scout => Job::Scout,
        }
    }
}

/// Colony-side memory of one living agent.
#[derive(Debug, Clone)]
pub struct Ant {
    pub id: AgentId,
    pub agent_type: AgentType,
    pub position: TileCoords,
    pub goal: Option<TileCoords>,
    pub next_order: OrderCode,
    pub last_result: AgentResult,
    pub state: AgentState,
    pub exhaustion: u16,
    pub job: Job,
    pub waiting_on_path: bool,
    pub recently_damaged: bool,
    path: Vec<TileCoords>,
    visited: Vec<TileCoords>,
    visited_capacity: usize,
    abandoned_goals: Vec<TileCoords>,
    abandoned_capacity: usize,
}

impl Ant {
    pub fn new(
        report: &AgentReport,
        job: Job,
        visited_capacity: usize,
        abandoned_capacity: usize,
    ) -> Self {
        let mut ant = Self {
            id: report.agent_id,
            agent_type: report.agent_type,
            position: report.position,
            goal: None,
            next_order: OrderCode::Hold,
            last_result: report.result,
            state: report.state,
            exhaustion: report.exhaustion,
            job,
            waiting_on_path: false,
            recently_damaged: false,
            path: Vec::new(),
            visited: Vec::new(),
            visited_capacity,
            abandoned_goals: Vec::new(),
            abandoned_capacity,
        };
        ant.record_visit(report.position);
        ant
    }

    pub fn apply_report(&mut self, report: &AgentReport) {
        if report.position != self.position {
            self.record_visit(report.position);
        }
        self.position = report.position;
        self.state = report.state;
        self.exhaustion = report.exhaustion;
        self.last_result = report.result;
        self.recently_damaged = report.received_combat_damage || report.received_suffocation_damage;
    }

    fn record_visit(&mut self, coords: TileCoords) {
        if self.visited_capacity == 0 {
            return;
        }
        if self.visited.len() == self.visited_capacity {
            self.visited.remove(0);
        }
        self.visited.push(coords);
    }

    pub fn visit_count(&self, coords: TileCoords) -> usize {
        self.visited.iter().filter(|visited| **visited == coords).count()
    }

    pub fn is_carrying_food(&self) -> bool {
        self.state == AgentState::HoldingFood
    }

    /// Switches to a new goal; any path to the old one is dropped.
    pub fn set_goal(&mut self, goal: TileCoords) {
        if self.goal != Some(goal) {
            self.path.clear();
        }
        self.goal = Some(goal);
    }

    pub fn clear_goal(&mut self) -> Option<TileCoords> {
        self.path.clear();
        self.goal.take()
    }

    /// Drops the current goal and remembers it so it is not picked again soon.
    pub fn abandon_goal(&mut self) -> Option<TileCoords> {
        let goal = self.clear_goal()?;
        if self.abandoned_capacity > 0 {
            if self.abandoned_goals.len() == self.abandoned_capacity {
                self.abandoned_goals.remove(0);
            }
            self.abandoned_goals.push(goal);
        }
        Some(goal)
    }

    pub fn abandoned_goals(&self) -> &[TileCoords] {
        &self.abandoned_goals
    }

    pub fn path(&self) -> &[TileCoords] {
        &self.path
    }

    pub fn clear_path(&mut self) {
        self.path.clear();
    }

    /// Takes a worker's answer for `goal`. Returns the goal that was abandoned
    /// when the path turned out unusable, empty paths included.
    pub fn attach_path(&mut self, goal: TileCoords, path: Vec<TileCoords>) -> Option<TileCoords> {
        self.waiting_on_path = false;
        if self.goal != Some(goal) {
            return None;
        }
        if path.len() < 2 {
            return self.abandon_goal();
        }
        self.abandoned_goals.clear();
        self.path = path;
        None
    }

    /// Next step along the stored path. Entries already reached are
    /// discarded; a step that is not adjacent invalidates the path.
    pub fn next_path_step(&mut self) -> Option<Direction> {
        while self.path.last() == Some(&self.position) {
            self.path.pop();
        }
        let next = *self.path.last()?;
        let direction = Direction::between(self.position, next);
        if direction.is_none() {
            self.path.clear();
        }
        direction
    }

    /// Weight of stepping once in `direction` toward `goal`; lower is better.
    pub fn direct_step_weight(
        &self,
        direction: Direction,
        goal: TileCoords,
        map: &ObservedMap,
        multiplayer: bool,
    ) -> i32 {
        let destination = self.position.step(direction);
        let before = self.position.taxicab_distance(goal) as i32;
        let after = destination.taxicab_distance(goal) as i32;
        let mut weight = after - before;
        if !map.is_tile_safe_for(self.agent_type, destination, multiplayer) {
            weight += UNSAFE_STEP_PENALTY;
        }
        weight + REPEAT_VISIT_PENALTY * self.visit_count(destination) as i32
    }

    /// Picks the lightest cardinal step toward `goal`, or `None` when every
    /// candidate is at or above the abandon threshold.
    pub fn direct_step(
        &self,
        goal: TileCoords,
        map: &ObservedMap,
        multiplayer: bool,
    ) -> Option<Direction> {
        let (direction, weight) = Direction::ALL
            .into_iter()
            .map(|direction| {
                let weight = self.direct_step_weight(direction, goal, map, multiplayer);
                (direction, weight)
            })
            .min_by_key(|(_, weight)| *weight)?;
        (weight < ABANDON_WEIGHT_THRESHOLD).then_some(direction)
    }
}
