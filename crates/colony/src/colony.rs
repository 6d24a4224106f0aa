use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use arena::{
    AgentId, AgentReport, AgentResult, AgentState, AgentType, DebugColor, DebugInterface,
    MatchInfo, OrderCode, PlayerInfo, TileCoords, TurnOrders, TurnSnapshot, AGENT_TYPE_COUNT,
};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::ant::{Ant, Job};
use crate::config::ClientConfig;
use crate::observed::ObservedMap;
use crate::path_requests::{GeneratePathRequest, PathChannels};
use crate::traversal::TileCosts;

const GOAL_LINE_COLOR: DebugColor = DebugColor::rgba(255, 220, 64, 200);
const DEFEND_RADIUS: u32 = 2;
const QUEEN_BIRTH_WORKER_QUOTA: u32 = 12;
const MAX_QUEENS_FOR_QUEEN_BIRTH: u32 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReportError {
    #[error("report for unknown agent {agent_id} ({result:?})")]
    UnknownAgent { agent_id: u32, result: AgentResult },
    #[error("duplicate birth report for agent {agent_id}")]
    DuplicateBirth { agent_id: u32 },
}

/// Decision-making state for one match. Owned by exactly one thread.
pub struct Colony {
    match_info: MatchInfo,
    player_info: PlayerInfo,
    config: ClientConfig,
    debug: Arc<dyn DebugInterface>,
    channels: Arc<PathChannels>,
    map: ObservedMap,
    ants: BTreeMap<AgentId, Ant>,
    population: [u32; AGENT_TYPE_COUNT],
    born: [u32; AGENT_TYPE_COUNT],
    births_ordered: u32,
    current_nutrients: i32,
    last_processed_turn: Option<u32>,
    enemy_queens: HashMap<AgentId, TileCoords>,
}

impl Colony {
    pub fn new(
        match_info: MatchInfo,
        player_info: PlayerInfo,
        config: ClientConfig,
        debug: Arc<dyn DebugInterface>,
        channels: Arc<PathChannels>,
    ) -> Self {
        Self {
            map: ObservedMap::new(match_info.map_width),
            current_nutrients: match_info.starting_nutrients,
            match_info,
            player_info,
            config,
            debug,
            channels,
            ants: BTreeMap::new(),
            population: [0; AGENT_TYPE_COUNT],
            born: [0; AGENT_TYPE_COUNT],
            births_ordered: 0,
            last_processed_turn: None,
            enemy_queens: HashMap::new(),
        }
    }

    pub fn ant(&self, id: AgentId) -> Option<&Ant> {
        self.ants.get(&id)
    }

    pub fn ant_ids(&self) -> Vec<AgentId> {
        self.ants.keys().copied().collect()
    }

    pub fn ant_count(&self) -> usize {
        self.ants.len()
    }

    pub fn population(&self, agent_type: AgentType) -> u32 {
        self.population[agent_type.index()]
    }

    pub fn total_population(&self) -> u32 {
        self.population.iter().sum()
    }

    pub fn born(&self, agent_type: AgentType) -> u32 {
        self.born[agent_type.index()]
    }

    pub fn current_nutrients(&self) -> i32 {
        self.current_nutrients
    }

    pub fn last_processed_turn(&self) -> Option<u32> {
        self.last_processed_turn
    }

    pub fn map(&self) -> &ObservedMap {
        &self.map
    }

    pub fn known_enemy_queens(&self) -> Vec<(AgentId, TileCoords)> {
        let mut queens: Vec<_> = self
            .enemy_queens
            .iter()
            .map(|(id, coords)| (*id, *coords))
            .collect();
        queens.sort();
        queens
    }

    fn multiplayer(&self) -> bool {
        self.match_info.is_multiplayer()
    }

    /// Runs one full decision cycle over `snapshot` and returns every living
    /// ant's next order.
    pub fn process_turn(&mut self, snapshot: &TurnSnapshot) -> TurnOrders {
        if let Err(err) = snapshot.validate(self.match_info.map_width) {
            warn!(turn = snapshot.turn_number, error = %err, "turn_snapshot_malformed");
            self.debug.log(&format!("malformed turn snapshot: {err}"));
        }

        self.current_nutrients = snapshot.current_nutrients;
        self.last_processed_turn = Some(snapshot.turn_number);

        self.map.merge_visible(
            snapshot.turn_number,
            &snapshot.observed_tiles,
            &snapshot.tiles_with_food,
        );
        self.merge_foreign_agents(snapshot);

        for report in snapshot.reports.iter().filter(|report| is_death_report(report)) {
            self.process_death(report);
        }
        for report in snapshot.reports.iter().filter(|report| report.result.is_birth()) {
            self.process_birth(report);
        }
        for report in snapshot
            .reports
            .iter()
            .filter(|report| !is_death_report(report) && !report.result.is_birth())
        {
            self.process_report(report);
        }

        self.drain_path_results();
        self.reassign_surplus_defenders();

        let orders = self.decide_orders(snapshot.turn_number);
        debug!(
            turn = snapshot.turn_number,
            ants = self.ants.len(),
            orders = orders.len(),
            nutrients = self.current_nutrients,
            pending_paths = self.channels.requests.len(),
            "colony_turn_processed"
        );
        orders
    }

    fn merge_foreign_agents(&mut self, snapshot: &TurnSnapshot) {
        self.map
            .merge_foreign_agents(self.player_info.player_id, &snapshot.observed_agents);

        let enemies: Vec<_> = snapshot
            .observed_agents
            .iter()
            .filter(|agent| agent.team_id != self.player_info.team_id)
            .filter(|agent| agent.agent_type == AgentType::Queen)
            .filter(|agent| agent.state != AgentState::Dead)
            .collect();

        let turn = snapshot.turn_number;
        let map = &self.map;
        self.enemy_queens.retain(|id, coords| {
            let still_there = enemies
                .iter()
                .any(|agent| agent.agent_id == *id && agent.position == *coords);
            let visible = map.tile(*coords).is_some_and(|tile| tile.is_visible_on(turn));
            still_there || !visible
        });
        for agent in enemies {
            if self.enemy_queens.insert(agent.agent_id, agent.position).is_none() {
                info!(agent_id = agent.agent_id.0, position = %agent.position, "enemy_queen_spotted");
            }
        }
    }

    fn report_error(&self, err: ReportError) {
        error!(error = %err, "agent_report_rejected");
        self.debug.log(&err.to_string());
    }

    fn process_death(&mut self, report: &AgentReport) {
        let Some(ant) = self.ants.remove(&report.agent_id) else {
            self.report_error(ReportError::UnknownAgent {
                agent_id: report.agent_id.0,
                result: report.result,
            });
            return;
        };
        let slot = &mut self.population[ant.agent_type.index()];
        *slot = slot.saturating_sub(1);
        self.map.release_all_claims(ant.id);
        debug!(agent_id = ant.id.0, result = ?report.result, "ant_died");
    }

    fn process_birth(&mut self, report: &AgentReport) {
        if self.ants.contains_key(&report.agent_id) {
            self.report_error(ReportError::DuplicateBirth {
                agent_id: report.agent_id.0,
            });
            return;
        }
        let index = report.agent_type.index();
        self.population[index] += 1;
        self.born[index] += 1;
        let job = Job::for_birth(report.agent_type, self.born(AgentType::Queen));
        let ant = Ant::new(
            report,
            job,
            self.config.visited_history_len,
            self.config.abandoned_goal_memory,
        );
        debug!(
            agent_id = report.agent_id.0,
            agent_type = ?report.agent_type,
            job = ?job,
            position = %report.position,
            "ant_born"
        );
        self.ants.insert(report.agent_id, ant);
    }

    fn own_queen_positions(&self) -> Vec<TileCoords> {
        self.ants
            .values()
            .filter(|ant| ant.agent_type == AgentType::Queen)
            .map(|ant| ant.position)
            .collect()
    }

    fn process_report(&mut self, report: &AgentReport) {
        let queens = self.own_queen_positions();
        let Some(ant) = self.ants.get_mut(&report.agent_id) else {
            self.report_error(ReportError::UnknownAgent {
                agent_id: report.agent_id.0,
                result: report.result,
            });
            return;
        };
        ant.apply_report(report);

        match report.result {
            AgentResult::OrderSuccessPickUp => {
                if let Some(goal) = ant.clear_goal() {
                    self.map.release_claim(goal, ant.id);
                }
                if ant.agent_type != AgentType::Queen {
                    if let Some(queen) = nearest(ant.position, &queens) {
                        ant.set_goal(queen);
                    }
                }
            }
            AgentResult::OrderSuccessDropped => {
                ant.clear_goal();
                if !queens.contains(&report.position) {
                    self.map.set_food(report.position, true);
                }
            }
            AgentResult::OrderErrorNoFoodPresent => {
                self.map.set_food(report.position, false);
                ant.clear_goal();
            }
            AgentResult::OrderErrorMoveBlockedByTile
            | AgentResult::OrderErrorMoveBlockedByQueen
            | AgentResult::OrderErrorOutOfBounds => {
                ant.clear_path();
            }
            _ => {}
        }
    }

    fn drain_path_results(&mut self) {
        while let Some(result) = self.channels.results.pop() {
            let Some(ant) = self.ants.get_mut(&result.agent_id) else {
                debug!(agent_id = result.agent_id.0, "path_result_for_departed_agent");
                continue;
            };
            if let Some(abandoned) = ant.attach_path(result.goal, result.path) {
                self.map.release_claim(abandoned, ant.id);
                debug!(agent_id = ant.id.0, goal = %abandoned, "path_goal_abandoned");
            }
        }
    }

    fn reassign_surplus_defenders(&mut self) {
        if self.enemy_queens.is_empty() {
            return;
        }
        let defenders: Vec<AgentId> = self
            .ants
            .values()
            .filter(|ant| ant.job == Job::DefendQueen)
            .map(|ant| ant.id)
            .collect();
        let surplus = defenders
            .len()
            .saturating_sub(self.config.min_defenders as usize);
        for id in defenders.iter().rev().take(surplus) {
            if let Some(ant) = self.ants.get_mut(id) {
                ant.job = Job::AttackQueen;
                ant.clear_goal();
                info!(agent_id = id.0, "defender_reassigned_to_attack");
            }
        }
    }

    fn decide_orders(&mut self, turn: u32) -> TurnOrders {
        let mut orders = TurnOrders::default();
        let mut budget = BirthBudget {
            nutrients: self.current_nutrients,
            population: self.total_population(),
        };
        let ids = self.ant_ids();
        for id in ids {
            let Some(mut ant) = self.ants.remove(&id) else {
                continue;
            };
            let order = self.decide(&mut ant, &mut budget);
            ant.next_order = order;
            if let Some(goal) = ant.goal {
                self.debug.queue_line(ant.position, goal, GOAL_LINE_COLOR);
            }
            if !orders.push(id, order) {
                warn!(turn, agent_id = id.0, "turn_orders_full");
            }
            self.ants.insert(id, ant);
        }
        self.debug.flush_queued_draws();
        orders
    }

    fn decide(&mut self, ant: &mut Ant, budget: &mut BirthBudget) -> OrderCode {
        if ant.exhaustion > 0 {
            return OrderCode::Hold;
        }
        if ant.agent_type == AgentType::Queen && !ant.is_carrying_food() {
            if let Some(order) = self.try_birth(budget) {
                return order;
            }
        }
        match ant.job {
            Job::StationaryQueen => {
                if ant.is_carrying_food() {
                    OrderCode::DropCarriedObject
                } else {
                    OrderCode::Hold
                }
            }
            Job::CollectFood => self.collect_food(ant),
            Job::DefendQueen => self.defend_queen(ant),
            Job::AttackQueen => self.attack_queen(ant),
            Job::Scout => self.scout(ant),
        }
    }

    fn choose_birth_type(&self) -> AgentType {
        let ordinal = self.births_ordered + 1;
        if ordinal % 4 == 0 {
            AgentType::Soldier
        } else if ordinal % 7 == 0 {
            AgentType::Scout
        } else if self.population(AgentType::Worker) >= QUEEN_BIRTH_WORKER_QUOTA
            && self.population(AgentType::Queen) < MAX_QUEENS_FOR_QUEEN_BIRTH
        {
            AgentType::Queen
        } else {
            AgentType::Worker
        }
    }

    fn try_birth(&mut self, budget: &mut BirthBudget) -> Option<OrderCode> {
        if budget.population >= self.match_info.max_population {
            return None;
        }
        let agent_type = self.choose_birth_type();
        let cost = self.match_info.birth_costs.for_type(agent_type);
        if budget.nutrients < cost + self.config.birth_reserve_nutrients {
            return None;
        }
        budget.nutrients -= cost;
        budget.population += 1;
        self.births_ordered += 1;
        Some(agent_type.birth_order())
    }

    fn collect_food(&mut self, ant: &mut Ant) -> OrderCode {
        if ant.is_carrying_food() {
            if ant.agent_type == AgentType::Queen {
                return OrderCode::DropCarriedObject;
            }
            let queens = self.own_queen_positions();
            if queens.contains(&ant.position) {
                ant.clear_goal();
                return OrderCode::DropCarriedObject;
            }
            let Some(queen) = nearest(ant.position, &queens) else {
                return OrderCode::Hold;
            };
            if !ant.goal.is_some_and(|goal| queens.contains(&goal)) {
                ant.set_goal(queen);
            }
            return self.follow_path(ant);
        }

        if ant.recently_damaged {
            if let Some(abandoned) = ant.abandon_goal() {
                self.map.release_claim(abandoned, ant.id);
                debug!(agent_id = ant.id.0, goal = %abandoned, "damaged_forager_dropped_goal");
            }
        }

        if let Some(goal) = ant.goal {
            let food_remembered = self.map.tile(goal).is_some_and(|tile| tile.has_food);
            if !food_remembered {
                ant.clear_goal();
                self.map.release_claim(goal, ant.id);
            } else if ant.position == goal {
                return OrderCode::PickUpFood;
            } else {
                return self.follow_path(ant);
            }
        }

        let food = self
            .map
            .nearest_unclaimed_food(ant.position, ant.id, ant.abandoned_goals());
        if let Some(food) = food {
            self.map.claim(food, ant.id);
            ant.set_goal(food);
            if ant.position == food {
                return OrderCode::PickUpFood;
            }
            return self.follow_path(ant);
        }

        if ant.agent_type == AgentType::Queen {
            return OrderCode::Hold;
        }
        self.explore(ant)
    }

    fn defend_queen(&mut self, ant: &mut Ant) -> OrderCode {
        let queens = self.own_queen_positions();
        let Some(queen) = nearest(ant.position, &queens) else {
            return OrderCode::Hold;
        };
        if ant.position.taxicab_distance(queen) <= DEFEND_RADIUS {
            ant.clear_goal();
            return OrderCode::Hold;
        }
        ant.set_goal(queen);
        self.direct_move(ant, queen)
    }

    fn attack_queen(&mut self, ant: &mut Ant) -> OrderCode {
        let targets: Vec<TileCoords> = self.enemy_queens.values().copied().collect();
        let Some(target) = nearest(ant.position, &targets) else {
            ant.job = Job::DefendQueen;
            ant.clear_goal();
            return self.defend_queen(ant);
        };
        if ant.position == target {
            return OrderCode::Hold;
        }
        if ant.goal != Some(target) {
            ant.set_goal(target);
        }
        self.follow_path(ant)
    }

    fn scout(&mut self, ant: &mut Ant) -> OrderCode {
        if ant.goal.is_some_and(|goal| {
            ant.position == goal || self.map.tile(goal).is_some_and(|tile| tile.last_seen_turn.is_some())
        }) {
            ant.clear_goal();
        }
        self.explore(ant)
    }

    fn explore(&mut self, ant: &mut Ant) -> OrderCode {
        let goal = match ant.goal {
            Some(goal) => goal,
            None => {
                let Some(goal) = self
                    .map
                    .nearest_unexplored(ant.position, ant.abandoned_goals())
                else {
                    return OrderCode::Hold;
                };
                ant.set_goal(goal);
                goal
            }
        };
        self.direct_move(ant, goal)
    }

    fn direct_move(&mut self, ant: &mut Ant, goal: TileCoords) -> OrderCode {
        if ant.position == goal {
            return OrderCode::Hold;
        }
        match ant.direct_step(goal, &self.map, self.multiplayer()) {
            Some(direction) => OrderCode::move_toward(direction),
            None => {
                if let Some(abandoned) = ant.abandon_goal() {
                    self.map.release_claim(abandoned, ant.id);
                }
                OrderCode::Hold
            }
        }
    }

    fn follow_path(&mut self, ant: &mut Ant) -> OrderCode {
        if ant.waiting_on_path {
            return OrderCode::Hold;
        }
        if let Some(direction) = ant.next_path_step() {
            return OrderCode::move_toward(direction);
        }
        let Some(goal) = ant.goal else {
            return OrderCode::Hold;
        };
        self.request_path(ant, goal);
        OrderCode::Hold
    }

    fn request_path(&mut self, ant: &mut Ant, goal: TileCoords) {
        let request = GeneratePathRequest {
            agent_id: ant.id,
            start: ant.position,
            goal,
            tiles: self.map.tile_types(),
            costs: TileCosts::for_agent(ant.agent_type, self.multiplayer()),
            map_width: self.match_info.map_width,
        };
        self.channels.requests.push(request);
        ant.waiting_on_path = true;
        debug!(agent_id = ant.id.0, start = %ant.position, goal = %goal, "path_requested");
    }
}

struct BirthBudget {
    nutrients: i32,
    population: u32,
}

fn is_death_report(report: &AgentReport) -> bool {
    report.result.is_death() || report.state == AgentState::Dead
}

fn nearest(from: TileCoords, candidates: &[TileCoords]) -> Option<TileCoords> {
    candidates
        .iter()
        .copied()
        .min_by_key(|coords| (from.taxicab_distance(*coords), coords.y, coords.x))
}
