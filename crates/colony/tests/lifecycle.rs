use std::collections::BTreeSet;
use std::sync::Arc;

use arena::{
    map_area, AgentId, AgentReport, AgentResult, AgentState, AgentType, CapturingDebugInterface,
    MatchInfo, PlayerId, PlayerInfo, TileCoords, TileType, TurnSnapshot,
};
use colony::{ClientConfig, Colony, PathChannels};
use proptest::prelude::*;

const WIDTH: i32 = 6;

#[derive(Debug, Clone, Copy)]
enum Event {
    Born(u32, AgentType),
    Died(u32),
}

fn arb_agent_type() -> impl Strategy<Value = AgentType> {
    prop_oneof![
        Just(AgentType::Worker),
        Just(AgentType::Soldier),
        Just(AgentType::Queen),
        Just(AgentType::Scout),
    ]
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        (0u32..8, arb_agent_type()).prop_map(|(id, agent_type)| Event::Born(id, agent_type)),
        (0u32..8).prop_map(Event::Died),
    ]
}

fn report(id: u32, agent_type: AgentType, result: AgentResult) -> AgentReport {
    AgentReport {
        agent_id: AgentId(id),
        position: TileCoords::new((id % 6) as i32, 0),
        exhaustion: 1,
        received_combat_damage: false,
        received_suffocation_damage: false,
        agent_type,
        state: AgentState::Normal,
        result,
    }
}

fn new_colony(debug: Arc<CapturingDebugInterface>) -> Colony {
    Colony::new(
        MatchInfo {
            map_width: WIDTH,
            starting_nutrients: 0,
            ..MatchInfo::default()
        },
        PlayerInfo {
            player_id: PlayerId(0),
            team_id: 0,
        },
        ClientConfig::default(),
        debug,
        Arc::new(PathChannels::new()),
    )
}

proptest! {
    #[test]
    fn exactly_one_ant_per_living_agent(turns in prop::collection::vec(
        prop::collection::vec(arb_event(), 0..4),
        1..20,
    )) {
        let debug = Arc::new(CapturingDebugInterface::default());
        let mut colony = new_colony(debug.clone());
        let mut living = std::collections::BTreeMap::new();
        let mut expected_errors = 0usize;

        for (index, events) in turns.iter().enumerate() {
            let mut reports = Vec::new();
            let mut reported = BTreeSet::new();
            for event in events {
                let id = match event {
                    Event::Born(id, _) | Event::Died(id) => *id,
                };
                // The host reports each agent at most once per turn.
                if !reported.insert(id) {
                    continue;
                }
                match *event {
                    Event::Born(id, agent_type) => {
                        if living.contains_key(&id) {
                            expected_errors += 1;
                        } else {
                            living.insert(id, agent_type);
                        }
                        reports.push(report(id, agent_type, AgentResult::WasCreated));
                    }
                    Event::Died(id) => {
                        let agent_type = match living.remove(&id) {
                            Some(agent_type) => agent_type,
                            None => {
                                expected_errors += 1;
                                AgentType::Worker
                            }
                        };
                        reports.push(report(id, agent_type, AgentResult::KilledByEnemy));
                    }
                }
            }

            colony.process_turn(&TurnSnapshot {
                turn_number: index as u32 + 1,
                reports,
                observed_tiles: vec![TileType::Air; map_area(WIDTH)],
                tiles_with_food: vec![false; map_area(WIDTH)],
                ..TurnSnapshot::default()
            });

            let expected: Vec<AgentId> = living.keys().map(|id| AgentId(*id)).collect();
            prop_assert_eq!(colony.ant_ids(), expected);
            for agent_type in AgentType::ALL {
                let count = living.values().filter(|kind| **kind == agent_type).count() as u32;
                prop_assert_eq!(colony.population(agent_type), count);
            }
        }
        prop_assert_eq!(debug.log_count(), expected_errors);
    }
}
