use arena::{map_area, Direction, TileCoords, TileType};

use crate::traversal::TileCosts;

#[derive(Debug, Clone, Copy)]
struct PathNode {
    coords: TileCoords,
    g_total: u32,
    h: u32,
    list_index: usize,
    from_index: Option<usize>,
    closed: bool,
}

impl PathNode {
    fn f_total(&self) -> u32 {
        self.g_total.saturating_add(self.h)
    }
}

/// A* over a square tile snapshot.
///
/// The returned path runs goal-to-start, both ends included, so callers pop
/// from the back to advance. An empty path means no route was found or the
/// node list grew past half the map area; the list keeps expanded nodes, so
/// long detours on small maps fail even when a route exists. Unseen tiles and
/// tiles whose cost is `None` are never entered.
///
/// Neighbours are tried East, West, North, South, and the search stops at the
/// first neighbour that is the goal. With step costs of at least one a
/// returned path is cost-optimal; cheaper-than-one tiles can make it settle for a
/// costlier route.
pub fn generate_path(
    start: TileCoords,
    goal: TileCoords,
    costs: &TileCosts,
    tiles: &[TileType],
    map_width: i32,
) -> Vec<TileCoords> {
    let area = map_area(map_width);
    if tiles.len() != area || !start.is_in_bounds(map_width) || !goal.is_in_bounds(map_width) {
        return Vec::new();
    }
    if start == goal {
        return vec![goal];
    }

    let runaway_limit = area / 2;
    let mut nodes = vec![PathNode {
        coords: start,
        g_total: 0,
        h: start.taxicab_distance(goal),
        list_index: 0,
        from_index: None,
        closed: false,
    }];

    while let Some(current_index) = pick_best_open_node_index(&nodes) {
        nodes[current_index].closed = true;
        let current = nodes[current_index];

        for direction in Direction::ALL {
            let neighbor = current.coords.step(direction);
            let Some(step_cost) = step_cost(neighbor, costs, tiles, map_width) else {
                continue;
            };
            let g_total = current.g_total.saturating_add(step_cost);

            if neighbor == goal {
                let goal_index = nodes.len();
                nodes.push(PathNode {
                    coords: goal,
                    g_total,
                    h: 0,
                    list_index: goal_index,
                    from_index: Some(current_index),
                    closed: true,
                });
                return reconstruct_path(&nodes, goal_index);
            }

            match nodes.iter().position(|node| node.coords == neighbor) {
                Some(existing) => {
                    let node = &mut nodes[existing];
                    if g_total < node.g_total {
                        node.g_total = g_total;
                        node.from_index = Some(current_index);
                    }
                }
                None => {
                    let list_index = nodes.len();
                    nodes.push(PathNode {
                        coords: neighbor,
                        g_total,
                        h: neighbor.taxicab_distance(goal),
                        list_index,
                        from_index: Some(current_index),
                        closed: false,
                    });
                }
            }
        }

        if nodes.len() > runaway_limit {
            return Vec::new();
        }
    }

    Vec::new()
}

fn step_cost(
    coords: TileCoords,
    costs: &TileCosts,
    tiles: &[TileType],
    map_width: i32,
) -> Option<u32> {
    let index = coords.tile_index(map_width)?;
    let tile = *tiles.get(index)?;
    if tile == TileType::Unseen {
        return None;
    }
    costs.cost(tile)
}

fn pick_best_open_node_index(nodes: &[PathNode]) -> Option<usize> {
    nodes
        .iter()
        .filter(|node| !node.closed)
        .min_by_key(|node| open_node_order_key(node))
        .map(|node| node.list_index)
}

fn open_node_order_key(node: &PathNode) -> (u32, u32, usize) {
    (node.f_total(), node.h, node.list_index)
}

fn reconstruct_path(nodes: &[PathNode], goal_index: usize) -> Vec<TileCoords> {
    let mut path = Vec::new();
    let mut cursor = Some(goal_index);
    while let Some(index) = cursor {
        if path.len() > nodes.len() {
            return Vec::new();
        }
        let node = nodes[index];
        path.push(node.coords);
        cursor = node.from_index;
    }
    path
}
