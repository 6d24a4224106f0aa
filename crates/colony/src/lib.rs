//! Colony client for AntArena: turn-by-turn decision making over a fogged
//! grid, with route planning pushed to worker threads.

pub mod ant;
pub mod app;
pub mod client;
pub mod colony;
pub mod config;
pub mod observed;
pub mod path_generator;
pub mod path_requests;
pub mod traversal;

pub use ant::{Ant, Job};
pub use client::{ArenaClient, MatchContext};
pub use colony::{Colony, ReportError};
pub use config::{ClientConfig, ConfigError};
pub use observed::{ObservedMap, ObservedTile};
pub use path_generator::generate_path;
pub use path_requests::{GeneratePathRequest, PathChannels, PathResult};
pub use traversal::{is_tile_type_safe, TileCosts};
