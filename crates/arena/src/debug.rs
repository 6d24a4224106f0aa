use std::sync::{Mutex, MutexGuard};

use tracing::{debug, info};

use crate::coords::TileCoords;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebugColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl DebugColor {
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DebugDraw {
    Line {
        from: TileCoords,
        to: TileCoords,
        color: DebugColor,
    },
    WorldText {
        at: TileCoords,
        text: String,
        color: DebugColor,
    },
}

/// Logging and visualization services the host lends to a player.
///
/// Draw primitives are only queued until `flush_queued_draws`; hosts present
/// everything queued since the previous flush as one batch.
pub trait DebugInterface: Send + Sync {
    fn log(&self, message: &str);

    fn queue_line(&self, _from: TileCoords, _to: TileCoords, _color: DebugColor) {}

    fn queue_text(&self, _at: TileCoords, _text: &str, _color: DebugColor) {}

    fn flush_queued_draws(&self) {}

    fn is_key_down(&self, _key: u8) -> bool {
        false
    }

    fn mouse_world_position(&self) -> Option<(f32, f32)> {
        None
    }
}

fn lock_recovered<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Forwards host log lines to `tracing`, for hosts without their own console.
#[derive(Debug, Default)]
pub struct TracingDebugInterface {
    queued: Mutex<Vec<DebugDraw>>,
}

impl DebugInterface for TracingDebugInterface {
    fn log(&self, message: &str) {
        info!(target: "arena_debug", text = message, "player_log");
    }

    fn queue_line(&self, from: TileCoords, to: TileCoords, color: DebugColor) {
        lock_recovered(&self.queued).push(DebugDraw::Line { from, to, color });
    }

    fn queue_text(&self, at: TileCoords, text: &str, color: DebugColor) {
        lock_recovered(&self.queued).push(DebugDraw::WorldText {
            at,
            text: text.to_string(),
            color,
        });
    }

    fn flush_queued_draws(&self) {
        let flushed = std::mem::take(&mut *lock_recovered(&self.queued));
        if !flushed.is_empty() {
            debug!(target: "arena_debug", draw_count = flushed.len(), "debug_draws_flushed");
        }
    }
}

/// Records everything it receives; intended for tests and replay tooling.
#[derive(Debug, Default)]
pub struct CapturingDebugInterface {
    lines: Mutex<Vec<String>>,
    queued: Mutex<Vec<DebugDraw>>,
    flushed: Mutex<Vec<Vec<DebugDraw>>>,
}

impl CapturingDebugInterface {
    pub fn log_lines(&self) -> Vec<String> {
        lock_recovered(&self.lines).clone()
    }

    pub fn log_count(&self) -> usize {
        lock_recovered(&self.lines).len()
    }

    pub fn flushed_batches(&self) -> Vec<Vec<DebugDraw>> {
        lock_recovered(&self.flushed).clone()
    }
}

impl DebugInterface for CapturingDebugInterface {
    fn log(&self, message: &str) {
        lock_recovered(&self.lines).push(message.to_string());
    }

    fn queue_line(&self, from: TileCoords, to: TileCoords, color: DebugColor) {
        lock_recovered(&self.queued).push(DebugDraw::Line { from, to, color });
    }

    fn queue_text(&self, at: TileCoords, text: &str, color: DebugColor) {
        lock_recovered(&self.queued).push(DebugDraw::WorldText {
            at,
            text: text.to_string(),
            color,
        });
    }

    fn flush_queued_draws(&self) {
        let batch = std::mem::take(&mut *lock_recovered(&self.queued));
        lock_recovered(&self.flushed).push(batch);
    }
}
