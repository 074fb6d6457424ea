use std::time::{Duration, Instant};

use serde::Serialize;

use crate::render::render_chat_text;
use crate::types::History;

/// One displayed (user, bot) message pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Turn {
    /// The submitted text after the chat rendering transform
    pub user: String,
    /// Raw response text; empty while generation is in flight
    pub bot: String,
}

/// Per-browser chat state
#[derive(Debug)]
pub struct ChatSession {
    turns: Vec<Turn>,
    turn_ids: Vec<u64>,
    next_id: u64,
    history: History,
    epoch: u64,
    last_seen: Instant,
}

/// A turn waiting on the backend
#[derive(Debug, Clone)]
pub struct PendingTurn {
    pub input: String,
    pub history: History,
    id: u64,
    epoch: u64,
}

impl ChatSession {
    pub fn new() -> Self {
        Self {
            turns: Vec::new(),
            turn_ids: Vec::new(),
            next_id: 0,
            history: History::new(),
            epoch: 0,
            last_seen: Instant::now(),
        }
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Mark the session as used by its browser.
    pub fn touch(&mut self) {
        self.last_seen = Instant::now();
    }

    pub fn idle_for(&self) -> Duration {
        self.last_seen.elapsed()
    }

    /// Show the rendered input with an empty bot half and snapshot the history.
    pub fn begin_turn(&mut self, input: &str) -> PendingTurn {
        self.touch();
        self.turns.push(Turn {
            user: render_chat_text(input),
            bot: String::new(),
        });
        let id = self.next_id;
        self.next_id += 1;
        self.turn_ids.push(id);
        PendingTurn {
            input: input.to_string(),
            history: self.history.clone(),
            id,
            epoch: self.epoch,
        }
    }

    /// Fill in the response. Returns false when a clear happened in between,
    /// in which case the response is dropped.
    pub fn complete_turn(&mut self, pending: PendingTurn, response: String) -> bool {
        if pending.epoch != self.epoch {
            return false;
        }
        let Some(index) = self.position(pending.id) else {
            return false;
        };
        self.touch();
        self.turns[index].bot = response.clone();
        self.history.push(pending.input, response);
        true
    }

    /// Remove the placeholder of a failed turn.
    pub fn abort_turn(&mut self, pending: &PendingTurn) {
        if pending.epoch != self.epoch {
            return;
        }
        if let Some(index) = self.position(pending.id) {
            self.turns.remove(index);
            self.turn_ids.remove(index);
        }
    }

    pub fn clear(&mut self) {
        self.touch();
        self.turns.clear();
        self.turn_ids.clear();
        self.history.clear();
        self.epoch += 1;
    }

    fn position(&self, id: u64) -> Option<usize> {
        self.turn_ids.iter().position(|&turn_id| turn_id == id)
    }
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}
