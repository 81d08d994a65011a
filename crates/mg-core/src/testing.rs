//! In-process storage double for tests.
//!
//! Compiled for this crate's tests and behind the `testing` feature for
//! downstream crates.

use std::collections::HashMap;

use crate::store::{KeyValueStore, SessionLog, StoreError};

/// A recorded session in [`MemoryStore`].
#[derive(Debug, Clone, PartialEq)]
pub struct LoggedSession {
    pub game_name: String,
    pub duration_minutes: f64,
}

/// In-process store implementing both seams, with switchable write failures.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    pub values: HashMap<String, String>,
    pub sessions: Vec<LoggedSession>,
    /// When set, `set_value` fails.
    pub fail_writes: bool,
    /// When set, `add_session` fails for this game.
    pub fail_appends_for: Option<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total logged minutes for a game.
    pub fn minutes_for(&self, game_name: &str) -> f64 {
        self.sessions
            .iter()
            .filter(|s| s.game_name == game_name)
            .map(|s| s.duration_minutes)
            .sum()
    }
}

impl SessionLog for MemoryStore {
    fn add_session(&mut self, game_name: &str, duration_minutes: f64) -> Result<(), StoreError> {
        if self.fail_appends_for.as_deref() == Some(game_name) {
            return Err(StoreError::Backend(format!("append rejected for {game_name}")));
        }
        self.sessions.push(LoggedSession {
            game_name: game_name.to_string(),
            duration_minutes,
        });
        Ok(())
    }

    fn remove_sessions_for_game(&mut self, game_name: &str) -> Result<usize, StoreError> {
        let before = self.sessions.len();
        self.sessions.retain(|s| s.game_name != game_name);
        Ok(before - self.sessions.len())
    }
}

impl KeyValueStore for MemoryStore {
    fn get_value(&mut self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.values.get(key).cloned())
    }

    fn set_value(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(StoreError::Backend(format!("write rejected for {key}")));
        }
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_value(&mut self, key: &str) -> Result<(), StoreError> {
        self.values.remove(key);
        Ok(())
    }
}
