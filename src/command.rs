use std::path::Path;
use std::sync::Arc;

use chrono::Duration;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::cache::{Clock, TtlSlot};
use crate::error::{AppError, Result};

pub fn ttl() -> Duration {
    Duration::hours(12)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandEntry {
    pub command: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,
}

pub fn load_commands(path: &Path) -> Result<Vec<CommandEntry>> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        AppError::ConfigError(format!("cannot read {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&raw)
        .map_err(|e| AppError::ParseError(format!("{} is not a command list: {}", path.display(), e)))
}

/// Hands out one command per TTL window.
pub struct CommandService {
    commands: Vec<CommandEntry>,
    // Reported to callers while the list is empty.
    missing: String,
    current: TtlSlot<CommandEntry>,
}

impl CommandService {
    pub fn new(commands: Vec<CommandEntry>, clock: Arc<dyn Clock>) -> Self {
        CommandService {
            commands,
            missing: "no commands loaded".to_string(),
            current: TtlSlot::new(clock, ttl()),
        }
    }

    /// Load the list from `path`. A missing or malformed file leaves the service empty.
    pub fn load(path: &Path, clock: Arc<dyn Clock>) -> Self {
        match load_commands(path) {
            Ok(commands) => {
                tracing::info!(path = %path.display(), count = commands.len(), "command list loaded");
                CommandService::new(commands, clock)
            }
            Err(err) => {
                tracing::warn!(error = %err, "command list unavailable");
                CommandService {
                    missing: err.to_string(),
                    ..CommandService::new(Vec::new(), clock)
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn get_command(&self) -> Result<CommandEntry> {
        let Some(fallback) = self.commands.first() else {
            return Err(AppError::Unavailable(self.missing.clone()).labeled("Command list unavailable"));
        };

        Ok(self.current.get_or_insert_with(|| {
            let picked = self
                .commands
                .choose(&mut rand::thread_rng())
                .unwrap_or(fallback)
                .clone();
            tracing::debug!(command = %picked.command, "picked command of the day");
            picked
        }))
    }
}
