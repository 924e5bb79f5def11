//! Key-value store port.
//!
//! The repository only talks to the store through [`KeyValueStore`]; the
//! primitives mirror what a Redis-like server offers: conditional sets with
//! expiry, set membership, incremental set scans, positional multi-get and an
//! all-or-nothing command batch.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store error: {0}")]
    Internal(String),
}

/// A single queued write.
///
/// Inside a batch, `SetIfAbsent`, `SetIfPresent` and `Delete` are guards: the
/// batch commits only if every guard holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    SetIfAbsent {
        key: String,
        value: String,
        ttl: Duration,
    },
    SetIfPresent {
        key: String,
        value: String,
        ttl: Duration,
    },
    Delete {
        key: String,
    },
    SetAdd {
        set: String,
        member: String,
    },
    SetRemove {
        set: String,
        member: String,
    },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::SetIfAbsent { .. } => "SETNX",
            Command::SetIfPresent { .. } => "SETXX",
            Command::Delete { .. } => "DEL",
            Command::SetAdd { .. } => "SADD",
            Command::SetRemove { .. } => "SREM",
        }
    }
}

/// Client-side command queue. Nothing reaches the store until it is passed to
/// [`KeyValueStore::exec`]; [`Batch::discard`] drops it instead.
#[derive(Debug, Default)]
pub struct Batch {
    commands: Vec<Command>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_if_absent(&mut self, key: &str, value: String, ttl: Duration) -> &mut Self {
        self.push(Command::SetIfAbsent {
            key: key.to_string(),
            value,
            ttl,
        })
    }

    pub fn set_if_present(&mut self, key: &str, value: String, ttl: Duration) -> &mut Self {
        self.push(Command::SetIfPresent {
            key: key.to_string(),
            value,
            ttl,
        })
    }

    pub fn delete(&mut self, key: &str) -> &mut Self {
        self.push(Command::Delete {
            key: key.to_string(),
        })
    }

    pub fn set_add(&mut self, set: &str, member: &str) -> &mut Self {
        self.push(Command::SetAdd {
            set: set.to_string(),
            member: member.to_string(),
        })
    }

    pub fn set_remove(&mut self, set: &str, member: &str) -> &mut Self {
        self.push(Command::SetRemove {
            set: set.to_string(),
            member: member.to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn into_commands(self) -> Vec<Command> {
        self.commands
    }

    /// Abandons the queued commands without contacting the store.
    pub fn discard(self) {
        log::debug!("discarding batch of {} queued command(s)", self.commands.len());
    }

    fn push(&mut self, command: Command) -> &mut Self {
        self.commands.push(command);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    Committed,
    /// A guard failed; no command of the batch was applied. `index` is the
    /// position of the first failing command.
    Aborted { index: usize },
}

/// One step of an incremental set scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanPage {
    pub members: Vec<String>,
    /// Cursor for the next call; 0 once the scan has visited every member.
    pub cursor: u64,
}

pub trait KeyValueStore: Send + Sync + 'static {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Returns `true` if the value was written.
    fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, StoreError>;

    /// Returns `true` if the value was written.
    fn set_if_present(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, StoreError>;

    /// Returns `true` if a key was removed.
    fn delete(&self, key: &str) -> Result<bool, StoreError>;

    fn set_add(&self, set: &str, member: &str) -> Result<bool, StoreError>;

    fn set_remove(&self, set: &str, member: &str) -> Result<bool, StoreError>;

    fn set_members(&self, set: &str) -> Result<Vec<String>, StoreError>;

    /// Examines up to `count` members starting at `cursor` and returns those
    /// matching the glob `pattern`. May return fewer than `count` members.
    fn set_scan(
        &self,
        set: &str,
        cursor: u64,
        pattern: &str,
        count: u64,
    ) -> Result<ScanPage, StoreError>;

    /// One slot per requested key, in request order; `None` for a miss.
    fn multi_get(&self, keys: &[String]) -> Result<Vec<Option<String>>, StoreError>;

    /// Applies every command of the batch or none of them.
    fn exec(&self, batch: Batch) -> Result<BatchOutcome, StoreError>;
}
