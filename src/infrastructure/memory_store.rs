//! In-process [`KeyValueStore`] backed by a mutex-guarded map.
//!
//! Expired values are purged lazily on access. Set members never expire, so an
//! index set may keep naming a value that has already gone.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use super::kv::{Batch, BatchOutcome, Command, KeyValueStore, ScanPage, StoreError};

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn new(value: String, ttl: Duration) -> Self {
        let expires_at = if ttl.is_zero() {
            None
        } else {
            Instant::now().checked_add(ttl)
        };
        Self { value, expires_at }
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

enum Undo {
    Value {
        key: String,
        previous: Option<Entry>,
    },
    Member {
        set: String,
        member: String,
        was_present: bool,
    },
}

#[derive(Default)]
struct State {
    values: HashMap<String, Entry>,
    sets: HashMap<String, BTreeSet<String>>,
}

impl State {
    fn live(&mut self, key: &str) -> Option<&Entry> {
        let now = Instant::now();
        if self.values.get(key).is_some_and(|e| e.is_expired(now)) {
            self.values.remove(key);
        }
        self.values.get(key)
    }

    fn contains(&mut self, key: &str) -> bool {
        self.live(key).is_some()
    }

    fn add_member(&mut self, set: &str, member: &str) -> bool {
        self.sets
            .entry(set.to_string())
            .or_default()
            .insert(member.to_string())
    }

    fn remove_member(&mut self, set: &str, member: &str) -> bool {
        let Some(members) = self.sets.get_mut(set) else {
            return false;
        };
        let removed = members.remove(member);
        if members.is_empty() {
            self.sets.remove(set);
        }
        removed
    }

    /// Applies one command, recording how to revert it. Returns `false` when a
    /// guard does not hold; nothing is changed in that case.
    fn apply(&mut self, command: Command, undo: &mut Vec<Undo>) -> bool {
        match command {
            Command::SetIfAbsent { key, value, ttl } => {
                if self.contains(&key) {
                    return false;
                }
                let previous = self.values.insert(key.clone(), Entry::new(value, ttl));
                undo.push(Undo::Value { key, previous });
            }
            Command::SetIfPresent { key, value, ttl } => {
                if !self.contains(&key) {
                    return false;
                }
                let previous = self.values.insert(key.clone(), Entry::new(value, ttl));
                undo.push(Undo::Value { key, previous });
            }
            Command::Delete { key } => {
                if !self.contains(&key) {
                    return false;
                }
                let previous = self.values.remove(&key);
                undo.push(Undo::Value { key, previous });
            }
            Command::SetAdd { set, member } => {
                let added = self.add_member(&set, &member);
                undo.push(Undo::Member {
                    set,
                    member,
                    was_present: !added,
                });
            }
            Command::SetRemove { set, member } => {
                let removed = self.remove_member(&set, &member);
                undo.push(Undo::Member {
                    set,
                    member,
                    was_present: removed,
                });
            }
        }
        true
    }

    fn rollback(&mut self, undo: Vec<Undo>) {
        for step in undo.into_iter().rev() {
            match step {
                Undo::Value { key, previous } => match previous {
                    Some(entry) => {
                        self.values.insert(key, entry);
                    }
                    None => {
                        self.values.remove(&key);
                    }
                },
                Undo::Member {
                    set,
                    member,
                    was_present,
                } => {
                    if was_present {
                        self.add_member(&set, &member);
                    } else {
                        self.remove_member(&set, &member);
                    }
                }
            }
        }
    }
}

/// Thread-safe in-memory store. Clones share the same data.
#[derive(Clone, Default)]
pub struct InMemoryKvStore {
    state: Arc<Mutex<State>>,
}

impl InMemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Internal("lock poisoned".into()))
    }
}

impl KeyValueStore for InMemoryKvStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut state = self.lock()?;
        Ok(state.live(key).map(|e| e.value.clone()))
    }

    fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, StoreError> {
        let mut state = self.lock()?;
        if state.contains(key) {
            return Ok(false);
        }
        state
            .values
            .insert(key.to_string(), Entry::new(value.to_string(), ttl));
        Ok(true)
    }

    fn set_if_present(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, StoreError> {
        let mut state = self.lock()?;
        if !state.contains(key) {
            return Ok(false);
        }
        state
            .values
            .insert(key.to_string(), Entry::new(value.to_string(), ttl));
        Ok(true)
    }

    fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let mut state = self.lock()?;
        let existed = state.contains(key);
        state.values.remove(key);
        Ok(existed)
    }

    fn set_add(&self, set: &str, member: &str) -> Result<bool, StoreError> {
        Ok(self.lock()?.add_member(set, member))
    }

    fn set_remove(&self, set: &str, member: &str) -> Result<bool, StoreError> {
        Ok(self.lock()?.remove_member(set, member))
    }

    fn set_members(&self, set: &str) -> Result<Vec<String>, StoreError> {
        let state = self.lock()?;
        Ok(state
            .sets
            .get(set)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default())
    }

    fn set_scan(
        &self,
        set: &str,
        cursor: u64,
        pattern: &str,
        count: u64,
    ) -> Result<ScanPage, StoreError> {
        let state = self.lock()?;
        let Some(members) = state.sets.get(set) else {
            return Ok(ScanPage::default());
        };

        let start = usize::try_from(cursor).unwrap_or(usize::MAX);
        let count = usize::try_from(count.max(1)).unwrap_or(usize::MAX);
        let end = start.saturating_add(count).min(members.len());

        let matched = members
            .iter()
            .skip(start)
            .take(end.saturating_sub(start))
            .filter(|m| glob_match(pattern, m))
            .cloned()
            .collect();

        let next = if end >= members.len() { 0 } else { end as u64 };
        Ok(ScanPage {
            members: matched,
            cursor: next,
        })
    }

    fn multi_get(&self, keys: &[String]) -> Result<Vec<Option<String>>, StoreError> {
        let mut state = self.lock()?;
        Ok(keys
            .iter()
            .map(|k| state.live(k).map(|e| e.value.clone()))
            .collect())
    }

    fn exec(&self, batch: Batch) -> Result<BatchOutcome, StoreError> {
        let mut state = self.lock()?;
        let mut undo = Vec::with_capacity(batch.len());

        for (index, command) in batch.into_commands().into_iter().enumerate() {
            let name = command.name();
            if !state.apply(command, &mut undo) {
                log::debug!("batch aborted: {} at position {} did not hold", name, index);
                state.rollback(undo);
                return Ok(BatchOutcome::Aborted { index });
            }
        }

        Ok(BatchOutcome::Committed)
    }
}

/// Redis-style glob supporting `*` and `?`.
fn glob_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();

    let (mut pi, mut ti) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while ti < t.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == t[ti]) {
            pi += 1;
            ti += 1;
        } else if pi < p.len() && p[pi] == '*' {
            star = Some((pi, ti));
            pi += 1;
        } else if let Some((sp, st)) = star {
            pi = sp + 1;
            ti = st + 1;
            star = Some((sp, st + 1));
        } else {
            return false;
        }
    }

    p[pi..].iter().all(|&c| c == '*')
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY: Duration = Duration::from_secs(86_400);

    #[test]
    fn set_if_absent_only_writes_once() {
        let store = InMemoryKvStore::new();
        assert!(store.set_if_absent("k", "a", DAY).unwrap());
        assert!(!store.set_if_absent("k", "b", DAY).unwrap());
        assert_eq!(store.get("k").unwrap().as_deref(), Some("a"));
    }

    #[test]
    fn set_if_present_requires_existing_key() {
        let store = InMemoryKvStore::new();
        assert!(!store.set_if_present("k", "a", DAY).unwrap());
        assert_eq!(store.get("k").unwrap(), None);

        store.set_if_absent("k", "a", DAY).unwrap();
        assert!(store.set_if_present("k", "b", DAY).unwrap());
        assert_eq!(store.get("k").unwrap().as_deref(), Some("b"));
    }

    #[test]
    fn expired_values_read_as_absent() {
        let store = InMemoryKvStore::new();
        store
            .set_if_absent("k", "a", Duration::from_millis(5))
            .unwrap();
        std::thread::sleep(Duration::from_millis(20));

        assert_eq!(store.get("k").unwrap(), None);
        assert!(!store.delete("k").unwrap());
        assert!(store.set_if_absent("k", "b", DAY).unwrap());
    }

    #[test]
    fn multi_get_keeps_positions() {
        let store = InMemoryKvStore::new();
        store.set_if_absent("a", "1", DAY).unwrap();
        store.set_if_absent("c", "3", DAY).unwrap();

        let keys = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        assert_eq!(
            store.multi_get(&keys).unwrap(),
            vec![Some("1".to_string()), None, Some("3".to_string())]
        );
    }

    #[test]
    fn committed_batch_applies_every_command() {
        let store = InMemoryKvStore::new();
        let mut batch = Batch::new();
        batch.set_if_absent("k", "v".into(), DAY).set_add("idx", "k");

        assert_eq!(store.exec(batch).unwrap(), BatchOutcome::Committed);
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
        assert_eq!(store.set_members("idx").unwrap(), vec!["k".to_string()]);
    }

    #[test]
    fn failed_guard_rolls_back_earlier_commands() {
        let store = InMemoryKvStore::new();
        store.set_if_absent("taken", "x", DAY).unwrap();

        let mut batch = Batch::new();
        batch
            .set_add("idx", "fresh")
            .set_if_absent("fresh", "v".into(), DAY)
            .set_if_absent("taken", "y".into(), DAY);

        assert_eq!(
            store.exec(batch).unwrap(),
            BatchOutcome::Aborted { index: 2 }
        );
        assert_eq!(store.get("fresh").unwrap(), None);
        assert_eq!(store.get("taken").unwrap().as_deref(), Some("x"));
        assert!(store.set_members("idx").unwrap().is_empty());
    }

    #[test]
    fn delete_guard_aborts_on_missing_key() {
        let store = InMemoryKvStore::new();
        store.set_add("idx", "gone").unwrap();

        let mut batch = Batch::new();
        batch.delete("gone").set_remove("idx", "gone");

        assert_eq!(
            store.exec(batch).unwrap(),
            BatchOutcome::Aborted { index: 0 }
        );
        assert_eq!(store.set_members("idx").unwrap(), vec!["gone".to_string()]);
    }

    #[test]
    fn scan_walks_whole_set_once() {
        let store = InMemoryKvStore::new();
        for i in 0..7 {
            store.set_add("idx", &format!("m{}", i)).unwrap();
        }

        let mut seen = Vec::new();
        let mut cursor = 0;
        loop {
            let page = store.set_scan("idx", cursor, "*", 3).unwrap();
            assert!(page.members.len() <= 3);
            seen.extend(page.members);
            cursor = page.cursor;
            if cursor == 0 {
                break;
            }
        }

        seen.sort();
        assert_eq!(seen.len(), 7);
        seen.dedup();
        assert_eq!(seen.len(), 7);
    }

    #[test]
    fn scan_filters_after_counting() {
        let store = InMemoryKvStore::new();
        store.set_add("idx", "a:1").unwrap();
        store.set_add("idx", "b:1").unwrap();

        let page = store.set_scan("idx", 0, "b:*", 1).unwrap();
        assert!(page.members.is_empty());
        assert_ne!(page.cursor, 0);

        let page = store.set_scan("idx", page.cursor, "b:*", 1).unwrap();
        assert_eq!(page.members, vec!["b:1".to_string()]);
        assert_eq!(page.cursor, 0);
    }

    #[test]
    fn scan_of_missing_set_is_empty() {
        let store = InMemoryKvStore::new();
        assert_eq!(
            store.set_scan("nope", 0, "*", 10).unwrap(),
            ScanPage::default()
        );
    }

    #[test]
    fn glob_patterns() {
        assert!(glob_match("*", ""));
        assert!(glob_match("order:*", "order:42"));
        assert!(glob_match("order:?", "order:4"));
        assert!(!glob_match("order:?", "order:42"));
        assert!(glob_match("*:4*", "order:42"));
        assert!(!glob_match("item:*", "order:42"));
    }
}
