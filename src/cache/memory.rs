//! In-process key-value store.
//!
//! Mirrors the subset of Redis semantics the cache relies on: string values
//! with TTL, sets that disappear when emptied, glob key enumeration. Expiry is
//! lazy, checked whenever a key is touched.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

use super::store::{KvStore, StoreError};

#[derive(Debug, Clone)]
enum SlotValue {
    Text(String),
    Set(HashSet<String>),
}

#[derive(Debug, Clone)]
struct Slot {
    value: SlotValue,
    expires_at: Option<Instant>,
}

impl Slot {
    fn text(value: &str, ttl: Duration) -> Self {
        Self {
            value: SlotValue::Text(value.to_string()),
            expires_at: Some(Instant::now() + ttl),
        }
    }

    fn empty_set() -> Self {
        Self {
            value: SlotValue::Set(HashSet::new()),
            expires_at: None,
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Memory-backed [`KvStore`] with a readiness switch.
pub struct MemoryStore {
    entries: DashMap<String, Slot>,
    ready: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            ready: AtomicBool::new(true),
        }
    }

    /// Flip connectivity; while not ready every command fails with
    /// [`StoreError::Disconnected`].
    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    fn ensure_ready(&self) -> Result<(), StoreError> {
        if self.is_ready() {
            Ok(())
        } else {
            Err(StoreError::Disconnected)
        }
    }

    fn with_live<R>(&self, key: &str, f: impl FnOnce(&Slot) -> R) -> Option<R> {
        let now = Instant::now();
        let expired = match self.entries.get(key) {
            Some(slot) if !slot.is_expired(now) => return Some(f(slot.value())),
            Some(_) => true,
            None => false,
        };
        if expired {
            self.entries.remove_if(key, |_, slot| slot.is_expired(now));
        }
        None
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.ensure_ready()?;
        match self.with_live(key, |slot| slot.value.clone()) {
            Some(SlotValue::Text(value)) => Ok(Some(value)),
            Some(SlotValue::Set(_)) => Err(StoreError::WrongType {
                key: key.to_string(),
            }),
            None => Ok(None),
        }
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        self.ensure_ready()?;
        self.entries.insert(key.to_string(), Slot::text(value, ttl));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        self.ensure_ready()?;
        let now = Instant::now();
        Ok(self
            .entries
            .remove(key)
            .is_some_and(|(_, slot)| !slot.is_expired(now)))
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        self.ensure_ready()?;
        Ok(self.with_live(key, |_| ()).is_some())
    }

    async fn set_add(&self, set: &str, member: &str) -> Result<(), StoreError> {
        self.ensure_ready()?;
        let now = Instant::now();
        let mut slot = self
            .entries
            .entry(set.to_string())
            .or_insert_with(Slot::empty_set);
        if slot.is_expired(now) {
            *slot = Slot::empty_set();
        }
        match &mut slot.value {
            SlotValue::Set(members) => {
                members.insert(member.to_string());
                Ok(())
            }
            SlotValue::Text(_) => Err(StoreError::WrongType {
                key: set.to_string(),
            }),
        }
    }

    async fn set_remove(&self, set: &str, member: &str) -> Result<(), StoreError> {
        self.ensure_ready()?;
        let emptied = match self.entries.get_mut(set) {
            Some(mut slot) => match &mut slot.value {
                SlotValue::Set(members) => {
                    members.remove(member);
                    members.is_empty()
                }
                SlotValue::Text(_) => {
                    return Err(StoreError::WrongType {
                        key: set.to_string(),
                    });
                }
            },
            None => false,
        };
        if emptied {
            self.entries.remove_if(set, |_, slot| {
                matches!(&slot.value, SlotValue::Set(members) if members.is_empty())
            });
        }
        Ok(())
    }

    async fn set_members(&self, set: &str) -> Result<Vec<String>, StoreError> {
        self.ensure_ready()?;
        match self.with_live(set, |slot| slot.value.clone()) {
            Some(SlotValue::Set(members)) => Ok(members.into_iter().collect()),
            Some(SlotValue::Text(_)) => Err(StoreError::WrongType {
                key: set.to_string(),
            }),
            None => Ok(Vec::new()),
        }
    }

    async fn set_len(&self, set: &str) -> Result<usize, StoreError> {
        self.ensure_ready()?;
        match self.with_live(set, |slot| match &slot.value {
            SlotValue::Set(members) => Some(members.len()),
            SlotValue::Text(_) => None,
        }) {
            Some(Some(len)) => Ok(len),
            Some(None) => Err(StoreError::WrongType {
                key: set.to_string(),
            }),
            None => Ok(0),
        }
    }

    async fn keys_matching(&self, pattern: &str) -> Result<Vec<String>, StoreError> {
        self.ensure_ready()?;
        let now = Instant::now();
        Ok(self
            .entries
            .iter()
            .filter(|entry| !entry.value().is_expired(now))
            .filter(|entry| glob_match(pattern, entry.key()))
            .map(|entry| entry.key().clone())
            .collect())
    }
}

/// Redis-style glob match supporting `*`, `?` and `[...]` classes.
pub(crate) fn glob_match(pattern: &str, candidate: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let candidate: Vec<char> = candidate.chars().collect();

    let (mut p, mut c) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while c < candidate.len() {
        let advanced = match pattern.get(p) {
            Some('*') => {
                backtrack = Some((p, c));
                p += 1;
                continue;
            }
            Some('?') => Some(p + 1),
            Some('[') => match class_match(&pattern, p, candidate[c]) {
                Some((true, next)) => Some(next),
                Some((false, _)) => None,
                None => (candidate[c] == '[').then_some(p + 1),
            },
            Some(ch) if *ch == candidate[c] => Some(p + 1),
            _ => None,
        };

        match (advanced, backtrack) {
            (Some(next), _) => {
                p = next;
                c += 1;
            }
            (None, Some((star_p, star_c))) => {
                p = star_p + 1;
                c = star_c + 1;
                backtrack = Some((star_p, star_c + 1));
            }
            (None, None) => return false,
        }
    }

    pattern[p..].iter().all(|ch| *ch == '*')
}

/// Match `ch` against the class opening at `pattern[open]`. Returns whether it
/// matched and the index past the closing `]`, or `None` when the class is
/// unterminated and `[` is literal.
fn class_match(pattern: &[char], open: usize, ch: char) -> Option<(bool, usize)> {
    let mut i = open + 1;
    let negated = pattern.get(i) == Some(&'^');
    if negated {
        i += 1;
    }

    let mut hit = false;
    let mut first = true;
    loop {
        let current = *pattern.get(i)?;
        if current == ']' && !first {
            return Some((hit != negated, i + 1));
        }
        first = false;
        match (pattern.get(i + 1), pattern.get(i + 2)) {
            (Some('-'), Some(end)) if *end != ']' => {
                let (low, high) = if current <= *end {
                    (current, *end)
                } else {
                    (*end, current)
                };
                hit |= (low..=high).contains(&ch);
                i += 3;
            }
            _ => {
                hit |= current == ch;
                i += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glob_matches_prefix_and_single_char() {
        assert!(glob_match("cache:/api/posts*", "cache:/api/posts"));
        assert!(glob_match("cache:/api/posts*", "cache:/api/posts?page=2"));
        assert!(glob_match("cache:/api/posts*", "cache:/api/posts/1/comments"));
        assert!(!glob_match("cache:/api/posts*", "cache:/api/users"));
        assert!(glob_match("a?c", "abc"));
        assert!(!glob_match("a?c", "ac"));
        assert!(glob_match("*/comments", "cache:/api/posts/1/comments"));
        assert!(glob_match("a*b*c", "axxbyyc"));
        assert!(!glob_match("a*b*c", "axxbyy"));
    }

    #[test]
    fn glob_matches_character_classes() {
        assert!(glob_match("posts/[12]", "posts/1"));
        assert!(glob_match("posts/[12]", "posts/2"));
        assert!(!glob_match("posts/[12]", "posts/3"));
        assert!(glob_match("posts/[a-c]x", "posts/bx"));
        assert!(!glob_match("posts/[a-c]x", "posts/dx"));
        assert!(glob_match("posts/[^a]", "posts/b"));
        assert!(!glob_match("posts/[^a]", "posts/a"));
        assert!(glob_match("*[0-9]/comments", "cache:/api/posts/7/comments"));
        assert!(glob_match("a[b", "a[b"));
    }

    #[tokio::test]
    async fn values_expire_after_ttl() {
        let store = MemoryStore::new();
        store
            .set_ex("short", "v", Duration::from_millis(10))
            .await
            .unwrap();
        store
            .set_ex("long", "v", Duration::from_secs(60))
            .await
            .unwrap();

        std::thread::sleep(Duration::from_millis(30));

        assert_eq!(store.get("short").await.unwrap(), None);
        assert!(!store.exists("short").await.unwrap());
        assert_eq!(store.get("long").await.unwrap().as_deref(), Some("v"));
        assert_eq!(store.keys_matching("*").await.unwrap(), vec!["long"]);
    }

    #[tokio::test]
    async fn sets_vanish_when_emptied() {
        let store = MemoryStore::new();
        store.set_add("s", "a").await.unwrap();
        store.set_add("s", "b").await.unwrap();
        store.set_add("s", "a").await.unwrap();

        let mut members = store.set_members("s").await.unwrap();
        members.sort();
        assert_eq!(members, vec!["a", "b"]);
        assert_eq!(store.set_len("s").await.unwrap(), 2);

        store.set_remove("s", "a").await.unwrap();
        store.set_remove("s", "b").await.unwrap();
        assert!(!store.exists("s").await.unwrap());
        assert!(store.set_members("s").await.unwrap().is_empty());
        assert_eq!(store.set_len("s").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn delete_reports_whether_key_existed() {
        let store = MemoryStore::new();
        store
            .set_ex("k", "v", Duration::from_secs(60))
            .await
            .unwrap();
        assert!(store.delete("k").await.unwrap());
        assert!(!store.delete("k").await.unwrap());
    }

    #[tokio::test]
    async fn wrong_type_is_reported() {
        let store = MemoryStore::new();
        store
            .set_ex("k", "v", Duration::from_secs(60))
            .await
            .unwrap();
        assert!(matches!(
            store.set_add("k", "m").await,
            Err(StoreError::WrongType { .. })
        ));
        store.set_add("s", "m").await.unwrap();
        assert!(matches!(
            store.get("s").await,
            Err(StoreError::WrongType { .. })
        ));
    }

    #[tokio::test]
    async fn disconnected_store_rejects_commands() {
        let store = MemoryStore::new();
        store.set_ready(false);
        assert!(!store.is_ready());
        assert!(matches!(
            store.get("k").await,
            Err(StoreError::Disconnected)
        ));
        assert!(matches!(
            store.keys_matching("*").await,
            Err(StoreError::Disconnected)
        ));

        store.set_ready(true);
        assert_eq!(store.get("k").await.unwrap(), None);
    }
}
