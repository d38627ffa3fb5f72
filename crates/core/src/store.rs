//! Session Storage
//!
//! [`SessionStore`] is the persistence boundary for debates, their argument
//! logs and their results. [`MemoryStore`] keeps everything in process memory
//! for the lifetime of the server; a durable backend implements the same trait.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::error::StoreError;
use crate::model::{Argument, Debate, DebateResult};

/// Result type for storage operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Keyed persistence for debates, arguments and results.
///
/// Guarantees:
/// - `get_arguments` returns arguments in the order they were appended.
/// - `put_result` stores at most one result per debate.
/// - Every write is all-or-nothing.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, id: Uuid) -> StoreResult<Option<Debate>>;

    /// Inserts or replaces a debate.
    async fn put(&self, debate: Debate) -> StoreResult<()>;

    /// All debates, newest first.
    async fn list(&self) -> StoreResult<Vec<Debate>>;

    async fn get_arguments(&self, debate_id: Uuid) -> StoreResult<Vec<Argument>>;

    async fn append_argument(&self, argument: Argument) -> StoreResult<()>;

    async fn get_result(&self, debate_id: Uuid) -> StoreResult<Option<DebateResult>>;

    /// Stores a result. Returns `StoreError::Conflict` if one already exists.
    async fn put_result(&self, result: DebateResult) -> StoreResult<()>;
}

#[derive(Debug, Default)]
struct Tables {
    debates: HashMap<Uuid, Debate>,
    arguments: HashMap<Uuid, Vec<Argument>>,
    results: HashMap<Uuid, DebateResult>,
}

/// Process-lifetime store backed by hash maps behind a single lock.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> StoreResult<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|e| StoreError::Backend(format!("store lock poisoned: {e}")))
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn get(&self, id: Uuid) -> StoreResult<Option<Debate>> {
        Ok(self.tables()?.debates.get(&id).cloned())
    }

    async fn put(&self, debate: Debate) -> StoreResult<()> {
        self.tables()?.debates.insert(debate.id, debate);
        Ok(())
    }

    async fn list(&self) -> StoreResult<Vec<Debate>> {
        let mut debates: Vec<Debate> = self.tables()?.debates.values().cloned().collect();
        debates.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(debates)
    }

    async fn get_arguments(&self, debate_id: Uuid) -> StoreResult<Vec<Argument>> {
        Ok(self
            .tables()?
            .arguments
            .get(&debate_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn append_argument(&self, argument: Argument) -> StoreResult<()> {
        self.tables()?
            .arguments
            .entry(argument.debate_id)
            .or_default()
            .push(argument);
        Ok(())
    }

    async fn get_result(&self, debate_id: Uuid) -> StoreResult<Option<DebateResult>> {
        Ok(self.tables()?.results.get(&debate_id).cloned())
    }

    async fn put_result(&self, result: DebateResult) -> StoreResult<()> {
        let mut tables = self.tables()?;
        if tables.results.contains_key(&result.debate_id) {
            return Err(StoreError::Conflict(result.debate_id));
        }
        tables.results.insert(result.debate_id, result);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DebateSettings, Difficulty, Format, Phase, Position};

    fn debate(topic: &str) -> Debate {
        Debate::new(DebateSettings {
            topic: topic.to_string(),
            format: Format::Oxford,
            user_position: Position::Con,
            ai_difficulty: Difficulty::Intermediate,
            real_time_feedback: false,
        })
    }

    #[tokio::test]
    async fn test_put_and_get_debate() {
        let store = MemoryStore::new();
        let d = debate("Nuclear power is essential");
        store.put(d.clone()).await.unwrap();
        assert_eq!(store.get(d.id).await.unwrap(), Some(d));
        assert_eq!(store.get(Uuid::new_v4()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_put_replaces_debate() {
        let store = MemoryStore::new();
        let mut d = debate("Nuclear power is essential");
        store.put(d.clone()).await.unwrap();
        d.time_remaining = 12;
        store.put(d.clone()).await.unwrap();
        assert_eq!(store.get(d.id).await.unwrap().unwrap().time_remaining, 12);
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_arguments_keep_insertion_order() {
        let store = MemoryStore::new();
        let d = debate("Nuclear power is essential");
        let other = debate("Other");
        for text in ["first", "second", "third"] {
            store
                .append_argument(Argument::from_ai(d.id, Phase::Opening, text.to_string()))
                .await
                .unwrap();
        }
        store
            .append_argument(Argument::from_ai(other.id, Phase::Opening, "x".to_string()))
            .await
            .unwrap();

        let contents: Vec<String> = store
            .get_arguments(d.id)
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.content)
            .collect();
        assert_eq!(contents, vec!["first", "second", "third"]);
        assert!(store.get_arguments(Uuid::new_v4()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_single_result_per_debate() {
        let store = MemoryStore::new();
        let id = Uuid::new_v4();
        store.put_result(DebateResult::neutral(id)).await.unwrap();
        let err = store.put_result(DebateResult::neutral(id)).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(conflict) if conflict == id));
        assert!(store.get_result(id).await.unwrap().is_some());
    }
}
