use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::error::{AppError, Result};
use crate::memo_models::{Memo, MemoQuery, contains_ignore_case};
use crate::repositories::MemoRepository;

/// Process-local repository with the same filtering rules as the Postgres one
/// (category exact match, search over title and content only).
#[derive(Default)]
pub struct InMemoryMemoRepository {
    // 新しいものが先頭
    memos: RwLock<Vec<Memo>>,
}

impl InMemoryMemoRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MemoRepository for InMemoryMemoRepository {
    async fn list(&self, query: &MemoQuery) -> Result<Vec<Memo>> {
        let term = query.search_term();
        let memos = self.memos.read().await;

        let mut matched: Vec<Memo> = memos
            .iter()
            .filter(|m| query.category.matches(m.category))
            .filter(|m| match &term {
                Some(t) => contains_ignore_case(&m.title, t) || contains_ignore_case(&m.content, t),
                None => true,
            })
            .cloned()
            .collect();
        // stable sort keeps insertion order for equal timestamps
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matched)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Memo>> {
        let memos = self.memos.read().await;
        Ok(memos.iter().find(|m| m.id == id).cloned())
    }

    async fn create(&self, memo: Memo) -> Result<Memo> {
        let mut memos = self.memos.write().await;
        if memos.iter().any(|m| m.id == memo.id) {
            return Err(AppError::DataAccess(format!(
                "duplicate key value violates unique constraint: id={}",
                memo.id
            )));
        }
        memos.insert(0, memo.clone());
        Ok(memo)
    }

    async fn update(
        &self,
        memo: Memo,
        expected_updated_at: DateTime<Utc>,
    ) -> Result<Option<Memo>> {
        let mut memos = self.memos.write().await;
        let Some(stored) = memos
            .iter_mut()
            .find(|m| m.id == memo.id && m.updated_at == expected_updated_at)
        else {
            return Ok(None);
        };

        stored.title = memo.title;
        stored.content = memo.content;
        stored.category = memo.category;
        stored.tags = memo.tags;
        stored.updated_at = memo.updated_at;
        Ok(Some(stored.clone()))
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let mut memos = self.memos.write().await;
        let before = memos.len();
        memos.retain(|m| m.id != id);
        Ok(memos.len() != before)
    }

    async fn delete_all(&self) -> Result<u64> {
        let mut memos = self.memos.write().await;
        let count = memos.len() as u64;
        memos.clear();
        Ok(count)
    }
}
