use crate::{
    error::{AppError, Result},
    memo_models::{Memo, MemoFormData, MemoQuery, MemoUpdateRequest, normalize_tags},
    repositories::MemoRepository,
};
use chrono::{DateTime, Duration, SubsecRound, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info};
use uuid::Uuid;

/// 絞り込み無しの一覧のキャッシュ。書き込みが成功するたびに破棄する
#[derive(Default)]
struct ListingCache {
    /// Bumped on every invalidation. A refill only lands if it is unchanged
    /// since the repository read started.
    generation: u64,
    memos: Option<Arc<Vec<Memo>>>,
}

pub struct MemoService {
    memo_repo: Arc<dyn MemoRepository>,
    listing: RwLock<ListingCache>,
}

impl MemoService {
    pub fn new(memo_repo: Arc<dyn MemoRepository>) -> Self {
        Self {
            memo_repo,
            listing: RwLock::new(ListingCache::default()),
        }
    }

    pub async fn list(&self, query: &MemoQuery) -> Result<Vec<Memo>> {
        if !query.is_unfiltered() {
            return self.memo_repo.list(query).await.inspect_err(|e| {
                error!(error = %e, ?query, "Failed to list memos");
            });
        }

        let generation = {
            let cache = self.listing.read().await;
            if let Some(cached) = cache.memos.as_ref() {
                debug!(count = cached.len(), "Serving memo listing from cache");
                return Ok(cached.to_vec());
            }
            cache.generation
        };

        let memos = self.memo_repo.list(query).await.inspect_err(|e| {
            error!(error = %e, "Failed to list memos");
        })?;

        let mut cache = self.listing.write().await;
        if cache.generation == generation {
            cache.memos = Some(Arc::new(memos.clone()));
        } else {
            // 読み込み中に書き込みがあった。古い結果はキャッシュしない
            debug!("Memo listing changed during read, not caching");
        }
        Ok(memos)
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<Memo>> {
        self.memo_repo.find_by_id(id).await.inspect_err(|e| {
            error!(error = %e, memo_id = %id, "Failed to fetch memo");
        })
    }

    pub async fn create(&self, form: MemoFormData) -> Result<Memo> {
        // バリデーション
        form.validate()?;

        let now = now_micros();
        let memo = Memo {
            id: Uuid::new_v4().to_string(),
            title: form.title,
            content: form.content,
            category: form.category,
            tags: normalize_tags(form.tags),
            created_at: now,
            updated_at: now,
        };

        let memo = self.memo_repo.create(memo).await.inspect_err(|e| {
            error!(error = %e, "Failed to create memo");
        })?;
        self.invalidate_listing().await;
        info!(memo_id = %memo.id, category = %memo.category, "Memo created");
        Ok(memo)
    }

    // メモの更新（フォーム全体で置き換え）
    pub async fn update(&self, id: &str, req: MemoUpdateRequest) -> Result<Memo> {
        req.form.validate()?;

        let existing = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Memo {} not found", id)))?;

        if let Some(expected) = req.expected_updated_at {
            if expected != existing.updated_at {
                return Err(AppError::Conflict(format!(
                    "Memo {} was modified at {}; reload before saving",
                    id,
                    existing.updated_at.to_rfc3339()
                )));
            }
        }

        let form = req.form;
        let previous_updated_at = existing.updated_at;
        let memo = Memo {
            title: form.title,
            content: form.content,
            category: form.category,
            tags: normalize_tags(form.tags),
            updated_at: next_updated_at(previous_updated_at),
            ..existing
        };

        let updated = self
            .memo_repo
            .update(memo, previous_updated_at)
            .await
            .inspect_err(|e| error!(error = %e, memo_id = %id, "Failed to update memo"))?
            .ok_or_else(|| {
                AppError::Conflict(format!("Memo {} was modified concurrently", id))
            })?;

        self.invalidate_listing().await;
        info!(memo_id = %id, "Memo updated");
        Ok(updated)
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        let deleted = self.memo_repo.delete(id).await.inspect_err(|e| {
            error!(error = %e, memo_id = %id, "Failed to delete memo");
        })?;
        if !deleted {
            return Err(AppError::NotFound(format!("Memo {} not found", id)));
        }

        self.invalidate_listing().await;
        info!(memo_id = %id, "Memo deleted");
        Ok(())
    }

    pub async fn clear_all(&self) -> Result<u64> {
        let deleted = self.memo_repo.delete_all().await.inspect_err(|e| {
            error!(error = %e, "Failed to delete all memos");
        })?;

        self.invalidate_listing().await;
        info!(deleted, "All memos deleted");
        Ok(deleted)
    }

    async fn invalidate_listing(&self) {
        let mut cache = self.listing.write().await;
        cache.generation += 1;
        cache.memos = None;
    }

    #[cfg(test)]
    async fn has_cached_listing(&self) -> bool {
        self.listing.read().await.memos.is_some()
    }
}

/// PostgreSQL の TIMESTAMPTZ はマイクロ秒精度
fn now_micros() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Always strictly after `previous`, even if the clock has not moved.
fn next_updated_at(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = now_micros();
    if now > previous {
        now
    } else {
        previous + Duration::microseconds(1)
    }
}
