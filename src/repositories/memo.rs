use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use std::str::FromStr;
use tracing::{debug, warn};

use crate::error::Result;
use crate::memo_models::{Category, Memo, MemoQuery};

#[async_trait]
pub trait MemoRepository: Send + Sync {
    /// 作成日時の新しい順で返す
    async fn list(&self, query: &MemoQuery) -> Result<Vec<Memo>>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Memo>>;
    async fn create(&self, memo: Memo) -> Result<Memo>;
    /// Writes `memo` only if the stored `updated_at` still equals `expected_updated_at`.
    /// Returns `None` when the row is gone or was changed by someone else.
    async fn update(&self, memo: Memo, expected_updated_at: DateTime<Utc>)
    -> Result<Option<Memo>>;
    /// `false` when no row had that id.
    async fn delete(&self, id: &str) -> Result<bool>;
    async fn delete_all(&self) -> Result<u64>;
}

/// memos テーブルの行
#[derive(Debug, Clone, FromRow)]
pub struct MemoRow {
    pub id: String,
    pub title: String,
    pub content: String,
    pub category: String,
    pub tags: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<MemoRow> for Memo {
    fn from(row: MemoRow) -> Self {
        let category = Category::from_str(&row.category).unwrap_or_else(|_| {
            warn!(memo_id = %row.id, category = %row.category, "Unknown category in stored row, using 'other'");
            Category::Other
        });

        Memo {
            id: row.id,
            title: row.title,
            content: row.content,
            category,
            tags: row.tags.unwrap_or_default(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// ILIKE 用のパターン。`%` `_` `\` はエスケープして文字通りに一致させる
pub fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

const CREATE_TABLE_SQL: &str = "CREATE TABLE IF NOT EXISTS memos (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    content TEXT NOT NULL,
    category TEXT NOT NULL,
    tags TEXT[],
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL
)";

const CREATE_INDEX_SQL: &str =
    "CREATE INDEX IF NOT EXISTS memos_created_at_idx ON memos (created_at DESC)";

// PostgreSQL Implementation
pub struct PostgresMemoRepository {
    pool: PgPool,
}

impl PostgresMemoRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 起動時にテーブルが無ければ作成する
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(CREATE_TABLE_SQL).execute(&self.pool).await?;
        sqlx::query(CREATE_INDEX_SQL).execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl MemoRepository for PostgresMemoRepository {
    async fn list(&self, query: &MemoQuery) -> Result<Vec<Memo>> {
        let category = query.category.category().map(|c| c.as_str());
        let pattern = query.search_term().map(|term| like_pattern(&term));
        debug!(?category, ?pattern, "Listing memos");

        let rows = sqlx::query_as::<_, MemoRow>(
            "SELECT id, title, content, category, tags, created_at, updated_at FROM memos
             WHERE ($1::TEXT IS NULL OR category = $1)
               AND ($2::TEXT IS NULL OR title ILIKE $2 ESCAPE '\\' OR content ILIKE $2 ESCAPE '\\')
             ORDER BY created_at DESC",
        )
        .bind(category)
        .bind(pattern)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Memo::from).collect())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Memo>> {
        let row = sqlx::query_as::<_, MemoRow>(
            "SELECT id, title, content, category, tags, created_at, updated_at FROM memos WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Memo::from))
    }

    async fn create(&self, memo: Memo) -> Result<Memo> {
        let row = sqlx::query_as::<_, MemoRow>(
            "INSERT INTO memos (id, title, content, category, tags, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING id, title, content, category, tags, created_at, updated_at",
        )
        .bind(&memo.id)
        .bind(&memo.title)
        .bind(&memo.content)
        .bind(memo.category.as_str())
        .bind(&memo.tags)
        .bind(memo.created_at)
        .bind(memo.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn update(
        &self,
        memo: Memo,
        expected_updated_at: DateTime<Utc>,
    ) -> Result<Option<Memo>> {
        let row = sqlx::query_as::<_, MemoRow>(
            "UPDATE memos SET title = $1, content = $2, category = $3, tags = $4, updated_at = $5
             WHERE id = $6 AND updated_at = $7
             RETURNING id, title, content, category, tags, created_at, updated_at",
        )
        .bind(&memo.title)
        .bind(&memo.content)
        .bind(memo.category.as_str())
        .bind(&memo.tags)
        .bind(memo.updated_at)
        .bind(&memo.id)
        .bind(expected_updated_at)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Memo::from))
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM memos WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_all(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM memos").execute(&self.pool).await?;

        Ok(result.rows_affected())
    }
}
