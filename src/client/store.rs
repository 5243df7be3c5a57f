use std::collections::BTreeMap;
use tracing::{error, warn};

use crate::client::{ClientError, MemoGateway};
use crate::memo_models::{Category, CategoryFilter, Memo, MemoFormData, contains_ignore_case};

/// 統計情報
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoStats {
    pub total: usize,
    pub by_category: BTreeMap<Category, usize>,
    pub filtered: usize,
}

/// Category first, then a case-insensitive match on title, content or any tag.
///
/// Broader than the server's search, which ignores tags. A blank query is
/// ignored; otherwise the query is matched as typed, spaces included.
pub fn filter_memos(memos: &[Memo], category: CategoryFilter, search_query: &str) -> Vec<Memo> {
    let blank = search_query.trim().is_empty();
    let query = search_query.to_lowercase();

    memos
        .iter()
        .filter(|m| category.matches(m.category))
        .filter(|m| {
            blank
                || contains_ignore_case(&m.title, &query)
                || contains_ignore_case(&m.content, &query)
                || m.tags.iter().any(|t| contains_ignore_case(t, &query))
        })
        .cloned()
        .collect()
}

pub fn compute_stats(memos: &[Memo], filtered: usize) -> MemoStats {
    let mut by_category = BTreeMap::new();
    for memo in memos {
        *by_category.entry(memo.category).or_insert(0) += 1;
    }

    MemoStats {
        total: memos.len(),
        by_category,
        filtered,
    }
}

/// Client-side memo state: the full list, loading flag and active filters,
/// with the filtered view and stats re-derived after every change.
pub struct MemoStore<G> {
    gateway: G,
    memos: Vec<Memo>,
    loading: bool,
    search_query: String,
    selected_category: CategoryFilter,
    filtered: Vec<Memo>,
    stats: MemoStats,
}

impl<G: MemoGateway> MemoStore<G> {
    pub fn new(gateway: G) -> Self {
        Self {
            gateway,
            memos: Vec::new(),
            loading: true,
            search_query: String::new(),
            selected_category: CategoryFilter::All,
            filtered: Vec::new(),
            stats: MemoStats::default(),
        }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Filtered view.
    pub fn memos(&self) -> &[Memo] {
        &self.filtered
    }

    pub fn all_memos(&self) -> &[Memo] {
        &self.memos
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn search_query(&self) -> &str {
        &self.search_query
    }

    pub fn selected_category(&self) -> CategoryFilter {
        self.selected_category
    }

    pub fn stats(&self) -> &MemoStats {
        &self.stats
    }

    pub fn get_by_id(&self, id: &str) -> Option<&Memo> {
        self.memos.iter().find(|m| m.id == id)
    }

    /// 全件を読み込む（マウント時・失敗後の再同期）
    pub async fn load(&mut self) -> Result<(), ClientError> {
        self.loading = true;
        let result = self.gateway.list(None).await;
        self.loading = false;

        match result {
            Ok(memos) => {
                self.memos = memos;
                self.refresh();
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Failed to load memos");
                Err(e)
            }
        }
    }

    pub async fn create(&mut self, form: MemoFormData) -> Result<Memo, ClientError> {
        validate_form(&form)?;

        match self.gateway.create(&form).await {
            Ok(memo) => {
                self.memos.insert(0, memo.clone());
                self.refresh();
                Ok(memo)
            }
            Err(e) => {
                error!(error = %e, "Failed to create memo");
                Err(self.resync(e).await)
            }
        }
    }

    /// Sends the locally known `updated_at` so the server can reject stale edits.
    pub async fn update(&mut self, id: &str, form: MemoFormData) -> Result<Memo, ClientError> {
        validate_form(&form)?;

        let expected = self.get_by_id(id).map(|m| m.updated_at);
        match self.gateway.update(id, &form, expected).await {
            Ok(updated) => {
                for memo in self.memos.iter_mut().filter(|m| m.id == id) {
                    *memo = updated.clone();
                }
                self.refresh();
                Ok(updated)
            }
            Err(e) => {
                error!(error = %e, memo_id = %id, "Failed to update memo");
                Err(self.resync(e).await)
            }
        }
    }

    pub async fn delete(&mut self, id: &str) -> Result<(), ClientError> {
        match self.gateway.delete(id).await {
            Ok(()) => {
                self.memos.retain(|m| m.id != id);
                self.refresh();
                Ok(())
            }
            Err(e) => {
                error!(error = %e, memo_id = %id, "Failed to delete memo");
                Err(self.resync(e).await)
            }
        }
    }

    pub async fn clear_all(&mut self) -> Result<(), ClientError> {
        self.gateway.clear_all().await.inspect_err(|e| {
            error!(error = %e, "Failed to clear all memos");
        })?;

        self.memos.clear();
        self.search_query.clear();
        self.selected_category = CategoryFilter::All;
        self.refresh();
        Ok(())
    }

    pub fn search(&mut self, query: impl Into<String>) {
        self.search_query = query.into();
        self.refresh();
    }

    pub fn filter_by_category(&mut self, category: CategoryFilter) {
        self.selected_category = category;
        self.refresh();
    }

    /// 失敗時は一覧を再読み込みし、元のエラーを返す
    async fn resync(&mut self, original: ClientError) -> ClientError {
        if let Err(reload_err) = self.load().await {
            warn!(error = %reload_err, "Reload after failed write also failed");
        }
        original
    }

    fn refresh(&mut self) {
        self.filtered = filter_memos(&self.memos, self.selected_category, &self.search_query);
        self.stats = compute_stats(&self.memos, self.filtered.len());
    }
}

fn validate_form(form: &MemoFormData) -> Result<(), ClientError> {
    form.validate()
        .map_err(|_| ClientError::Validation("Please enter both a title and content".into()))
}
