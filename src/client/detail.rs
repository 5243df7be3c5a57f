use tracing::{error, info};

use crate::client::{ClientError, MemoGateway, MemoStore, SummaryGateway};
use crate::memo_models::{Category, Memo, MemoFormData};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    Viewing,
    Editing,
}

/// What the Escape key did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscapeOutcome {
    /// 編集を破棄して閲覧モードに戻った
    CancelledEdit,
    /// モーダルを閉じる
    Close,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryState {
    Idle,
    Pending { ticket: u64 },
    Ready(String),
    Failed(String),
}

/// A summarization request handed out by [`DetailView::request_summary`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryRequest {
    pub ticket: u64,
    pub title: String,
    pub content: String,
}

/// メモ詳細モーダルの状態
#[derive(Debug, Clone)]
pub struct DetailView {
    memo: Memo,
    mode: ViewMode,
    form: MemoFormData,
    tag_input: String,
    summary: SummaryState,
    last_ticket: u64,
}

impl DetailView {
    /// Opening always starts in viewing mode.
    pub fn open(memo: Memo) -> Self {
        Self {
            form: MemoFormData::from_memo(&memo),
            memo,
            mode: ViewMode::Viewing,
            tag_input: String::new(),
            summary: SummaryState::Idle,
            last_ticket: 0,
        }
    }

    pub fn memo(&self) -> &Memo {
        &self.memo
    }

    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    pub fn is_editing(&self) -> bool {
        self.mode == ViewMode::Editing
    }

    pub fn form(&self) -> &MemoFormData {
        &self.form
    }

    pub fn tag_input(&self) -> &str {
        &self.tag_input
    }

    pub fn summary(&self) -> &SummaryState {
        &self.summary
    }

    pub fn start_editing(&mut self) {
        self.mode = ViewMode::Editing;
    }

    /// 編集内容を破棄して最後に保存された状態に戻す
    pub fn cancel_editing(&mut self) {
        self.form = MemoFormData::from_memo(&self.memo);
        self.tag_input.clear();
        self.mode = ViewMode::Viewing;
    }

    pub fn on_escape(&mut self) -> EscapeOutcome {
        match self.mode {
            ViewMode::Editing => {
                self.cancel_editing();
                EscapeOutcome::CancelledEdit
            }
            ViewMode::Viewing => EscapeOutcome::Close,
        }
    }

    /// Returns whether the modal should close. Ignored while editing so a stray
    /// click does not lose the edit.
    pub fn on_background_click(&self) -> bool {
        !self.is_editing()
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.form.title = title.into();
    }

    pub fn set_content(&mut self, content: impl Into<String>) {
        self.form.content = content.into();
    }

    pub fn set_category(&mut self, category: Category) {
        self.form.category = category;
    }

    pub fn set_tag_input(&mut self, input: impl Into<String>) {
        self.tag_input = input.into();
    }

    pub fn add_tag(&mut self) -> Result<(), ClientError> {
        let tag = self.tag_input.trim();
        if tag.is_empty() {
            return Err(ClientError::Validation("Tag is empty".into()));
        }
        if self.form.tags.iter().any(|t| t == tag) {
            return Err(ClientError::Validation(format!("Tag '{}' already added", tag)));
        }

        self.form.tags.push(tag.to_string());
        self.tag_input.clear();
        Ok(())
    }

    pub fn remove_tag(&mut self, tag: &str) {
        self.form.tags.retain(|t| t != tag);
    }

    /// Saves the form through the store. Stays in editing mode on failure.
    pub async fn save<G: MemoGateway>(
        &mut self,
        store: &mut MemoStore<G>,
    ) -> Result<(), ClientError> {
        if self.form.title.trim().is_empty() || self.form.content.trim().is_empty() {
            return Err(ClientError::Validation(
                "Please enter both a title and content".into(),
            ));
        }

        let updated = store.update(&self.memo.id, self.form.clone()).await?;
        info!(memo_id = %updated.id, "Memo saved");
        self.reset_to(updated);
        Ok(())
    }

    /// Deletes the displayed memo; on success the caller closes the view.
    pub async fn delete<G: MemoGateway>(
        &self,
        store: &mut MemoStore<G>,
    ) -> Result<(), ClientError> {
        store.delete(&self.memo.id).await
    }

    /// Starts a summarization of the displayed memo. A newer request supersedes
    /// any outstanding one.
    pub fn request_summary(&mut self) -> Result<SummaryRequest, ClientError> {
        if self.is_editing() {
            return Err(ClientError::Validation(
                "Finish editing before generating a summary".into(),
            ));
        }
        if self.memo.content.trim().is_empty() {
            return Err(ClientError::Validation("Memo content is empty".into()));
        }

        self.last_ticket += 1;
        self.summary = SummaryState::Pending {
            ticket: self.last_ticket,
        };
        Ok(SummaryRequest {
            ticket: self.last_ticket,
            title: self.memo.title.clone(),
            content: self.memo.content.clone(),
        })
    }

    /// Applies a summarization result. Returns `false` (and changes nothing) for
    /// a ticket that is no longer the pending one.
    pub fn complete_summary(&mut self, ticket: u64, result: Result<String, ClientError>) -> bool {
        if self.summary != (SummaryState::Pending { ticket }) {
            return false;
        }

        self.summary = match result {
            Ok(summary) => SummaryState::Ready(summary),
            Err(e) => {
                error!(error = %e, memo_id = %self.memo.id, "Summary generation failed");
                SummaryState::Failed(e.to_string())
            }
        };
        true
    }

    pub async fn summarize<S: SummaryGateway>(&mut self, gateway: &S) -> Result<(), ClientError> {
        let request = self.request_summary()?;
        let result = gateway.summarize(&request.title, &request.content).await;
        self.complete_summary(request.ticket, result);
        Ok(())
    }

    fn reset_to(&mut self, memo: Memo) {
        self.form = MemoFormData::from_memo(&memo);
        self.memo = memo;
        self.tag_input.clear();
        self.mode = ViewMode::Viewing;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::store::tests::{FakeGateway, memo};
    use async_trait::async_trait;
    use std::sync::Mutex;

    fn view() -> DetailView {
        DetailView::open(memo("1", "Groceries", "milk, eggs", Category::Personal, &["home"]))
    }

    struct EchoSummarizer {
        calls: Mutex<usize>,
    }

    #[async_trait]
    impl SummaryGateway for EchoSummarizer {
        async fn summarize(&self, title: &str, _content: &str) -> Result<String, ClientError> {
            *self.calls.lock().unwrap() += 1;
            Ok(format!("Summary of {}", title))
        }
    }

    #[test]
    fn opens_in_viewing_mode() {
        let view = view();
        assert_eq!(view.mode(), ViewMode::Viewing);
        assert_eq!(view.form().title, "Groceries");
    }

    #[test]
    fn escape_while_editing_reverts_form() {
        let mut view = view();
        view.start_editing();
        view.set_title("Changed");
        view.set_tag_input("draft");

        assert_eq!(view.on_escape(), EscapeOutcome::CancelledEdit);
        assert_eq!(view.mode(), ViewMode::Viewing);
        assert_eq!(view.form().title, "Groceries");
        assert_eq!(view.tag_input(), "");

        assert_eq!(view.on_escape(), EscapeOutcome::Close);
    }

    #[test]
    fn background_click_ignored_while_editing() {
        let mut view = view();
        assert!(view.on_background_click());
        view.start_editing();
        assert!(!view.on_background_click());
    }

    #[test]
    fn duplicate_and_empty_tags_are_rejected() {
        let mut view = view();
        view.start_editing();

        view.set_tag_input("a");
        view.add_tag().unwrap();
        view.set_tag_input("a");
        assert!(matches!(view.add_tag(), Err(ClientError::Validation(_))));
        view.set_tag_input("   ");
        assert!(matches!(view.add_tag(), Err(ClientError::Validation(_))));

        assert_eq!(view.form().tags.iter().filter(|t| *t == "a").count(), 1);
        assert_eq!(view.form().tags, vec!["home", "a"]);
    }

    #[test]
    fn tag_match_is_case_sensitive() {
        let mut view = view();
        view.set_tag_input(" Home ");
        view.add_tag().unwrap();
        assert_eq!(view.form().tags, vec!["home", "Home"]);

        view.remove_tag("home");
        assert_eq!(view.form().tags, vec!["Home"]);
    }

    #[tokio::test]
    async fn save_rejects_blank_fields_without_remote_call() {
        let opened = memo("1", "Groceries", "milk, eggs", Category::Personal, &[]);
        let mut store = MemoStore::new(FakeGateway::with(vec![opened.clone()]));
        store.load().await.unwrap();

        let mut view = DetailView::open(opened);
        view.start_editing();
        view.set_content("  ");

        assert!(matches!(
            view.save(&mut store).await,
            Err(ClientError::Validation(_))
        ));
        assert_eq!(store.gateway().call_count("update"), 0);
        assert!(view.is_editing());
    }

    #[tokio::test]
    async fn save_updates_store_and_returns_to_viewing() {
        let opened = memo("1", "Groceries", "milk, eggs", Category::Personal, &[]);
        let mut store = MemoStore::new(FakeGateway::with(vec![opened.clone()]));
        store.load().await.unwrap();

        let mut view = DetailView::open(opened);
        view.start_editing();
        view.set_content("milk, eggs, bread");
        view.set_category(Category::Other);
        view.save(&mut store).await.unwrap();

        assert_eq!(view.mode(), ViewMode::Viewing);
        assert_eq!(view.memo().content, "milk, eggs, bread");
        assert_eq!(store.get_by_id("1").unwrap().category, Category::Other);
    }

    #[tokio::test]
    async fn failed_save_stays_in_editing() {
        let opened = memo("1", "Groceries", "milk, eggs", Category::Personal, &[]);
        let mut store = MemoStore::new(FakeGateway::with(vec![opened.clone()]));
        store.load().await.unwrap();
        *store.gateway().fail_writes.lock().unwrap() = true;

        let mut view = DetailView::open(opened);
        view.start_editing();
        view.set_title("Groceries (weekly)");

        assert!(view.save(&mut store).await.is_err());
        assert!(view.is_editing());
        assert_eq!(view.form().title, "Groceries (weekly)");
    }

    #[tokio::test]
    async fn delete_goes_through_store() {
        let opened = memo("1", "Groceries", "milk, eggs", Category::Personal, &[]);
        let mut store = MemoStore::new(FakeGateway::with(vec![opened.clone()]));
        store.load().await.unwrap();

        DetailView::open(opened).delete(&mut store).await.unwrap();
        assert!(store.all_memos().is_empty());
    }

    #[tokio::test]
    async fn summarize_only_from_viewing() {
        let summarizer = EchoSummarizer {
            calls: Mutex::new(0),
        };
        let mut view = view();

        view.start_editing();
        assert!(view.summarize(&summarizer).await.is_err());
        assert_eq!(*summarizer.calls.lock().unwrap(), 0);

        view.cancel_editing();
        view.summarize(&summarizer).await.unwrap();
        assert_eq!(
            view.summary(),
            &SummaryState::Ready("Summary of Groceries".into())
        );
    }

    #[test]
    fn stale_summary_result_is_dropped() {
        let mut view = view();
        let first = view.request_summary().unwrap();
        let second = view.request_summary().unwrap();
        assert!(second.ticket > first.ticket);

        assert!(view.complete_summary(second.ticket, Ok("fresh".into())));
        assert!(!view.complete_summary(first.ticket, Ok("stale".into())));
        assert_eq!(view.summary(), &SummaryState::Ready("fresh".into()));
    }

    #[test]
    fn failed_summary_keeps_message() {
        let mut view = view();
        let request = view.request_summary().unwrap();
        view.complete_summary(
            request.ticket,
            Err(ClientError::Api {
                status: 500,
                message: "GEMINI_API_KEY is not set".into(),
            }),
        );
        assert!(matches!(view.summary(), SummaryState::Failed(msg) if msg.contains("GEMINI_API_KEY")));
    }
}
