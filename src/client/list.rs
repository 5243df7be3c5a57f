use chrono::{DateTime, Utc};

use crate::memo_models::Memo;

const EXCERPT_CHARS: usize = 120;

/// One row of the memo list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRow {
    pub id: String,
    pub title: String,
    pub category_label: &'static str,
    pub excerpt: String,
    pub tags: Vec<String>,
    pub updated: String,
}

impl From<&Memo> for ListRow {
    fn from(memo: &Memo) -> Self {
        Self {
            id: memo.id.clone(),
            title: memo.title.clone(),
            category_label: memo.category.label(),
            excerpt: excerpt(&memo.content, EXCERPT_CHARS),
            tags: memo.tags.clone(),
            updated: format_timestamp(&memo.updated_at),
        }
    }
}

pub fn build_rows(memos: &[Memo]) -> Vec<ListRow> {
    memos.iter().map(ListRow::from).collect()
}

/// 空白をまとめ、`max_chars` 文字を超える場合は省略記号を付ける
pub fn excerpt(content: &str, max_chars: usize) -> String {
    let collapsed = content.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= max_chars {
        return collapsed;
    }
    let mut cut: String = collapsed.chars().take(max_chars).collect();
    cut.truncate(cut.trim_end().len());
    cut.push('…');
    cut
}

pub fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memo_models::Category;
    use chrono::TimeZone;

    #[test]
    fn row_uses_label_and_formatted_time() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 0).unwrap();
        let memo = Memo {
            id: "m1".into(),
            title: "Standup".into(),
            content: "- blocked on review\n- deploy friday".into(),
            category: Category::Work,
            tags: vec!["team".into()],
            created_at: at,
            updated_at: at,
        };

        let rows = build_rows(std::slice::from_ref(&memo));
        assert_eq!(rows[0].category_label, "Work");
        assert_eq!(rows[0].updated, "2024-03-09 14:05");
        assert_eq!(rows[0].excerpt, "- blocked on review - deploy friday");
    }

    #[test]
    fn long_content_is_cut_on_char_boundary() {
        let content = "日本語のメモ ".repeat(40);
        let cut = excerpt(&content, 10);
        assert!(cut.ends_with('…'));
        assert_eq!(cut.chars().count(), 11);
        assert_eq!(excerpt("short", 10), "short");
    }
}
