use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::LabelType;

/// 句子中一段连续数词的位置
///
/// `start`/`end` 为字符偏移（左闭右开）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumeralSpan {
    pub text: String,
    pub start: usize,
    pub end: usize,
}

/// 待插入的数词记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOccurrence {
    /// 来源句子ID
    pub source_id: i64,
    /// 完整句子
    pub sentence: String,
    /// 数词文本
    pub number_text: String,
    pub start: usize,
    pub end: usize,
}

impl NewOccurrence {
    pub fn from_span(source_id: i64, sentence: &str, span: NumeralSpan) -> Self {
        Self {
            source_id,
            sentence: sentence.to_string(),
            number_text: span.text,
            start: span.start,
            end: span.end,
        }
    }

    /// 检查 `0 <= start < end <= 句子字符数`
    pub fn has_valid_span(&self) -> bool {
        self.start < self.end && self.end <= self.sentence.chars().count()
    }
}

/// 已持久化的数词记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumeralOccurrence {
    pub id: i64,
    pub source_id: i64,
    pub sentence: String,
    pub number_text: String,
    pub start: usize,
    pub end: usize,
    pub label: LabelType,
    pub created_at: DateTime<Utc>,
}
