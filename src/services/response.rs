//! 模型返回结果的解析
//!
//! 顶层结构不是 `{"results": [...]}` 时整批失败；
//! 单条记录的 `type` 缺失或不在 0/1/2 内时只影响该条记录。

use std::collections::HashMap;

use serde_json::Value;
use tracing::debug;

use crate::error::OracleError;
use crate::models::LabelType;

/// 一个批次的模型判断结果，按记录 id 索引
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OracleVerdicts {
    entries: HashMap<i64, Option<LabelType>>,
}

impl OracleVerdicts {
    /// 记录 id 对应的标签；`type` 无效或未返回时为 `Failed`
    pub fn label_for(&self, id: i64) -> LabelType {
        match self.entries.get(&id) {
            Some(Some(label)) => *label,
            _ => LabelType::Failed,
        }
    }

    /// 模型是否返回了该 id（不论 `type` 是否有效）
    pub fn contains(&self, id: i64) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(i64, Option<LabelType>)> for OracleVerdicts {
    fn from_iter<I: IntoIterator<Item = (i64, Option<LabelType>)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// 解析 `{"results": [{"id": int, "type": int}, ...]}`
///
/// 只接受 JSON 整数形式的 `id` 和 `type`，不做字符串到数字的转换。
/// 同一 id 出现多次时以最后一次为准。
pub fn decode_response(reply: &Value) -> Result<OracleVerdicts, OracleError> {
    let results = reply
        .get("results")
        .ok_or_else(|| OracleError::MalformedResponse {
            reason: "缺少 results 字段".to_string(),
        })?
        .as_array()
        .ok_or_else(|| OracleError::MalformedResponse {
            reason: "results 不是数组".to_string(),
        })?;

    let mut entries = HashMap::with_capacity(results.len());
    for item in results {
        let Some(id) = item.get("id").and_then(Value::as_i64) else {
            debug!("忽略没有有效 id 的返回项: {}", item);
            continue;
        };
        let label = item
            .get("type")
            .and_then(Value::as_i64)
            .and_then(LabelType::from_oracle_type);
        entries.insert(id, label);
    }

    Ok(OracleVerdicts { entries })
}

/// 去掉模型偶尔包裹在外层的 Markdown 代码块
pub fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}
