use serde::Deserialize;

/// 上游语料中的一篇文档
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Document {
    #[serde(default = "unknown_id", deserialize_with = "id_as_string")]
    pub id: String,
    #[serde(default)]
    pub text: String,
}

/// 已入库的含数词句子
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSentence {
    pub id: i64,
    pub doc_id: String,
    pub content: String,
}

fn unknown_id() -> String {
    "unknown".to_string()
}

// 语料中的 id 可能是字符串也可能是数字
fn id_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => unknown_id(),
        other => other.to_string(),
    })
}
