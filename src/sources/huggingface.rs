//! Hugging Face datasets-server 分页读取
//!
//! 通过 `/rows` 接口按 offset 翻页，每页的 `rows[].row` 即一篇文档。

use std::collections::VecDeque;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;
use tracing::{info, warn};

use super::DocumentSource;
use crate::config::Config;
use crate::models::Document;

pub struct HuggingFaceSource {
    client: reqwest::Client,
    endpoint: String,
    dataset: String,
    config: String,
    split: String,
    page_size: usize,
    offset: usize,
    buffer: VecDeque<Document>,
    exhausted: bool,
}

impl HuggingFaceSource {
    pub fn new(config: &Config) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: config.hf_endpoint.trim_end_matches('/').to_string(),
            dataset: config.hf_dataset.clone(),
            config: config.hf_config.clone(),
            split: config.hf_split.clone(),
            page_size: config.hf_page_size.max(1),
            offset: 0,
            buffer: VecDeque::new(),
            exhausted: false,
        }
    }

    /// 拉取下一页，返回本页行数
    async fn fetch_page(&mut self) -> Result<usize, reqwest::Error> {
        let url = format!("{}/rows", self.endpoint);
        let offset = self.offset.to_string();
        let length = self.page_size.to_string();

        let body: Value = self
            .client
            .get(&url)
            .query(&[
                ("dataset", self.dataset.as_str()),
                ("config", self.config.as_str()),
                ("split", self.split.as_str()),
                ("offset", offset.as_str()),
                ("length", length.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let (row_count, docs) = parse_rows(&body);
        self.offset += row_count;
        self.buffer.extend(docs);
        Ok(row_count)
    }

    async fn read_next(&mut self) -> Option<Document> {
        while self.buffer.is_empty() {
            if self.exhausted {
                return None;
            }
            match self.fetch_page().await {
                Ok(rows) => {
                    if rows < self.page_size {
                        info!("📭 数据集已读完 (offset={})", self.offset);
                        self.exhausted = true;
                    }
                }
                Err(e) => {
                    warn!("⚠️ 拉取数据集失败，停止读取 (offset={}): {}", self.offset, e);
                    self.exhausted = true;
                }
            }
        }
        self.buffer.pop_front()
    }
}

impl DocumentSource for HuggingFaceSource {
    fn next_document(&mut self) -> BoxFuture<'_, Option<Document>> {
        self.read_next().boxed()
    }
}

/// 解析 `/rows` 返回体
///
/// 返回本页总行数（用于翻页）和能解析成文档的行。
fn parse_rows(body: &Value) -> (usize, Vec<Document>) {
    let Some(rows) = body.get("rows").and_then(Value::as_array) else {
        return (0, Vec::new());
    };

    let docs = rows
        .iter()
        .filter_map(|entry| {
            let payload = entry.get("row").unwrap_or(entry);
            serde_json::from_value::<Document>(payload.clone()).ok()
        })
        .collect();

    (rows.len(), docs)
}
