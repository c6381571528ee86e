//! 本地 JSONL 语料，每行一个 `{"id": .., "text": ..}`

use std::path::Path;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tracing::warn;

use super::DocumentSource;
use crate::models::Document;

pub struct JsonlSource {
    lines: Lines<BufReader<File>>,
    line_no: usize,
}

impl JsonlSource {
    pub async fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = File::open(path.as_ref()).await?;
        Ok(Self {
            lines: BufReader::new(file).lines(),
            line_no: 0,
        })
    }

    async fn read_next(&mut self) -> Option<Document> {
        loop {
            let line = match self.lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => return None,
                Err(e) => {
                    warn!("⚠️ 读取语料第 {} 行失败，停止读取: {}", self.line_no + 1, e);
                    return None;
                }
            };
            self.line_no += 1;

            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Document>(&line) {
                Ok(doc) => return Some(doc),
                Err(e) => warn!("⚠️ 跳过第 {} 行，格式无效: {}", self.line_no, e),
            }
        }
    }
}

impl DocumentSource for JsonlSource {
    fn next_document(&mut self) -> BoxFuture<'_, Option<Document>> {
        self.read_next().boxed()
    }
}
