//! 语料来源
//!
//! 入库流程按文档逐篇读取，来源只需要能给出下一篇文档。
//! 读取失败或数据读完都返回 `None`，由调用方结束输入。

pub mod huggingface;
pub mod jsonl;

use futures::future::BoxFuture;

use crate::models::Document;

pub use huggingface::HuggingFaceSource;
pub use jsonl::JsonlSource;

/// 逐篇产出文档的来源
pub trait DocumentSource: Send {
    fn next_document(&mut self) -> BoxFuture<'_, Option<Document>>;
}
