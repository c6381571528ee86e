//! # Numeral Annotator
//!
//! 中文数词语义标注流水线
//!
//! ## 架构设计
//!
//! ### ① 数据层
//! - `store/` - SQLite 存储：句子表与数词待标注表，负责迁移和事务
//! - `models/` - 文档、数词记录、标签类型
//! - `sources/` - 语料来源（本地 JSONL / Hugging Face 数据集）
//!
//! ### ② 能力层
//! - `extraction/` - 分句、数词抽取、"第"字标记统计
//! - `services/` - 大模型调用、批量 prompt、结果解析、超时与重试
//!
//! ### ③ 编排层
//! - `orchestrator/` - 分批、并发调度、结果回写、完整流程
//!
//! ## 模块结构

pub mod config;
pub mod error;
pub mod extraction;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod sources;
pub mod store;
pub mod utils;

// 重新导出常用类型
pub use config::Config;
pub use error::{ConfigError, OracleError, StoreError, TransportError};
pub use extraction::NumeralExtractor;
pub use models::{LabelSummary, LabelType, NumeralOccurrence};
pub use orchestrator::{App, DispatchReport};
pub use services::{ChatTransport, OracleClient, RetryPolicy};
pub use store::TokenStore;
