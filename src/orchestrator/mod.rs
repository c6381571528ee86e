//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `pipeline` - 流程入口
//! - 持有数据库连接和数词抽取器
//! - 按顺序执行入库、抽取、标注、统计
//!
//! ### `batcher` - 分批
//! - 把待标注记录按固定大小切成批次
//!
//! ### `dispatcher` - 并发调度
//! - 最多 `max_workers` 个批次同时请求
//! - 按完成顺序逐批回写
//!
//! ### `reconciler` - 结果回写
//! - 把一个批次的模型结果映射到每条记录并提交
//!
//! ## 层次关系
//!
//! ```text
//! pipeline (入库 → 抽取 → 标注 → 统计)
//!     ↓
//! batcher → dispatcher (并发请求) → reconciler (串行回写)
//!     ↓                                  ↓
//! services::OracleClient            store::TokenStore
//! ```

pub mod batcher;
pub mod dispatcher;
pub mod pipeline;
pub mod reconciler;

pub use batcher::make_batches;
pub use dispatcher::{DispatchReport, Dispatcher};
pub use pipeline::{App, IngestReport};
