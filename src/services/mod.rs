//! 业务能力层
//!
//! - `LlmService` - 单次 LLM 调用（传输）
//! - `OracleClient` - 批次级别的标注请求，负责超时与退避重试
//! - `prompt` / `response` - 请求构造与结果解析

pub mod llm_service;
pub mod oracle_client;
pub mod prompt;
pub mod response;

pub use llm_service::{ChatTransport, LlmService};
pub use oracle_client::{OracleClient, RetryPolicy, Sleeper, TokioSleeper};
pub use response::{decode_response, OracleVerdicts};
