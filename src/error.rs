//! 错误类型
//!
//! 按边界划分：存储层、传输层、标注服务层。
//! 编排层与 `main` 统一使用 `anyhow::Result` 并附加上下文。

use std::time::Duration;
use thiserror::Error;

/// 存储层错误
///
/// 存储错误不会在本系统内自动重试，直接上抛给本次运行。
#[derive(Debug, Error)]
pub enum StoreError {
    /// SQLite 调用失败（连接、约束、事务等）
    #[error("数据库操作失败: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// 表中存在无法识别的标签编码
    #[error("记录 {id} 的标签编码无效: {code}")]
    InvalidLabelCode { id: i64, code: i64 },

    /// 表中存在无法解析的时间
    #[error("记录 {id} 的创建时间无效: {value}")]
    InvalidTimestamp { id: i64, value: String },

    /// 数值超出 SQLite INTEGER 范围
    #[error("数值 {0} 超出 INTEGER 范围")]
    OutOfRange(String),

    /// 创建数据库目录失败
    #[error("创建数据库目录失败: {0}")]
    Io(#[from] std::io::Error),

    /// 数据库版本高于当前程序支持的版本
    #[error("数据库版本 ({found}) 高于程序支持的版本 ({supported})")]
    UnsupportedSchema { found: i32, supported: i32 },
}

/// 单次请求的传输错误，均视为可重试的瞬时故障
#[derive(Debug, Error)]
pub enum TransportError {
    /// 网络请求失败或服务端返回错误状态
    #[error("请求失败 (模型: {model}): {message}")]
    RequestFailed { model: String, message: String },

    /// 返回结果为空
    #[error("返回内容为空 (模型: {model})")]
    EmptyContent { model: String },

    /// 返回内容不是合法 JSON
    #[error("返回内容不是合法 JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// 单次请求超时
    #[error("请求超时 ({0:?})")]
    Timeout(Duration),
}

/// 标注服务错误
///
/// 任何一种错误都会让整个批次被标记为失败。
#[derive(Debug, Error)]
pub enum OracleError {
    /// 所有尝试均失败
    #[error("已尝试 {attempts} 次仍失败: {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: TransportError,
    },

    /// 返回结构不符合 `{"results": [...]}`
    #[error("返回结构无效: {reason}")]
    MalformedResponse { reason: String },

    /// 批次无法编码成请求，未发出任何请求
    #[error("构造请求失败: {0}")]
    PromptBuild(#[source] serde_json::Error),

    /// 执行请求的工作任务异常退出
    #[error("工作任务异常退出")]
    WorkerPanicked,
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 配置项取值非法
    #[error("配置项 {field} 无效: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    /// 配置文件读取失败
    #[error("读取配置文件 {path} 失败: {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// 配置文件解析失败
    #[error("解析配置文件 {path} 失败: {source}")]
    ParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// 存储层结果类型
pub type StoreResult<T> = Result<T, StoreError>;
