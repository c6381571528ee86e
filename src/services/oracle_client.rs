//! 标注服务客户端
//!
//! 一个批次对应一次请求：构造 prompt → 带超时的请求 → 失败按策略退避重试 →
//! 解析 `{"results": [...]}`。
//!
//! 重试只覆盖传输层故障（网络错误、超时、返回内容不是 JSON）；
//! 返回结构不对属于确定性错误，不再重试。

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{OracleError, TransportError};
use crate::models::NumeralOccurrence;
use crate::services::llm_service::ChatTransport;
use crate::services::prompt::build_batch_prompt;
use crate::services::response::{decode_response, strip_code_fence, OracleVerdicts};
use crate::utils::logging::truncate_text;

/// 重试策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// 最多尝试次数（含第一次），至少为 1
    pub max_attempts: u32,
    /// 退避基数，第 n 次失败后等待 `base_delay * n`
    pub base_delay: Duration,
    /// 单次请求的等待上限
    pub timeout: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, timeout: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            timeout,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.max_attempts,
            Duration::from_millis(config.retry_base_delay_ms),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    /// 第 `attempt` 次（从 1 开始）失败后的等待时间
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(2, Duration::from_millis(500), Duration::from_secs(30))
    }
}

/// 退避等待的接口，测试中可替换为不真正等待的实现
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()>;
}

/// 使用 tokio 计时器等待
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()> {
        tokio::time::sleep(duration).boxed()
    }
}

/// 标注服务客户端
pub struct OracleClient<T> {
    transport: T,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl<T: ChatTransport> OracleClient<T> {
    pub fn new(transport: T, policy: RetryPolicy) -> Self {
        Self::with_sleeper(transport, policy, Arc::new(TokioSleeper))
    }

    pub fn with_sleeper(transport: T, policy: RetryPolicy, sleeper: Arc<dyn Sleeper>) -> Self {
        Self {
            transport,
            policy,
            sleeper,
        }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// 对一个批次发起标注请求
    pub async fn classify(&self, batch: &[NumeralOccurrence]) -> Result<OracleVerdicts, OracleError> {
        let prompt = build_batch_prompt(batch).map_err(OracleError::PromptBuild)?;

        let reply = self.request_with_retry(&prompt).await?;
        info!("📥 模型返回预览: {}", truncate_text(&reply.to_string(), 300));

        decode_response(&reply)
    }

    /// 带超时和退避的请求循环
    ///
    /// 成功返回解析后的 JSON；用尽次数后返回最后一次的错误。
    pub async fn request_with_retry(&self, prompt: &str) -> Result<Value, OracleError> {
        let max_attempts = self.policy.max_attempts;
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.attempt_once(prompt).await {
                Ok(reply) => return Ok(reply),
                Err(err) => {
                    warn!("模型请求失败（{}/{}）：{}", attempt, max_attempts, err);
                    if attempt >= max_attempts {
                        return Err(OracleError::Exhausted {
                            attempts: attempt,
                            last: err,
                        });
                    }
                    self.sleeper.sleep(self.policy.delay_for(attempt)).await;
                }
            }
        }
    }

    async fn attempt_once(&self, prompt: &str) -> Result<Value, TransportError> {
        let content = tokio::time::timeout(self.policy.timeout, self.transport.complete(prompt))
            .await
            .map_err(|_| TransportError::Timeout(self.policy.timeout))??;

        Ok(serde_json::from_str(strip_code_fence(&content))?)
    }
}
