//! LLM 服务 - 传输层
//!
//! 只负责"发一条消息、拿回一段文本"，不关心重试、超时和结果解析。
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 支持自定义 API 端点和模型
//! - 兼容 OpenAI API 的服务（如 Gemini, Doubao 等）

use std::sync::Arc;
use std::time::Duration;

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs, ResponseFormat,
    },
    Client,
};
use backoff::ExponentialBackoffBuilder;
use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::debug;

use crate::config::Config;
use crate::error::TransportError;

/// 聊天补全传输接口
///
/// 实现方只发起一次请求并返回消息内容，失败一律视为瞬时故障。
pub trait ChatTransport: Send + Sync {
    fn complete<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<String, TransportError>>;
}

impl<T: ChatTransport + ?Sized> ChatTransport for Arc<T> {
    fn complete<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<String, TransportError>> {
        self.as_ref().complete(prompt)
    }
}

/// 基于 OpenAI 兼容接口的 LLM 服务
pub struct LlmService {
    client: Client<OpenAIConfig>,
    model_name: String,
    temperature: f32,
}

impl LlmService {
    /// 创建新的 LLM 服务
    pub fn new(config: &Config) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.llm_api_key)
            .with_api_base(&config.llm_api_base_url);

        // 关闭客户端内置的 5xx/429 重试，每次调用只发一次请求
        let no_retry = ExponentialBackoffBuilder::new()
            .with_max_elapsed_time(Some(Duration::ZERO))
            .build();

        Self {
            client: Client::with_config(openai_config).with_backoff(no_retry),
            model_name: config.llm_model_name.clone(),
            temperature: config.llm_temperature,
        }
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// 发送单条用户消息，要求模型以 JSON 对象回复
    pub async fn send_to_llm(&self, user_message: &str) -> Result<String, TransportError> {
        debug!("调用 LLM API，模型: {}", self.model_name);
        debug!("用户消息长度: {} 字符", user_message.chars().count());

        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(user_message)
            .build()
            .map_err(|e| self.request_failed(e))?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(vec![ChatCompletionRequestMessage::User(user_msg)])
            .temperature(self.temperature)
            .response_format(ResponseFormat::JsonObject)
            .build()
            .map_err(|e| self.request_failed(e))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| self.request_failed(e))?;

        debug!("LLM API 调用成功");

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| TransportError::EmptyContent {
                model: self.model_name.clone(),
            })
    }

    fn request_failed(&self, err: impl std::fmt::Display) -> TransportError {
        TransportError::RequestFailed {
            model: self.model_name.clone(),
            message: err.to_string(),
        }
    }
}

impl ChatTransport for LlmService {
    fn complete<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<String, TransportError>> {
        self.send_to_llm(prompt).boxed()
    }
}
