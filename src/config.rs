//! 程序配置
//!
//! 优先级：环境变量 > 配置文件（TOML，可选） > 默认值。

use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::ConfigError;

/// 程序配置
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite 数据库文件路径
    pub database_path: String,
    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    pub llm_temperature: f32,
    /// 单次请求超时（秒）
    pub request_timeout_secs: u64,
    /// 每个批次最多尝试次数
    pub max_attempts: u32,
    /// 退避基数（毫秒）
    pub retry_base_delay_ms: u64,
    // --- 并发 & batch 参数 ---
    pub batch_size: usize,
    pub max_workers: usize,
    // --- 语料来源 ---
    /// 本地 JSONL 语料，设置后优先于 Hugging Face
    pub jsonl_path: Option<String>,
    pub hf_endpoint: String,
    pub hf_dataset: String,
    pub hf_config: String,
    pub hf_split: String,
    pub hf_page_size: usize,
    /// 最多读取的文档数
    pub max_documents: usize,
    /// 每入库多少个句子提交一次事务
    pub commit_interval: usize,
    /// 含该标记的句子不参与数词提取，空字符串表示不排除
    pub exclude_marker: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: "numerals.db".to_string(),
            llm_api_key: String::new(),
            llm_api_base_url: "https://api.vectorengine.ai/v1".to_string(),
            llm_model_name: "gemini-2.5-flash".to_string(),
            llm_temperature: 0.1,
            request_timeout_secs: 30,
            max_attempts: 2,
            retry_base_delay_ms: 500,
            batch_size: 20,
            max_workers: 6,
            jsonl_path: None,
            hf_endpoint: "https://datasets-server.huggingface.co".to_string(),
            hf_dataset: "opencsg/Fineweb-Edu-Chinese-V2.1".to_string(),
            hf_config: "default".to_string(),
            hf_split: "train".to_string(),
            hf_page_size: 100,
            max_documents: 10000,
            commit_interval: 50,
            exclude_marker: "第".to_string(),
        }
    }
}

impl Config {
    /// 默认值 + 环境变量
    pub fn from_env() -> Self {
        Self::default().with_env()
    }

    /// 读取 TOML 配置文件，再用环境变量覆盖
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: path.display().to_string(),
            source,
        })?;
        let config: Config = toml::from_str(&content).map_err(|source| ConfigError::ParseFailed {
            path: path.display().to_string(),
            source,
        })?;
        Ok(config.with_env())
    }

    /// 用环境变量覆盖已设置的值
    pub fn with_env(self) -> Self {
        Self {
            database_path: env_or("DATABASE_PATH", self.database_path),
            llm_api_key: env_or("LLM_API_KEY", self.llm_api_key),
            llm_api_base_url: env_or("LLM_API_BASE_URL", self.llm_api_base_url),
            llm_model_name: env_or("LLM_MODEL_NAME", self.llm_model_name),
            llm_temperature: env_or("LLM_TEMPERATURE", self.llm_temperature),
            request_timeout_secs: env_or("REQUEST_TIMEOUT_SECS", self.request_timeout_secs),
            max_attempts: env_or("MAX_ATTEMPTS", self.max_attempts),
            retry_base_delay_ms: env_or("RETRY_BASE_DELAY_MS", self.retry_base_delay_ms),
            batch_size: env_or("BATCH_SIZE", self.batch_size),
            max_workers: env_or("MAX_WORKERS", self.max_workers),
            jsonl_path: std::env::var("JSONL_PATH").ok().or(self.jsonl_path),
            hf_endpoint: env_or("HF_ENDPOINT", self.hf_endpoint),
            hf_dataset: env_or("HF_DATASET", self.hf_dataset),
            hf_config: env_or("HF_CONFIG", self.hf_config),
            hf_split: env_or("HF_SPLIT", self.hf_split),
            hf_page_size: env_or("HF_PAGE_SIZE", self.hf_page_size),
            max_documents: env_or("MAX_DOCUMENTS", self.max_documents),
            commit_interval: env_or("COMMIT_INTERVAL", self.commit_interval),
            exclude_marker: env_or("EXCLUDE_MARKER", self.exclude_marker),
        }
    }

    /// 排除标记，空字符串视为不排除
    pub fn exclude_marker(&self) -> Option<&str> {
        Some(self.exclude_marker.as_str()).filter(|m| !m.is_empty())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(invalid("batch_size", "必须大于 0"));
        }
        if self.max_workers == 0 {
            return Err(invalid("max_workers", "必须大于 0"));
        }
        if self.max_attempts == 0 {
            return Err(invalid("max_attempts", "必须大于 0"));
        }
        if self.request_timeout_secs == 0 {
            return Err(invalid("request_timeout_secs", "必须大于 0"));
        }
        if self.commit_interval == 0 {
            return Err(invalid("commit_interval", "必须大于 0"));
        }
        if self.hf_page_size == 0 {
            return Err(invalid("hf_page_size", "必须大于 0"));
        }
        Ok(())
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field,
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.batch_size, 20);
        assert_eq!(config.max_workers, 6);
        assert_eq!(config.exclude_marker(), Some("第"));
    }

    #[test]
    fn test_zero_batch_size_is_rejected() {
        let config = Config {
            batch_size: 0,
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue {
                field: "batch_size",
                ..
            })
        ));
    }

    #[test]
    fn test_empty_marker_disables_exclusion() {
        let config = Config {
            exclude_marker: String::new(),
            ..Config::default()
        };
        assert_eq!(config.exclude_marker(), None);
    }

    #[test]
    fn test_load_partial_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_workers = 3\nllm_model_name = \"test-model\"").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.max_workers, 3);
        assert_eq!(config.llm_model_name, "test-model");
        // 未设置的字段保持默认值
        assert_eq!(config.hf_split, "train");
        assert_eq!(config.commit_interval, 50);
    }

    #[test]
    fn test_load_rejects_bad_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_workers = \"many\"").unwrap();
        assert!(matches!(
            Config::load(file.path()),
            Err(ConfigError::ParseFailed { .. })
        ));
    }
}
