//! 错误类型
//!
//! 内部函数返回 PrecinctError；解析器、代理路由与编排器在离错误源最近的边界吸收它，降级为可用文本。

use thiserror::Error;

/// 运行过程中可能出现的错误（网络、超时、上游格式、存储、配置）
#[derive(Error, Debug)]
pub enum PrecinctError {
    #[error("Request timed out after {0} ms")]
    Timeout(u64),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Upstream returned status {0}")]
    UpstreamStatus(u16),

    #[error("Malformed upstream body: {0}")]
    MalformedUpstream(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),
}

impl PrecinctError {
    /// 超时单独处理：代理路由对超时返回固定的「响应过慢」提示
    pub fn is_timeout(&self) -> bool {
        matches!(self, PrecinctError::Timeout(_))
    }

    /// 上游 4xx：请求本身有误，重试无意义
    pub fn is_client_error(&self) -> bool {
        matches!(self, PrecinctError::UpstreamStatus(400..=499))
    }
}

impl From<reqwest::Error> for PrecinctError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            PrecinctError::Timeout(0)
        } else if let Some(status) = err.status() {
            PrecinctError::UpstreamStatus(status.as_u16())
        } else if err.is_decode() {
            PrecinctError::MalformedUpstream(err.to_string())
        } else {
            PrecinctError::Network(err.to_string())
        }
    }
}

impl From<std::io::Error> for PrecinctError {
    fn from(err: std::io::Error) -> Self {
        PrecinctError::Storage(err.to_string())
    }
}

impl From<config::ConfigError> for PrecinctError {
    fn from(err: config::ConfigError) -> Self {
        PrecinctError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PrecinctError>;
