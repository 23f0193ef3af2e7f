//! 按罪案类型转发到外部分析服务的代理
//!
//! 代理永远返回可展示的回复：远端成功时透传正文，超时返回固定提示，其余失败降级为本地分析。

pub mod direct;
pub mod fallback;
pub mod murder;
pub mod payload;
pub mod upstream;

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::core::error::{PrecinctError, Result};

pub use direct::{CaseBackend, CaseKind, DirectRequest, DirectResponse};
pub use murder::{MurderBackend, MurderChannel, MurderDirectResponse, MurderReply, MurderRequest};

/// 回复来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Source {
    DirectBackend,
    Error,
    Fallback,
}

/// 三个外部服务的客户端
#[derive(Debug, Clone)]
pub struct Proxies {
    pub murder: MurderBackend,
    pub theft: CaseBackend,
    pub finance: CaseBackend,
}

impl Proxies {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let client = http_client(config)?;
        let timeout = Duration::from_secs(config.proxy.timeout_secs);
        Ok(Self {
            murder: MurderBackend::new(client.clone(), config),
            theft: CaseBackend::new(
                CaseKind::Theft,
                client.clone(),
                config.backends.theft_url.clone(),
                timeout,
            ),
            finance: CaseBackend::new(
                CaseKind::Finance,
                client,
                config.backends.finance_url.clone(),
                timeout,
            ),
        })
    }
}

/// 共享的 HTTP 客户端；单次请求上限取代理超时与解析超时中较大者
pub fn http_client(config: &AppConfig) -> Result<reqwest::Client> {
    let limit = config
        .proxy
        .timeout_secs
        .max(config.augment.request_timeout_secs);
    reqwest::Client::builder()
        .timeout(Duration::from_secs(limit))
        .build()
        .map_err(|e| PrecinctError::Network(e.to_string()))
}
