//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `PRECINCT__*` 覆盖（双下划线表示嵌套，如 `PRECINCT__API__MOCK_MODE=true`）。

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::agents::Agent;
use crate::proxy::upstream::RetryPolicy;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub api: ApiSection,
    pub augment: AugmentSection,
    pub backends: BackendsSection,
    pub proxy: ProxySection,
    pub chat: ChatSection,
    pub server: ServerSection,
    /// 智能体启用状态初值（id -> enabled），未列出的一律为 false
    pub enabled_agents: HashMap<String, bool>,
    /// 智能体注册表；为空时使用内置默认列表
    pub agents: Vec<Agent>,
}

/// [app] 段：应用名、本地存储目录
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppSection {
    pub name: Option<String>,
    /// 模拟浏览器存储的目录，未设置时用 ./storage
    pub storage_dir: Option<PathBuf>,
}

impl AppSection {
    pub fn storage_dir(&self) -> PathBuf {
        self.storage_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("storage"))
    }
}

/// [api] 段：同源 API 基址、超时、重试次数、Mock 模式
#[derive(Debug, Clone, Deserialize)]
pub struct ApiSection {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_api_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    /// 为 true 时所有回复走本地模板，不发出任何网络请求
    #[serde(default)]
    pub mock_mode: bool,
}

fn default_base_url() -> String {
    "http://127.0.0.1:3000/api".to_string()
}

fn default_api_timeout_ms() -> u64 {
    10_000
}

fn default_retry_attempts() -> u32 {
    3
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_ms: default_api_timeout_ms(),
            retry_attempts: default_retry_attempts(),
            mock_mode: false,
        }
    }
}

impl ApiSection {
    /// 同源代理路由单次调用的超时
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// 首次重试前等待 1 秒，之后逐次翻倍
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry_attempts, Duration::from_secs(1))
    }
}

/// [augment] 段：远端分析开关、单次等待上限、缓存有效期
#[derive(Debug, Clone, Deserialize)]
pub struct AugmentSection {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

fn default_request_timeout_secs() -> u64 {
    15
}

fn default_cache_ttl_secs() -> u64 {
    5 * 60
}

impl Default for AugmentSection {
    fn default() -> Self {
        Self {
            enabled: false,
            request_timeout_secs: default_request_timeout_secs(),
            cache_ttl_secs: default_cache_ttl_secs(),
        }
    }
}

impl AugmentSection {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

/// [backends] 段：各罪案类型的外部分析服务地址
#[derive(Debug, Clone, Deserialize)]
pub struct BackendsSection {
    #[serde(default = "default_murder_url")]
    pub murder_url: String,
    #[serde(default = "default_murder_reset_url")]
    pub murder_reset_url: String,
    #[serde(default = "default_theft_url")]
    pub theft_url: String,
    #[serde(default = "default_finance_url")]
    pub finance_url: String,
}

fn default_murder_url() -> String {
    "http://127.0.0.1:5000/api/augment/murder".to_string()
}

fn default_murder_reset_url() -> String {
    "http://127.0.0.1:5000/api/augment/murder/reset".to_string()
}

fn default_theft_url() -> String {
    "http://127.0.0.1:5001/api/augment/theft".to_string()
}

fn default_finance_url() -> String {
    "http://127.0.0.1:5002/api/augment/financial-fraud".to_string()
}

impl Default for BackendsSection {
    fn default() -> Self {
        Self {
            murder_url: default_murder_url(),
            murder_reset_url: default_murder_reset_url(),
            theft_url: default_theft_url(),
            finance_url: default_finance_url(),
        }
    }
}

/// [proxy] 段：代理路由的超时（秒）
#[derive(Debug, Clone, Deserialize)]
pub struct ProxySection {
    #[serde(default = "default_proxy_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_reset_timeout_secs")]
    pub reset_timeout_secs: u64,
    #[serde(default = "default_check_timeout_secs")]
    pub check_timeout_secs: u64,
    /// /api/murder-agent 使用 Mock 分析模板而非兜底模板
    #[serde(default)]
    pub use_mock_murder_agent: bool,
}

fn default_proxy_timeout_secs() -> u64 {
    15
}

fn default_reset_timeout_secs() -> u64 {
    5
}

fn default_check_timeout_secs() -> u64 {
    3
}

impl Default for ProxySection {
    fn default() -> Self {
        Self {
            timeout_secs: default_proxy_timeout_secs(),
            reset_timeout_secs: default_reset_timeout_secs(),
            check_timeout_secs: default_check_timeout_secs(),
            use_mock_murder_agent: false,
        }
    }
}

/// [chat] 段：模拟输入中的延迟与多智能体错峰间隔（毫秒）
#[derive(Debug, Clone, Deserialize)]
pub struct ChatSection {
    #[serde(default = "default_typing_delay_ms")]
    pub typing_delay_ms: u64,
    #[serde(default = "default_stagger_ms")]
    pub stagger_ms: u64,
}

fn default_typing_delay_ms() -> u64 {
    1000
}

fn default_stagger_ms() -> u64 {
    1000
}

impl Default for ChatSection {
    fn default() -> Self {
        Self {
            typing_delay_ms: default_typing_delay_ms(),
            stagger_ms: default_stagger_ms(),
        }
    }
}

/// [server] 段
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl AppConfig {
    /// 远端解析是否可用：Mock 模式优先于 augment.enabled
    pub fn remote_enabled(&self) -> bool {
        self.augment.enabled && !self.api.mock_mode
    }
}

/// 从 config 目录加载配置，环境变量 PRECINCT__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 PRECINCT__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("PRECINCT")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.augment.request_timeout(), Duration::from_secs(15));
        assert_eq!(cfg.augment.cache_ttl(), Duration::from_secs(300));
        assert!(cfg.backends.murder_url.contains(":5000"));
        assert!(cfg.backends.theft_url.contains(":5001"));
        assert!(cfg.backends.finance_url.contains(":5002"));
        assert!(!cfg.remote_enabled());
        assert_eq!(cfg.api.timeout(), Duration::from_secs(10));
        assert_eq!(cfg.api.retry_policy().attempts, 3);
    }

    #[test]
    fn test_mock_mode_wins_over_augment() {
        let mut cfg = AppConfig::default();
        cfg.augment.enabled = true;
        assert!(cfg.remote_enabled());
        cfg.api.mock_mode = true;
        assert!(!cfg.remote_enabled());
    }

    #[test]
    fn test_load_from_explicit_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("precinct.toml");
        std::fs::write(
            &path,
            r#"
[chat]
typing_delay_ms = 5

[backends]
theft_url = "http://theft.local/api"

[enabled_agents]
murder = true
"#,
        )
        .unwrap();

        let cfg = load_config(Some(path)).unwrap();
        assert_eq!(cfg.chat.typing_delay_ms, 5);
        assert_eq!(cfg.backends.theft_url, "http://theft.local/api");
        assert_eq!(cfg.enabled_agents.get("murder"), Some(&true));
    }
}
