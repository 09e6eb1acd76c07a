use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::features::render::RenderMode;

/// 全局配置单例
static CONFIG: OnceCell<AppConfig> = OnceCell::new();

/// 生产环境标识
pub const PRODUCTION: &str = "production";

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    #[serde(default = "ServerConfig::default_host")]
    pub host: String,
    /// 监听端口
    #[serde(default = "ServerConfig::default_port")]
    pub port: u16,
}

impl ServerConfig {
    fn default_host() -> String {
        "0.0.0.0".to_string()
    }
    fn default_port() -> u16 {
        8787
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别（`RUST_LOG` 未设置时生效）
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}

/// 渲染配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderSettings {
    /// 路径未指明模式时使用的模式
    #[serde(default = "RenderSettings::default_mode")]
    pub default_mode: RenderMode,
    /// 单次引擎调用时限（毫秒）
    #[serde(default = "RenderSettings::default_timeout_ms")]
    pub timeout_ms: u64,
    /// 并发渲染许可数（0=自动，取 CPU 核心数）
    #[serde(default)]
    pub max_parallel: u32,
    /// 额外字体目录（.ttf/.otf/.ttc），与系统字体一起加载
    #[serde(default = "RenderSettings::default_fonts_dir")]
    pub fonts_dir: String,
}

impl RenderSettings {
    fn default_mode() -> RenderMode {
        RenderMode::Countdown
    }
    fn default_timeout_ms() -> u64 {
        10_000
    }
    fn default_fonts_dir() -> String {
        "resources/fonts".to_string()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn fonts_path(&self) -> PathBuf {
        PathBuf::from(&self.fonts_dir)
    }
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            default_mode: Self::default_mode(),
            timeout_ms: Self::default_timeout_ms(),
            max_parallel: 0,
            fonts_dir: Self::default_fonts_dir(),
        }
    }
}

/// 响应缓存配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// 是否使用缓存命中；未设置时仅在生产环境启用（写入始终进行）
    #[serde(default)]
    pub read_enabled: Option<bool>,
    /// 新鲜期（秒），同时写入 `cache-control: max-age`
    #[serde(default = "CacheConfig::default_max_age")]
    pub max_age_secs: u64,
    /// 缓存总容量（字节，按响应大小加权）
    #[serde(default = "CacheConfig::default_max_bytes")]
    pub max_bytes: u64,
    /// 单条响应上限（字节），超过则不写入
    #[serde(default = "CacheConfig::default_max_entry_bytes")]
    pub max_entry_bytes: u64,
}

impl CacheConfig {
    fn default_max_age() -> u64 {
        3600
    }
    fn default_max_bytes() -> u64 {
        64 * 1024 * 1024
    }
    fn default_max_entry_bytes() -> u64 {
        8 * 1024 * 1024
    }

    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            read_enabled: None,
            max_age_secs: Self::default_max_age(),
            max_bytes: Self::default_max_bytes(),
            max_entry_bytes: Self::default_max_entry_bytes(),
        }
    }
}

/// 优雅退出配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShutdownConfig {
    /// 优雅退出总超时（秒）
    #[serde(default = "ShutdownConfig::default_timeout")]
    pub timeout_secs: u64,
    /// 等待后台任务（缓存写入）排空的时限（秒）
    #[serde(default = "ShutdownConfig::default_drain")]
    pub background_drain_secs: u64,
}

impl ShutdownConfig {
    fn default_timeout() -> u64 {
        30
    }
    fn default_drain() -> u64 {
        10
    }

    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn drain_duration(&self) -> Duration {
        Duration::from_secs(self.background_drain_secs)
    }
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            timeout_secs: Self::default_timeout(),
            background_drain_secs: Self::default_drain(),
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// 运行环境（`production` / `development` ...）
    #[serde(default = "AppConfig::default_environment")]
    pub environment: String,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub render: RenderSettings,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub shutdown: ShutdownConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: Self::default_environment(),
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
            render: RenderSettings::default(),
            cache: CacheConfig::default(),
            shutdown: ShutdownConfig::default(),
        }
    }
}

impl AppConfig {
    fn default_environment() -> String {
        "development".to_string()
    }

    /// 从 `config.toml`（可选）加载配置，支持环境变量覆盖
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::get_config_path())
    }

    /// 从指定文件（可不存在）加载配置
    pub fn load_from(config_path: &Path) -> Result<Self, ConfigError> {
        tracing::info!("正在从 {:?} 加载配置文件", config_path);

        let builder = ConfigBuilder::builder()
            .add_source(File::from(config_path).required(false))
            // 环境变量覆盖，嵌套字段用双下划线，例如：APP_SERVER__PORT=9000
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = builder.try_deserialize()?;
        tracing::debug!(
            "配置加载完成: environment = {}, cache.read_enabled = {}",
            config.environment,
            config.cache_read_enabled()
        );
        Ok(config)
    }

    /// 初始化全局配置
    pub fn init_global() -> Result<&'static AppConfig, ConfigError> {
        let config = Self::load()?;
        CONFIG
            .set(config)
            .map_err(|_| ConfigError::Message("配置已经被初始化".to_string()))?;
        CONFIG
            .get()
            .ok_or_else(|| ConfigError::Message("配置初始化失败".to_string()))
    }

    fn get_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    /// 获取服务器监听地址
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case(PRODUCTION)
    }

    /// 缓存命中是否生效：显式配置优先，否则仅生产环境启用
    pub fn cache_read_enabled(&self) -> bool {
        self.cache.read_enabled.unwrap_or_else(|| self.is_production())
    }

    /// 默认日志过滤器（`RUST_LOG` 未设置时使用）
    pub fn default_log_filter(&self) -> String {
        format!("gif_backend={},tower_http=info", self.logging.level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_values() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.server_addr(), "0.0.0.0:8787");
        assert_eq!(cfg.render.default_mode, RenderMode::Countdown);
        assert_eq!(cfg.render.timeout(), Duration::from_secs(10));
        assert_eq!(cfg.cache.max_age(), Duration::from_secs(3600));
        assert_eq!(cfg.cache.max_bytes, 64 * 1024 * 1024);
        assert_eq!(cfg.shutdown.drain_duration(), Duration::from_secs(10));
    }

    #[test]
    fn cache_reads_follow_environment_unless_overridden() {
        let mut cfg = AppConfig {
            environment: "development".into(),
            ..Default::default()
        };
        assert!(!cfg.cache_read_enabled());

        cfg.environment = "production".into();
        assert!(cfg.cache_read_enabled());

        cfg.cache.read_enabled = Some(false);
        assert!(!cfg.cache_read_enabled());

        cfg.environment = "development".into();
        cfg.cache.read_enabled = Some(true);
        assert!(cfg.cache_read_enabled());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let cfg = AppConfig::load_from(Path::new("definitely-not-here.toml")).expect("load");
        assert_eq!(cfg.server.port, 8787);
        assert_eq!(cfg.render.fonts_dir, "resources/fonts");
    }

    #[test]
    fn toml_sections_override_defaults() {
        let dir = std::env::temp_dir().join(format!("gif-backend-cfg-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).expect("mkdir");
        let path = dir.join("config.toml");
        std::fs::write(
            &path,
            "environment = \"production\"\n[render]\ndefault_mode = \"typing-text\"\n[cache]\nmax_age_secs = 60\n",
        )
        .expect("write");

        let cfg = AppConfig::load_from(&path).expect("load");
        assert!(cfg.is_production());
        assert_eq!(cfg.render.default_mode, RenderMode::TypingText);
        assert_eq!(cfg.cache.max_age_secs, 60);
        assert_eq!(cfg.server.port, 8787);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
