use serde::{Deserialize, Serialize};

use crate::{RegistrarError, Result};

/// 应用配置，来源为TOML文件与`REGISTRAR_`前缀的环境变量，
/// 环境变量优先
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub api: ApiConfig,
    #[serde(default)]
    pub channel: ChannelConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub retry: RetryPolicyConfig,
}

/// 渠道API访问配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub app_key: String,
    pub app_secret: String,
}

/// 渠道行为配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    #[serde(default = "default_device_type")]
    pub device_type: String,
    /// 渠道创建是否被管理端延迟/禁用
    #[serde(default)]
    pub creation_delayed: bool,
    /// 重装后复用到旧渠道(创建返回200)时是否清理named user关联
    #[serde(default)]
    pub clear_named_user_on_reinstall: bool,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            device_type: default_device_type(),
            creation_delayed: false,
            clear_named_user_on_reinstall: false,
        }
    }
}

/// 本地持久化存储配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
        }
    }
}

/// 任务重试退避配置，由分发器消费
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicyConfig {
    #[serde(default = "default_base_interval_ms")]
    pub base_interval_ms: u64,
    #[serde(default = "default_max_interval_ms")]
    pub max_interval_ms: u64,
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
    #[serde(default = "default_jitter_factor")]
    pub jitter_factor: f64,
}

impl Default for RetryPolicyConfig {
    fn default() -> Self {
        Self {
            base_interval_ms: default_base_interval_ms(),
            max_interval_ms: default_max_interval_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter_factor: default_jitter_factor(),
        }
    }
}

fn default_device_type() -> String {
    "android".to_string()
}

fn default_database_url() -> String {
    "sqlite://registrar.db".to_string()
}

fn default_base_interval_ms() -> u64 {
    10_000 // 10秒
}

fn default_max_interval_ms() -> u64 {
    300_000 // 5分钟
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_jitter_factor() -> f64 {
    0.1
}

impl AppConfig {
    /// 加载配置文件并应用环境变量覆盖
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("REGISTRAR")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .map_err(|e| RegistrarError::Configuration(format!("加载配置失败: {e}")))?;

        let app_config: AppConfig = settings
            .try_deserialize()
            .map_err(|e| RegistrarError::Configuration(format!("解析配置失败: {e}")))?;

        app_config.validate()?;
        Ok(app_config)
    }

    /// 校验配置合法性
    pub fn validate(&self) -> Result<()> {
        if self.api.base_url.is_empty() {
            return Err(RegistrarError::Configuration(
                "api.base_url不能为空".to_string(),
            ));
        }
        if self.api.app_key.is_empty() {
            return Err(RegistrarError::Configuration(
                "api.app_key不能为空".to_string(),
            ));
        }
        if self.channel.device_type.is_empty() {
            return Err(RegistrarError::Configuration(
                "channel.device_type不能为空".to_string(),
            ));
        }
        if self.retry.backoff_multiplier < 1.0 {
            return Err(RegistrarError::Configuration(
                "retry.backoff_multiplier不能小于1.0".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.retry.jitter_factor) {
            return Err(RegistrarError::Configuration(
                "retry.jitter_factor必须在0.0到1.0之间".to_string(),
            ));
        }
        Ok(())
    }
}
