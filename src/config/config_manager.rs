// ==========================================
// 智能配送路由系统 - 配置管理器
// ==========================================
// 职责: 配置加载、环境变量覆写、校验、快照
// 优先级: 环境变量 > 配置文件 > 默认值
// ==========================================

use crate::config::dispatch_config::DispatchConfig;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

// ==========================================
// 配置键(环境变量)
// ==========================================
pub mod config_keys {
    pub const ORS_API_KEY: &str = "ORS_API_KEY";
    pub const MAX_CONCURRENCY: &str = "SMART_ROUTING_MAX_CONCURRENCY";
    pub const SEED: &str = "SMART_ROUTING_SEED";
    pub const EXPLICIT_CONFIRM: &str = "SMART_ROUTING_EXPLICIT_CONFIRM";
    pub const CONFIG_PATH: &str = "SMART_ROUTING_CONFIG";
}

/// 默认配置文件名
pub const CONFIG_FILE_NAME: &str = "config.json";

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置文件读取失败 ({path}): {message}")]
    ReadError { path: String, message: String },

    #[error("配置文件格式错误 ({path}): {message}")]
    ParseError { path: String, message: String },

    #[error("配置值格式错误 (key: {key}, value: {value})")]
    InvalidOverride { key: String, value: String },

    #[error("配置值不合法 ({field}): {message}")]
    InvalidValue { field: String, message: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: DispatchConfig,
    source: Option<PathBuf>,
}

impl ConfigManager {
    /// 直接使用给定配置(会执行校验)
    pub fn from_config(config: DispatchConfig) -> ConfigResult<Self> {
        validate(&config)?;
        Ok(Self {
            config,
            source: None,
        })
    }

    /// 加载配置
    ///
    /// # 参数
    /// - path: 显式配置文件路径;None 时依次查找
    ///   `$SMART_ROUTING_CONFIG`、`<config_dir>/smart-routing/config.json`,都不存在则用默认值
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let source = match path {
            Some(p) => Some(p.to_path_buf()),
            None => default_config_path().filter(|p| p.exists()),
        };

        let mut config = match &source {
            Some(p) => read_config_file(p)?,
            None => {
                debug!("未找到配置文件,使用默认配置");
                DispatchConfig::default()
            }
        };

        apply_overrides(&mut config, |key| std::env::var(key).ok())?;
        validate(&config)?;

        info!(
            source = %source.as_ref().map(|p| p.display().to_string()).unwrap_or_else(|| "<default>".to_string()),
            "配置加载完成"
        );

        Ok(Self { config, source })
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// 生效配置快照(JSON,API Key 脱敏)
    pub fn snapshot(&self) -> String {
        let mut redacted = self.config.clone();
        if redacted.providers.openrouteservice.api_key.is_some() {
            redacted.providers.openrouteservice.api_key = Some("***".to_string());
        }
        serde_json::to_string(&redacted).unwrap_or_else(|_| "{}".to_string())
    }
}

/// 默认配置文件路径
pub fn default_config_path() -> Option<PathBuf> {
    if let Ok(p) = std::env::var(config_keys::CONFIG_PATH) {
        return Some(PathBuf::from(p));
    }
    dirs::config_dir().map(|d| d.join("smart-routing").join(CONFIG_FILE_NAME))
}

fn read_config_file(path: &Path) -> ConfigResult<DispatchConfig> {
    let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    serde_json::from_str(&raw).map_err(|e| ConfigError::ParseError {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

/// 应用环境变量覆写
///
/// `lookup` 按键返回变量值,便于测试注入
pub fn apply_overrides<F>(config: &mut DispatchConfig, lookup: F) -> ConfigResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(key) = lookup(config_keys::ORS_API_KEY).filter(|v| !v.trim().is_empty()) {
        config.providers.openrouteservice.api_key = Some(key.trim().to_string());
    }

    if let Some(value) = lookup(config_keys::MAX_CONCURRENCY) {
        config.max_concurrency = parse_override(config_keys::MAX_CONCURRENCY, &value)?;
    }

    if let Some(value) = lookup(config_keys::SEED) {
        config.clustering.seed = parse_override(config_keys::SEED, &value)?;
    }

    if let Some(value) = lookup(config_keys::EXPLICIT_CONFIRM) {
        config.workflow.require_explicit_confirmation = match value.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "y" | "on" => true,
            "0" | "false" | "no" | "n" | "off" => false,
            _ => {
                return Err(ConfigError::InvalidOverride {
                    key: config_keys::EXPLICIT_CONFIRM.to_string(),
                    value,
                })
            }
        };
    }

    Ok(())
}

fn parse_override<T: std::str::FromStr>(key: &str, value: &str) -> ConfigResult<T> {
    value.trim().parse::<T>().map_err(|_| ConfigError::InvalidOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

/// 配置合法性校验
pub fn validate(config: &DispatchConfig) -> ConfigResult<()> {
    let invalid = |field: &str, message: &str| ConfigError::InvalidValue {
        field: field.to_string(),
        message: message.to_string(),
    };

    if config.max_concurrency == 0 {
        return Err(invalid("max_concurrency", "必须 >= 1"));
    }
    if config.request_timeout_secs == 0 {
        return Err(invalid("request_timeout_secs", "必须 > 0"));
    }
    if config.clustering.n_init == 0 {
        return Err(invalid("clustering.n_init", "必须 >= 1"));
    }
    if config.clustering.max_iterations == 0 {
        return Err(invalid("clustering.max_iterations", "必须 >= 1"));
    }
    if !(config.clustering.tolerance >= 0.0) {
        return Err(invalid("clustering.tolerance", "必须 >= 0"));
    }
    if !(config.providers.nominatim.requests_per_second > 0.0) {
        return Err(invalid("providers.nominatim.requests_per_second", "必须 > 0"));
    }
    if !(config.providers.openrouteservice.requests_per_second > 0.0) {
        return Err(invalid("providers.openrouteservice.requests_per_second", "必须 > 0"));
    }
    if config.workflow.max_fix_attempts == Some(0) {
        return Err(invalid("workflow.max_fix_attempts", "必须 >= 1 或 null"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_overrides_applied() {
        let mut config = DispatchConfig::default();
        apply_overrides(
            &mut config,
            lookup_from(&[
                (config_keys::ORS_API_KEY, " secret "),
                (config_keys::MAX_CONCURRENCY, "8"),
                (config_keys::SEED, "1"),
                (config_keys::EXPLICIT_CONFIRM, "yes"),
            ]),
        )
        .unwrap();

        assert_eq!(config.providers.openrouteservice.api_key.as_deref(), Some("secret"));
        assert_eq!(config.max_concurrency, 8);
        assert_eq!(config.clustering.seed, 1);
        assert!(config.workflow.require_explicit_confirmation);
    }

    #[test]
    fn test_invalid_override_rejected() {
        let mut config = DispatchConfig::default();
        let err = apply_overrides(&mut config, lookup_from(&[(config_keys::SEED, "abc")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidOverride { .. }));
    }

    #[test]
    fn test_validate_rejects_zero_concurrency() {
        let mut config = DispatchConfig::default();
        config.max_concurrency = 0;
        assert!(ConfigManager::from_config(config).is_err());
    }

    #[test]
    fn test_load_from_file_and_redacted_snapshot() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"providers": {{"openrouteservice": {{"api_key": "top-secret"}}}}, "max_concurrency": 2}}"#
        )
        .unwrap();

        let manager = ConfigManager::load(Some(file.path())).unwrap();
        assert_eq!(manager.config().max_concurrency, 2);
        assert_eq!(manager.source(), Some(file.path()));

        let snapshot = manager.snapshot();
        assert!(!snapshot.contains("top-secret"));
        assert!(snapshot.contains("***"));
    }

    #[test]
    fn test_load_missing_file_is_error() {
        let err = ConfigManager::load(Some(Path::new("/definitely/not/here.json"))).unwrap_err();
        assert!(matches!(err, ConfigError::ReadError { .. }));
    }
}
