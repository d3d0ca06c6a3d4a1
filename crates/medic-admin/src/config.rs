//! 配置管理
//!
//! 配置来源按优先级从低到高：内置默认值、配置文件、`MEDIC_` 前缀的环境变量。
//! 嵌套字段在环境变量中用 `__` 分隔，例如 `MEDIC_DATABASE__URL`。

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use medic_database::DatabaseConfig;
use medic_report::VitalThresholds;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info};

/// 配置管理器
#[derive(Debug)]
pub struct ConfigManager {
    /// 配置数据
    config: Arc<RwLock<MedicConfig>>,
    /// 配置验证器
    validator: ConfigValidator,
}

/// 系统完整配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MedicConfig {
    /// 数据库配置
    pub database: DatabaseConfig,
    /// 日志配置
    pub logging: LoggingConfig,
    /// 报告配置
    pub report: ReportConfig,
}

/// 日志配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志过滤指令，语法同 `RUST_LOG`
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// 报告配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// 危急生命体征阈值
    pub thresholds: VitalThresholds,
}

/// 配置验证器
#[derive(Debug)]
pub struct ConfigValidator {
    validation_rules: Vec<ValidationRule>,
}

/// 验证规则
#[derive(Debug)]
struct ValidationRule {
    /// 字段路径
    field_path: &'static str,
    validator: fn(&MedicConfig) -> std::result::Result<(), String>,
    /// 错误消息
    error_message: &'static str,
}

impl ConfigManager {
    /// 加载并验证配置；`config_path` 为空时只使用默认值和环境变量
    pub fn new(config_path: Option<&str>) -> Result<Self> {
        let config = Self::load_config(config_path)?;
        let validator = ConfigValidator::new();
        validator.validate(&config)?;

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            validator,
        })
    }

    fn load_config(config_path: Option<&str>) -> Result<MedicConfig> {
        let mut builder = Config::builder();
        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path));
        }
        let settings = builder
            .add_source(
                Environment::with_prefix("MEDIC")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to load configuration sources")?;

        let config: MedicConfig = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        match config_path {
            Some(path) => info!("Configuration loaded from: {}", path),
            None => info!("Configuration loaded from defaults and environment"),
        }
        Ok(config)
    }

    /// 获取配置
    pub async fn get_config(&self) -> MedicConfig {
        let config = self.config.read().await;
        config.clone()
    }

    /// 替换配置，新配置必须通过验证
    pub async fn update_config(&self, new_config: MedicConfig) -> Result<()> {
        self.validator.validate(&new_config)?;

        let mut config = self.config.write().await;
        *config = new_config;

        info!("Configuration updated");
        Ok(())
    }
}

/// 将默认配置以TOML格式写入文件
pub async fn write_default_config(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let content = toml::to_string_pretty(&MedicConfig::default())
        .context("Failed to serialize default configuration")?;

    tokio::fs::write(path, content)
        .await
        .with_context(|| format!("Failed to write configuration file {}", path.display()))?;

    info!("Default configuration written to: {}", path.display());
    Ok(())
}

impl ConfigValidator {
    pub fn new() -> Self {
        let validation_rules = vec![
            ValidationRule {
                field_path: "database.url",
                validator: |config| {
                    if config.database.url.trim().is_empty() {
                        Err("database url cannot be empty".to_string())
                    } else {
                        Ok(())
                    }
                },
                error_message: "Invalid database url",
            },
            ValidationRule {
                field_path: "database.max_connections",
                validator: |config| {
                    let db = &config.database;
                    if db.max_connections == 0 {
                        Err("max connections cannot be 0".to_string())
                    } else if db.min_connections > db.max_connections {
                        Err(format!(
                            "min connections {} exceeds max connections {}",
                            db.min_connections, db.max_connections
                        ))
                    } else {
                        Ok(())
                    }
                },
                error_message: "Invalid database pool size",
            },
            ValidationRule {
                field_path: "database.acquire_timeout_secs",
                validator: |config| {
                    if config.database.acquire_timeout_secs == 0 {
                        Err("acquire timeout cannot be 0".to_string())
                    } else {
                        Ok(())
                    }
                },
                error_message: "Invalid database acquire timeout",
            },
            ValidationRule {
                field_path: "logging.level",
                validator: |config| {
                    if config.logging.level.trim().is_empty() {
                        Err("log level cannot be empty".to_string())
                    } else {
                        Ok(())
                    }
                },
                error_message: "Invalid log level",
            },
            ValidationRule {
                field_path: "report.thresholds",
                validator: |config| check_thresholds(&config.report.thresholds),
                error_message: "Invalid vital sign thresholds",
            },
        ];

        Self { validation_rules }
    }

    /// 验证配置，返回第一条失败的规则
    pub fn validate(&self, config: &MedicConfig) -> Result<()> {
        for rule in &self.validation_rules {
            if let Err(e) = (rule.validator)(config) {
                error!("Configuration validation failed for {}: {}", rule.field_path, e);
                return Err(anyhow::anyhow!("{}: {}", rule.error_message, e));
            }
        }

        Ok(())
    }
}

impl Default for ConfigValidator {
    fn default() -> Self {
        Self::new()
    }
}

fn check_thresholds(t: &VitalThresholds) -> std::result::Result<(), String> {
    let ranges = [
        ("temperature", t.temperature_low, t.temperature_high),
        ("heart rate", f64::from(t.heart_rate_low), f64::from(t.heart_rate_high)),
        ("systolic", f64::from(t.systolic_low), f64::from(t.systolic_high)),
        ("diastolic", f64::from(t.diastolic_low), f64::from(t.diastolic_high)),
        (
            "respiratory rate",
            f64::from(t.respiratory_rate_low),
            f64::from(t.respiratory_rate_high),
        ),
    ];

    for (name, low, high) in ranges {
        if low >= high {
            return Err(format!("{} low {} must be below high {}", name, low, high));
        }
    }

    if !(t.oxygen_saturation_low > 0.0 && t.oxygen_saturation_low <= 100.0) {
        return Err(format!(
            "oxygen saturation low {} must be within (0, 100]",
            t.oxygen_saturation_low
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Mutex, MutexGuard};

    /// 读取 `MEDIC_` 环境变量的测试共用此锁
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn env_lock() -> MutexGuard<'static, ()> {
        ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn load(path: Option<&str>) -> Result<ConfigManager> {
        let _env = env_lock();
        ConfigManager::new(path)
    }

    fn temp_path(ext: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("medic-config-{}.{}", uuid::Uuid::new_v4(), ext))
    }

    #[test]
    fn test_default_config_is_valid() {
        let validator = ConfigValidator::new();
        assert!(validator.validate(&MedicConfig::default()).is_ok());
    }

    #[test]
    fn test_rejects_zero_max_connections() {
        let mut config = MedicConfig::default();
        config.database.max_connections = 0;

        let err = ConfigValidator::new().validate(&config).unwrap_err();
        assert!(err.to_string().contains("Invalid database pool size"));
    }

    #[test]
    fn test_rejects_min_above_max() {
        let mut config = MedicConfig::default();
        config.database.min_connections = 20;
        config.database.max_connections = 5;

        assert!(ConfigValidator::new().validate(&config).is_err());
    }

    #[test]
    fn test_rejects_inverted_thresholds() {
        let mut config = MedicConfig::default();
        config.report.thresholds.heart_rate_low = 130;

        let err = ConfigValidator::new().validate(&config).unwrap_err();
        assert!(err.to_string().contains("heart rate"));

        let mut config = MedicConfig::default();
        config.report.thresholds.oxygen_saturation_low = 120.0;
        assert!(ConfigValidator::new().validate(&config).is_err());
    }

    #[tokio::test]
    async fn test_load_partial_file() {
        let path = temp_path("toml");
        std::fs::write(
            &path,
            r#"
[database]
url = "postgresql://ward:secret@db/ward"
max_connections = 4

[report.thresholds]
heart_rate_high = 110
"#,
        )
        .unwrap();

        let manager = load(path.to_str()).unwrap();
        let config = manager.get_config().await;
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.database.url, "postgresql://ward:secret@db/ward");
        assert_eq!(config.database.max_connections, 4);
        assert_eq!(config.database.min_connections, 1);
        assert_eq!(config.report.thresholds.heart_rate_high, 110);
        assert_eq!(config.report.thresholds.heart_rate_low, 50);
    }

    #[test]
    fn test_invalid_file_rejected() {
        let path = temp_path("toml");
        std::fs::write(&path, "[database]\nmax_connections = 0\n").unwrap();

        let result = load(path.to_str());
        std::fs::remove_file(&path).unwrap();
        assert!(result.is_err());
    }

    #[test]
    fn test_environment_override() {
        let manager = {
            let _env = env_lock();
            std::env::set_var("MEDIC_LOGGING__LEVEL", "medic_ward=debug");
            let manager = ConfigManager::new(None);
            std::env::remove_var("MEDIC_LOGGING__LEVEL");
            manager.unwrap()
        };

        let config = manager.config.try_read().unwrap().clone();
        assert_eq!(config.logging.level, "medic_ward=debug");

        let config = load(None).unwrap().config.try_read().unwrap().clone();
        assert_eq!(config.logging.level, "info");
    }

    #[tokio::test]
    async fn test_write_default_round_trips() {
        let path = temp_path("toml");
        write_default_config(&path).await.unwrap();

        let manager = load(path.to_str()).unwrap();
        let config = manager.get_config().await;
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.database, DatabaseConfig::default());
        assert_eq!(config.report, ReportConfig::default());
    }

    #[tokio::test]
    async fn test_update_rejects_invalid() {
        let manager = load(None).unwrap();
        let mut bad = manager.get_config().await;
        bad.database.url = String::new();

        assert!(manager.update_config(bad).await.is_err());
        assert!(!manager.get_config().await.database.url.is_empty());
    }
}
