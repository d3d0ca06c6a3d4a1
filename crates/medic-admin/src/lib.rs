//! # Medic管理模块
//!
//! 提供配置管理和业务监控等运维功能

pub mod config;
pub mod monitoring;

pub use config::{
    write_default_config, ConfigManager, ConfigValidator, LoggingConfig, MedicConfig, ReportConfig,
};
pub use monitoring::{ClinicalMonitor, OperationOutcome};
