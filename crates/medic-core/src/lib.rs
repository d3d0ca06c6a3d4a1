//! # Medic Core
//!
//! 病历系统的核心模块，提供基础数据结构、错误定义、存储网关契约和通用工具。

pub mod error;
pub mod gateway;
pub mod models;
pub mod utils;

pub use error::{Entity, MedicError, ReportSection, Result};
pub use gateway::{GatewayTransaction, StorageGateway};
pub use models::*;
