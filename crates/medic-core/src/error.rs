//! 错误定义模块

use crate::models::{BedId, PatientId, WardId};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// 未找到的实体
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Entity {
    Patient(PatientId),
    Bed(BedId),
    Ward(WardId),
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::Patient(id) => write!(f, "patient {}", id),
            Entity::Bed(id) => write!(f, "bed {}", id),
            Entity::Ward(id) => write!(f, "ward {}", id),
        }
    }
}

/// 报告中可单独降级的子记录类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ReportSection {
    Diagnoses,
    Dosages,
    Results,
}

impl fmt::Display for ReportSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportSection::Diagnoses => write!(f, "diagnoses"),
            ReportSection::Dosages => write!(f, "dosages"),
            ReportSection::Results => write!(f, "results"),
        }
    }
}

/// 病历系统统一错误类型
#[derive(Error, Debug)]
pub enum MedicError {
    #[error("配置错误: {0}")]
    Config(String),

    #[error("资源未找到: {0}")]
    NotFound(Entity),

    #[error("床位冲突: bed {0} is already occupied")]
    BedOccupied(BedId),

    #[error("存储暂不可用: {0}")]
    Unavailable(String),

    #[error("数据库错误: {0}")]
    Database(String),

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("验证错误: {0}")]
    Validation(String),

    #[error("子记录获取失败 ({section}): {source}")]
    PartialAggregation {
        section: ReportSection,
        #[source]
        source: Box<MedicError>,
    },

    #[error("系统内部错误: {0}")]
    Internal(String),
}

impl MedicError {
    /// 调用方稍后重试是否可能成功
    pub fn is_retryable(&self) -> bool {
        matches!(self, MedicError::Unavailable(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, MedicError::BedOccupied(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, MedicError::NotFound(_))
    }
}

#[cfg(feature = "database")]
impl From<sqlx::Error> for MedicError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
            | sqlx::Error::Io(_) => MedicError::Unavailable(err.to_string()),
            // serialization_failure / deadlock_detected
            sqlx::Error::Database(ref db)
                if matches!(db.code().as_deref(), Some("40001") | Some("40P01")) =>
            {
                MedicError::Unavailable(err.to_string())
            }
            other => MedicError::Database(other.to_string()),
        }
    }
}

/// 病历系统统一结果类型
pub type Result<T> = std::result::Result<T, MedicError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(MedicError::Unavailable("pool timed out".into()).is_retryable());
        assert!(!MedicError::BedOccupied(BedId(4)).is_retryable());
        assert!(MedicError::BedOccupied(BedId(4)).is_conflict());
        assert!(MedicError::NotFound(Entity::Bed(BedId(4))).is_not_found());
    }

    #[test]
    fn test_not_found_names_entity() {
        assert_eq!(Entity::Ward(WardId(3)).to_string(), "ward 3");
        let err = MedicError::NotFound(Entity::Patient(PatientId(12)));
        assert!(err.to_string().contains("patient 12"));
    }
}

#[cfg(all(test, feature = "database"))]
mod sqlx_tests {
    use super::*;

    #[test]
    fn test_pool_failures_are_unavailable() {
        for err in [sqlx::Error::PoolTimedOut, sqlx::Error::PoolClosed] {
            let mapped = MedicError::from(err);
            assert!(matches!(mapped, MedicError::Unavailable(_)));
            assert!(mapped.is_retryable());
        }

        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset by peer");
        assert!(MedicError::from(sqlx::Error::Io(io)).is_retryable());
    }

    #[test]
    fn test_other_failures_are_database_errors() {
        let mapped = MedicError::from(sqlx::Error::RowNotFound);
        assert!(matches!(mapped, MedicError::Database(_)));
        assert!(!mapped.is_retryable());
    }
}
