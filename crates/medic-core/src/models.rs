//! 核心数据模型定义

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i32);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i32> for $name {
            fn from(value: i32) -> Self {
                Self(value)
            }
        }
    };
}

entity_id!(
    /// 患者ID
    PatientId
);
entity_id!(
    /// 床位ID
    BedId
);
entity_id!(
    /// 病房ID
    WardId
);

/// 性别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    /// 数据库中的单字符编码
    pub fn code(&self) -> &'static str {
        match self {
            Gender::Male => "M",
            Gender::Female => "F",
            Gender::Other => "O",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "M" => Some(Gender::Male),
            "F" => Some(Gender::Female),
            "O" => Some(Gender::Other),
            _ => None,
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gender::Male => write!(f, "Male"),
            Gender::Female => write!(f, "Female"),
            Gender::Other => write!(f, "Other"),
        }
    }
}

/// 患者基本信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub id: PatientId,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub contact_number: Option<String>,
    pub bed_id: Option<BedId>, // 当前床位，只能由床位分配管理器修改
}

impl Patient {
    /// 报告中显示的姓名
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// 病房
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ward {
    pub id: WardId,
    pub name: String,
    pub location: String,
}

/// 床位
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bed {
    pub id: BedId,
    pub ward_id: WardId,
    pub bed_number: String, // 显示编号
    pub bed_row: i32,
    pub bed_column: i32,
    pub occupied: bool,
}

/// 生命体征
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vitals {
    pub id: i32,
    pub patient_id: PatientId,
    pub temperature: f64,            // °C
    pub heart_rate: i32,             // 次/分
    pub blood_pressure_systolic: i32, // mmHg
    pub blood_pressure_diastolic: i32,
    pub respiratory_rate: i32,       // 次/分
    pub oxygen_saturation: f64,      // %
    pub note: Option<String>,
}

/// 体格测量
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Biometrics {
    pub id: i32,
    pub patient_id: PatientId,
    pub mass: f64,   // kg
    pub height: f64, // cm
    pub waist_circumference: f64,
}

/// 诊断
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnosis {
    pub id: i32,
    pub patient_id: PatientId,
    pub diagnosed: Option<String>,
    pub symptoms: Option<String>,
    pub signs: Option<String>,
    pub treatment: Option<String>,
}

/// 用药
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dosage {
    pub id: i32,
    pub patient_id: PatientId,
    pub drug_name: String,
    pub amount: String,
    pub prescription: String,
    pub caution: Option<String>,
    pub note: Option<String>,
}

/// 检验结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub id: i32,
    pub patient_id: PatientId,
    pub result_code: String,
    pub description: String,
    pub result_type: String,
    pub test_method: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_skips_middle_name() {
        let patient = Patient {
            id: PatientId(1),
            first_name: "Ada".to_string(),
            middle_name: Some("K".to_string()),
            last_name: "Obi".to_string(),
            date_of_birth: None,
            gender: Some(Gender::Female),
            contact_number: None,
            bed_id: None,
        };
        assert_eq!(patient.display_name(), "Ada Obi");
    }

    #[test]
    fn test_gender_codes() {
        for gender in [Gender::Male, Gender::Female, Gender::Other] {
            assert_eq!(Gender::from_code(gender.code()), Some(gender));
        }
        assert_eq!(Gender::from_code("X"), None);
    }
}
