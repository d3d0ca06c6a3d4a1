//! 数据库模型

use chrono::{DateTime, NaiveDate, Utc};
use medic_core::models::*;
use sqlx::FromRow;

// 数据库表模型 - 使用FromRow trait用于SQL查询

/// 数据库患者表
#[derive(Debug, FromRow)]
pub struct DbPatient {
    pub id: i32,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>, // 存储为单字符，转换为Gender枚举
    pub contact_number: Option<String>,
    pub bed_id: Option<i32>,
}

impl From<DbPatient> for Patient {
    fn from(row: DbPatient) -> Self {
        Patient {
            id: PatientId(row.id),
            first_name: row.first_name,
            middle_name: row.middle_name,
            last_name: row.last_name,
            date_of_birth: row.date_of_birth,
            gender: row.gender.as_deref().and_then(Gender::from_code),
            contact_number: row.contact_number,
            bed_id: row.bed_id.map(BedId),
        }
    }
}

/// 数据库病房表
#[derive(Debug, FromRow)]
pub struct DbWard {
    pub id: i32,
    pub name: String,
    pub location: String,
}

impl From<DbWard> for Ward {
    fn from(row: DbWard) -> Self {
        Ward {
            id: WardId(row.id),
            name: row.name,
            location: row.location,
        }
    }
}

/// 数据库床位表
#[derive(Debug, FromRow)]
pub struct DbBed {
    pub id: i32,
    pub ward_id: i32,
    pub bed_number: String,
    pub bed_row: i32,
    pub bed_column: i32,
    pub occupied: bool,
}

impl From<DbBed> for Bed {
    fn from(row: DbBed) -> Self {
        Bed {
            id: BedId(row.id),
            ward_id: WardId(row.ward_id),
            bed_number: row.bed_number,
            bed_row: row.bed_row,
            bed_column: row.bed_column,
            occupied: row.occupied,
        }
    }
}

/// 数据库生命体征表
#[derive(Debug, FromRow)]
pub struct DbVitals {
    pub id: i32,
    pub patient_id: i32,
    pub temperature: f64,
    pub heart_rate: i32,
    pub blood_pressure_systolic: i32,
    pub blood_pressure_diastolic: i32,
    pub respiratory_rate: i32,
    pub oxygen_saturation: f64,
    pub note: Option<String>,
}

impl From<DbVitals> for Vitals {
    fn from(row: DbVitals) -> Self {
        Vitals {
            id: row.id,
            patient_id: PatientId(row.patient_id),
            temperature: row.temperature,
            heart_rate: row.heart_rate,
            blood_pressure_systolic: row.blood_pressure_systolic,
            blood_pressure_diastolic: row.blood_pressure_diastolic,
            respiratory_rate: row.respiratory_rate,
            oxygen_saturation: row.oxygen_saturation,
            note: row.note,
        }
    }
}

/// 数据库体格测量表
#[derive(Debug, FromRow)]
pub struct DbBiometrics {
    pub id: i32,
    pub patient_id: i32,
    pub mass: f64,
    pub height: f64,
    pub waist_circumference: f64,
}

impl From<DbBiometrics> for Biometrics {
    fn from(row: DbBiometrics) -> Self {
        Biometrics {
            id: row.id,
            patient_id: PatientId(row.patient_id),
            mass: row.mass,
            height: row.height,
            waist_circumference: row.waist_circumference,
        }
    }
}

/// 数据库诊断表
#[derive(Debug, FromRow)]
pub struct DbDiagnosis {
    pub id: i32,
    pub patient_id: i32,
    pub diagnosed: Option<String>,
    pub symptoms: Option<String>,
    pub signs: Option<String>,
    pub treatment: Option<String>,
}

impl From<DbDiagnosis> for Diagnosis {
    fn from(row: DbDiagnosis) -> Self {
        Diagnosis {
            id: row.id,
            patient_id: PatientId(row.patient_id),
            diagnosed: row.diagnosed,
            symptoms: row.symptoms,
            signs: row.signs,
            treatment: row.treatment,
        }
    }
}

/// 数据库用药表
#[derive(Debug, FromRow)]
pub struct DbDosage {
    pub id: i32,
    pub patient_id: i32,
    pub drug_name: String,
    pub amount: String,
    pub prescription: String,
    pub caution: Option<String>,
    pub note: Option<String>,
}

impl From<DbDosage> for Dosage {
    fn from(row: DbDosage) -> Self {
        Dosage {
            id: row.id,
            patient_id: PatientId(row.patient_id),
            drug_name: row.drug_name,
            amount: row.amount,
            prescription: row.prescription,
            caution: row.caution,
            note: row.note,
        }
    }
}

/// 数据库检验结果表
#[derive(Debug, FromRow)]
pub struct DbTestResult {
    pub id: i32,
    pub patient_id: i32,
    pub result_code: String,
    pub description: String,
    pub result_type: String,
    pub test_method: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<DbTestResult> for TestResult {
    fn from(row: DbTestResult) -> Self {
        TestResult {
            id: row.id,
            patient_id: PatientId(row.patient_id),
            result_code: row.result_code,
            description: row.description,
            result_type: row.result_type,
            test_method: row.test_method,
            notes: row.notes,
            created_at: row.created_at,
        }
    }
}

// 插入模型 - 用于创建新记录

/// 新患者插入模型
#[derive(Debug, Clone)]
pub struct NewPatient {
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub contact_number: Option<String>,
}

/// 新床位插入模型
#[derive(Debug, Clone)]
pub struct NewBed {
    pub ward_id: WardId,
    pub bed_number: String,
    pub bed_row: i32,
    pub bed_column: i32,
}

/// 新生命体征插入模型
#[derive(Debug, Clone)]
pub struct NewVitals {
    pub temperature: f64,
    pub heart_rate: i32,
    pub blood_pressure_systolic: i32,
    pub blood_pressure_diastolic: i32,
    pub respiratory_rate: i32,
    pub oxygen_saturation: f64,
    pub note: Option<String>,
}

/// 新体格测量插入模型
#[derive(Debug, Clone)]
pub struct NewBiometrics {
    pub mass: f64,
    pub height: f64,
    pub waist_circumference: f64,
}

/// 新诊断插入模型
#[derive(Debug, Clone, Default)]
pub struct NewDiagnosis {
    pub diagnosed: Option<String>,
    pub symptoms: Option<String>,
    pub signs: Option<String>,
    pub treatment: Option<String>,
}

/// 新用药插入模型
#[derive(Debug, Clone)]
pub struct NewDosage {
    pub drug_name: String,
    pub amount: String,
    pub prescription: String,
    pub caution: Option<String>,
    pub note: Option<String>,
}

/// 新检验结果插入模型
#[derive(Debug, Clone)]
pub struct NewTestResult {
    pub result_code: String,
    pub description: String,
    pub result_type: String,
    pub test_method: String,
    pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patient_row_conversion() {
        let row = DbPatient {
            id: 7,
            first_name: "Jane".to_string(),
            middle_name: None,
            last_name: "Doe".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(1980, 1, 1),
            gender: Some("F".to_string()),
            contact_number: None,
            bed_id: Some(3),
        };
        let patient = Patient::from(row);
        assert_eq!(patient.id, PatientId(7));
        assert_eq!(patient.gender, Some(Gender::Female));
        assert_eq!(patient.bed_id, Some(BedId(3)));
    }

    #[test]
    fn test_unknown_gender_code_is_dropped() {
        let row = DbPatient {
            id: 1,
            first_name: "A".to_string(),
            middle_name: None,
            last_name: "B".to_string(),
            date_of_birth: None,
            gender: Some("?".to_string()),
            contact_number: None,
            bed_id: None,
        };
        assert_eq!(Patient::from(row).gender, None);
    }
}
