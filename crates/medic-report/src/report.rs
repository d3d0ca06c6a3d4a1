//! 临床报告
//!
//! 报告在构建完成后不可变，所有派生字段（年龄、BMI、危急标记、摘要）
//! 都在组装时一次性计算。

use chrono::{DateTime, NaiveDate, Utc};
use medic_core::utils::{age_in_years, is_blank};
use medic_core::{
    Biometrics, Diagnosis, Dosage, Gender, Patient, PatientId, ReportSection, TestResult, Vitals,
};
use serde::Serialize;
use std::fmt;

use crate::vitals::{VitalSign, VitalThresholds};

/// 没有任何有效诊断时的摘要
pub const NO_DIAGNOSES: &str = "No diagnoses available";

/// BMI分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BmiCategory {
    Underweight,
    Normal,
    Overweight,
    Obese,
}

impl BmiCategory {
    /// 各分类上界不含本身
    pub fn from_bmi(bmi: f64) -> Self {
        if bmi < 18.5 {
            BmiCategory::Underweight
        } else if bmi < 25.0 {
            BmiCategory::Normal
        } else if bmi < 30.0 {
            BmiCategory::Overweight
        } else {
            BmiCategory::Obese
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BmiCategory::Underweight => "Underweight",
            BmiCategory::Normal => "Normal",
            BmiCategory::Overweight => "Overweight",
            BmiCategory::Obese => "Obese",
        }
    }
}

impl fmt::Display for BmiCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 身高(cm)为正时计算BMI
pub fn body_mass_index(biometrics: &Biometrics) -> Option<f64> {
    if biometrics.height > 0.0 {
        let meters = biometrics.height / 100.0;
        Some(biometrics.mass / (meters * meters))
    } else {
        None
    }
}

/// 用 "; " 连接非空诊断
pub fn summarize(diagnoses: &[Diagnosis]) -> String {
    let parts: Vec<&str> = diagnoses
        .iter()
        .filter(|d| !is_blank(d.diagnosed.as_deref()))
        .filter_map(|d| d.diagnosed.as_deref())
        .collect();

    if parts.is_empty() {
        NO_DIAGNOSES.to_string()
    } else {
        parts.join("; ")
    }
}

/// 组装报告所需的原始记录
#[derive(Debug, Clone)]
pub(crate) struct ReportInputs {
    pub patient: Patient,
    pub vitals: Option<Vitals>,
    pub biometrics: Option<Biometrics>,
    pub diagnoses: Vec<Diagnosis>,
    pub dosages: Vec<Dosage>,
    pub results: Vec<TestResult>,
    pub degraded_sections: Vec<ReportSection>,
}

/// 患者临床报告
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    patient_id: PatientId,
    patient_name: String,
    age: u32,
    gender: Option<Gender>,
    vitals: Option<Vitals>,
    biometrics: Option<Biometrics>,
    bmi: Option<f64>,
    bmi_category: Option<BmiCategory>,
    critical_vitals: bool,
    critical_signs: Vec<VitalSign>,
    diagnoses: Vec<Diagnosis>,
    dosages: Vec<Dosage>,
    results: Vec<TestResult>,
    summary: String,
    degraded_sections: Vec<ReportSection>,
    generated_at: DateTime<Utc>,
}

impl Report {
    pub(crate) fn assemble(
        inputs: ReportInputs,
        thresholds: &VitalThresholds,
        now: DateTime<Utc>,
    ) -> Self {
        let ReportInputs {
            patient,
            vitals,
            biometrics,
            diagnoses,
            dosages,
            results,
            degraded_sections,
        } = inputs;

        let today: NaiveDate = now.date_naive();
        let age = patient
            .date_of_birth
            .map_or(0, |dob| age_in_years(dob, today));

        let bmi = biometrics.as_ref().and_then(body_mass_index);
        let critical_signs = vitals
            .as_ref()
            .map(|v| thresholds.critical_signs(v))
            .unwrap_or_default();

        Self {
            patient_id: patient.id,
            patient_name: patient.display_name(),
            age,
            gender: patient.gender,
            vitals,
            biometrics,
            bmi,
            bmi_category: bmi.map(BmiCategory::from_bmi),
            critical_vitals: !critical_signs.is_empty(),
            critical_signs,
            summary: summarize(&diagnoses),
            diagnoses,
            dosages,
            results,
            degraded_sections,
            generated_at: now,
        }
    }

    pub fn patient_id(&self) -> PatientId {
        self.patient_id
    }

    pub fn patient_name(&self) -> &str {
        &self.patient_name
    }

    pub fn age(&self) -> u32 {
        self.age
    }

    pub fn gender(&self) -> Option<Gender> {
        self.gender
    }

    pub fn vitals(&self) -> Option<&Vitals> {
        self.vitals.as_ref()
    }

    pub fn biometrics(&self) -> Option<&Biometrics> {
        self.biometrics.as_ref()
    }

    pub fn bmi(&self) -> Option<f64> {
        self.bmi
    }

    pub fn bmi_category(&self) -> Option<BmiCategory> {
        self.bmi_category
    }

    pub fn critical_vitals(&self) -> bool {
        self.critical_vitals
    }

    /// 超出阈值的具体体征
    pub fn critical_signs(&self) -> &[VitalSign] {
        &self.critical_signs
    }

    pub fn diagnoses(&self) -> &[Diagnosis] {
        &self.diagnoses
    }

    pub fn dosages(&self) -> &[Dosage] {
        &self.dosages
    }

    /// 检验结果，按时间倒序
    pub fn results(&self) -> &[TestResult] {
        &self.results
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    /// 获取失败、以空集合代替的部分
    pub fn degraded_sections(&self) -> &[ReportSection] {
        &self.degraded_sections
    }

    pub fn is_degraded(&self) -> bool {
        !self.degraded_sections.is_empty()
    }

    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    pub fn has_medications(&self) -> bool {
        !self.dosages.is_empty()
    }

    pub fn has_test_results(&self) -> bool {
        !self.results.is_empty()
    }

    /// 形如 "Ada Obi, 42 years, Female"
    pub fn formatted_patient_info(&self) -> String {
        let gender = self
            .gender
            .map_or_else(|| "Unknown".to_string(), |g| g.to_string());
        format!("{}, {} years, {}", self.patient_name, self.age, gender)
    }

    pub fn formatted_blood_pressure(&self) -> String {
        match &self.vitals {
            Some(v) => format!(
                "{}/{} mmHg",
                v.blood_pressure_systolic, v.blood_pressure_diastolic
            ),
            None => "N/A".to_string(),
        }
    }

    /// 投影为精简报告，不重新计算任何字段
    pub fn compact(&self) -> CompactReport {
        CompactReport {
            patient_id: self.patient_id,
            patient_name: self.patient_name.clone(),
            age: self.age,
            gender: self.gender,
            summary: self.summary.clone(),
            critical_vitals: self.critical_vitals,
            bmi: self.bmi,
            bmi_category: self.bmi_category,
        }
    }
}

/// 精简报告
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompactReport {
    pub patient_id: PatientId,
    pub patient_name: String,
    pub age: u32,
    pub gender: Option<Gender>,
    pub summary: String,
    pub critical_vitals: bool,
    pub bmi: Option<f64>,
    pub bmi_category: Option<BmiCategory>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn patient() -> Patient {
        Patient {
            id: PatientId(7),
            first_name: "Ada".to_string(),
            middle_name: None,
            last_name: "Obi".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(1980, 6, 15),
            gender: Some(Gender::Female),
            contact_number: None,
            bed_id: None,
        }
    }

    fn biometrics(mass: f64, height: f64) -> Biometrics {
        Biometrics {
            id: 1,
            patient_id: PatientId(7),
            mass,
            height,
            waist_circumference: 80.0,
        }
    }

    fn diagnosis(id: i32, text: Option<&str>) -> Diagnosis {
        Diagnosis {
            id,
            patient_id: PatientId(7),
            diagnosed: text.map(str::to_string),
            symptoms: None,
            signs: None,
            treatment: None,
        }
    }

    fn inputs() -> ReportInputs {
        ReportInputs {
            patient: patient(),
            vitals: None,
            biometrics: None,
            diagnoses: Vec::new(),
            dosages: Vec::new(),
            results: Vec::new(),
            degraded_sections: Vec::new(),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 14, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_bmi_values() {
        let normal = body_mass_index(&biometrics(70.0, 175.0)).unwrap();
        assert!((normal - 22.857).abs() < 0.001);
        assert_eq!(BmiCategory::from_bmi(normal), BmiCategory::Normal);

        let obese = body_mass_index(&biometrics(100.0, 160.0)).unwrap();
        assert!((obese - 39.0625).abs() < 0.001);
        assert_eq!(BmiCategory::from_bmi(obese), BmiCategory::Obese);
    }

    #[test]
    fn test_bmi_unset_without_height() {
        assert_eq!(body_mass_index(&biometrics(70.0, 0.0)), None);
        assert_eq!(body_mass_index(&biometrics(70.0, -1.0)), None);

        let report = Report::assemble(
            ReportInputs {
                biometrics: Some(biometrics(70.0, 0.0)),
                ..inputs()
            },
            &VitalThresholds::default(),
            now(),
        );
        assert_eq!(report.bmi(), None);
        assert_eq!(report.bmi_category(), None);
    }

    #[test]
    fn test_bmi_category_boundaries() {
        assert_eq!(BmiCategory::from_bmi(18.49), BmiCategory::Underweight);
        assert_eq!(BmiCategory::from_bmi(18.5), BmiCategory::Normal);
        assert_eq!(BmiCategory::from_bmi(25.0), BmiCategory::Overweight);
        assert_eq!(BmiCategory::from_bmi(30.0), BmiCategory::Obese);
    }

    #[test]
    fn test_summary() {
        assert_eq!(summarize(&[]), NO_DIAGNOSES);

        let diagnoses = vec![
            diagnosis(1, Some("Flu")),
            diagnosis(2, Some("")),
            diagnosis(3, None),
            diagnosis(4, Some("Cold")),
        ];
        assert_eq!(summarize(&diagnoses), "Flu; Cold");

        let blank = vec![diagnosis(1, Some("  ")), diagnosis(2, None)];
        assert_eq!(summarize(&blank), NO_DIAGNOSES);
    }

    #[test]
    fn test_age_truncates_before_birthday() {
        // 2024-06-14，生日是6月15日
        let report = Report::assemble(inputs(), &VitalThresholds::default(), now());
        assert_eq!(report.age(), 43);
    }

    #[test]
    fn test_age_zero_without_birth_date() {
        let mut input = inputs();
        input.patient.date_of_birth = None;
        let report = Report::assemble(input, &VitalThresholds::default(), now());
        assert_eq!(report.age(), 0);
    }

    #[test]
    fn test_formatted_helpers() {
        let report = Report::assemble(inputs(), &VitalThresholds::default(), now());
        assert_eq!(report.formatted_patient_info(), "Ada Obi, 43 years, Female");
        assert_eq!(report.formatted_blood_pressure(), "N/A");
        assert!(!report.has_medications());
        assert!(!report.has_test_results());
        assert!(!report.critical_vitals());
        assert_eq!(report.generated_at(), now());

        let mut input = inputs();
        input.patient.gender = None;
        let report = Report::assemble(input, &VitalThresholds::default(), now());
        assert_eq!(report.formatted_patient_info(), "Ada Obi, 43 years, Unknown");
    }

    #[test]
    fn test_compact_projection() {
        let report = Report::assemble(
            ReportInputs {
                biometrics: Some(biometrics(100.0, 160.0)),
                diagnoses: vec![diagnosis(1, Some("Hypertension"))],
                ..inputs()
            },
            &VitalThresholds::default(),
            now(),
        );

        let compact = report.compact();
        assert_eq!(compact.patient_id, report.patient_id());
        assert_eq!(compact.patient_name, "Ada Obi");
        assert_eq!(compact.age, report.age());
        assert_eq!(compact.summary, "Hypertension");
        assert_eq!(compact.bmi, report.bmi());
        assert_eq!(compact.bmi_category, Some(BmiCategory::Obese));
        assert_eq!(compact.critical_vitals, report.critical_vitals());
    }
}
