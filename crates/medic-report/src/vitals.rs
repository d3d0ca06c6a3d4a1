//! 危急生命体征判定
//!
//! 每个阈值都是严格比较：恰好等于阈值不算危急。

use medic_core::Vitals;
use serde::{Deserialize, Serialize};

/// 触发危急判定的体征
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VitalSign {
    Temperature,       // 体温
    HeartRate,         // 心率
    SystolicPressure,  // 收缩压
    DiastolicPressure, // 舒张压
    RespiratoryRate,   // 呼吸频率
    OxygenSaturation,  // 血氧饱和度
}

/// 危急值阈值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VitalThresholds {
    pub temperature_high: f64,
    pub temperature_low: f64,
    pub heart_rate_high: i32,
    pub heart_rate_low: i32,
    pub systolic_high: i32,
    pub systolic_low: i32,
    pub diastolic_high: i32,
    pub diastolic_low: i32,
    pub respiratory_rate_high: i32,
    pub respiratory_rate_low: i32,
    pub oxygen_saturation_low: f64,
}

impl Default for VitalThresholds {
    fn default() -> Self {
        Self {
            temperature_high: 39.0,
            temperature_low: 35.0,
            heart_rate_high: 120,
            heart_rate_low: 50,
            systolic_high: 180,
            systolic_low: 90,
            diastolic_high: 120,
            diastolic_low: 60,
            respiratory_rate_high: 30,
            respiratory_rate_low: 10,
            oxygen_saturation_low: 92.0,
        }
    }
}

impl VitalThresholds {
    /// 列出超出阈值的体征，顺序固定
    pub fn critical_signs(&self, vitals: &Vitals) -> Vec<VitalSign> {
        let checks = [
            (
                VitalSign::Temperature,
                vitals.temperature > self.temperature_high
                    || vitals.temperature < self.temperature_low,
            ),
            (
                VitalSign::HeartRate,
                vitals.heart_rate > self.heart_rate_high || vitals.heart_rate < self.heart_rate_low,
            ),
            (
                VitalSign::SystolicPressure,
                vitals.blood_pressure_systolic > self.systolic_high
                    || vitals.blood_pressure_systolic < self.systolic_low,
            ),
            (
                VitalSign::DiastolicPressure,
                vitals.blood_pressure_diastolic > self.diastolic_high
                    || vitals.blood_pressure_diastolic < self.diastolic_low,
            ),
            (
                VitalSign::RespiratoryRate,
                vitals.respiratory_rate > self.respiratory_rate_high
                    || vitals.respiratory_rate < self.respiratory_rate_low,
            ),
            (
                VitalSign::OxygenSaturation,
                vitals.oxygen_saturation < self.oxygen_saturation_low,
            ),
        ];

        checks
            .into_iter()
            .filter_map(|(sign, critical)| critical.then_some(sign))
            .collect()
    }

    pub fn is_critical(&self, vitals: &Vitals) -> bool {
        !self.critical_signs(vitals).is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medic_core::PatientId;

    fn normal() -> Vitals {
        Vitals {
            id: 1,
            patient_id: PatientId(1),
            temperature: 36.8,
            heart_rate: 72,
            blood_pressure_systolic: 120,
            blood_pressure_diastolic: 80,
            respiratory_rate: 16,
            oxygen_saturation: 98.0,
            note: None,
        }
    }

    #[test]
    fn test_normal_vitals_not_critical() {
        let thresholds = VitalThresholds::default();
        assert!(!thresholds.is_critical(&normal()));
    }

    #[test]
    fn test_temperature_boundary_is_exclusive() {
        let thresholds = VitalThresholds::default();

        let at_limit = Vitals { temperature: 39.0, ..normal() };
        assert!(!thresholds.is_critical(&at_limit));

        let above = Vitals { temperature: 39.1, ..normal() };
        assert_eq!(thresholds.critical_signs(&above), vec![VitalSign::Temperature]);

        let cold = Vitals { temperature: 34.9, ..normal() };
        assert!(thresholds.is_critical(&cold));
    }

    #[test]
    fn test_oxygen_saturation_boundary() {
        let thresholds = VitalThresholds::default();

        let at_limit = Vitals { oxygen_saturation: 92.0, ..normal() };
        assert!(!thresholds.is_critical(&at_limit));

        let below = Vitals { oxygen_saturation: 91.9, ..normal() };
        assert_eq!(thresholds.critical_signs(&below), vec![VitalSign::OxygenSaturation]);
    }

    #[test]
    fn test_each_sign_checked_independently() {
        let thresholds = VitalThresholds::default();

        let vitals = Vitals {
            heart_rate: 121,
            blood_pressure_systolic: 89,
            blood_pressure_diastolic: 121,
            respiratory_rate: 9,
            ..normal()
        };
        assert_eq!(
            thresholds.critical_signs(&vitals),
            vec![
                VitalSign::HeartRate,
                VitalSign::SystolicPressure,
                VitalSign::DiastolicPressure,
                VitalSign::RespiratoryRate,
            ]
        );

        let limits = Vitals {
            heart_rate: 50,
            blood_pressure_systolic: 180,
            blood_pressure_diastolic: 60,
            respiratory_rate: 30,
            ..normal()
        };
        assert!(!thresholds.is_critical(&limits));
    }

    #[test]
    fn test_custom_thresholds() {
        let thresholds = VitalThresholds {
            heart_rate_high: 100,
            ..VitalThresholds::default()
        };
        let vitals = Vitals { heart_rate: 101, ..normal() };
        assert!(thresholds.is_critical(&vitals));
        assert!(!VitalThresholds::default().is_critical(&vitals));
    }
}
