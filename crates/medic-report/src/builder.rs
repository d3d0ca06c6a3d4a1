//! 报告构建器
//!
//! 诊断、用药、检验结果三类子记录并发获取，任一失败时以空集合代替并记录降级，
//! 不影响报告整体生成。患者、生命体征和体格测量的获取失败直接返回错误。

use chrono::{DateTime, Utc};
use medic_core::{Entity, MedicError, PatientId, ReportSection, Result, StorageGateway};
use tracing::{debug, info, warn};

use crate::report::{CompactReport, Report, ReportInputs};
use crate::vitals::VitalThresholds;

/// 临床报告构建器
#[derive(Debug, Clone, Default)]
pub struct ReportBuilder {
    thresholds: VitalThresholds,
}

impl ReportBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_thresholds(thresholds: VitalThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &VitalThresholds {
        &self.thresholds
    }

    /// 构建完整报告
    pub async fn build(&self, gateway: &dyn StorageGateway, patient_id: PatientId) -> Result<Report> {
        self.build_at(gateway, patient_id, Utc::now()).await
    }

    /// 以指定时间构建报告，年龄按该时间的日期计算
    pub async fn build_at(
        &self,
        gateway: &dyn StorageGateway,
        patient_id: PatientId,
        now: DateTime<Utc>,
    ) -> Result<Report> {
        debug!("Building report for patient {}", patient_id);

        let patient = gateway
            .get_patient(patient_id)
            .await?
            .ok_or(MedicError::NotFound(Entity::Patient(patient_id)))?;

        let (vitals, biometrics) = tokio::try_join!(
            gateway.get_vitals(patient_id),
            gateway.get_biometrics(patient_id),
        )?;

        let (diagnoses, dosages, results) = tokio::join!(
            gateway.get_diagnoses(patient_id),
            gateway.get_dosages(patient_id),
            gateway.get_results(patient_id),
        );

        let mut degraded_sections = Vec::new();
        let diagnoses = recover(patient_id, ReportSection::Diagnoses, diagnoses, &mut degraded_sections);
        let dosages = recover(patient_id, ReportSection::Dosages, dosages, &mut degraded_sections);
        let results = recover(patient_id, ReportSection::Results, results, &mut degraded_sections);

        let report = Report::assemble(
            ReportInputs {
                patient,
                vitals,
                biometrics,
                diagnoses,
                dosages,
                results,
                degraded_sections,
            },
            &self.thresholds,
            now,
        );

        if report.critical_vitals() {
            warn!(
                "Critical vitals for patient {}: {:?}",
                patient_id,
                report.critical_signs()
            );
        }
        info!(
            "Report built for patient {} ({} degraded sections)",
            patient_id,
            report.degraded_sections().len()
        );

        Ok(report)
    }

    /// 构建报告并投影为精简格式
    pub async fn compact(
        &self,
        gateway: &dyn StorageGateway,
        patient_id: PatientId,
    ) -> Result<CompactReport> {
        Ok(self.build(gateway, patient_id).await?.compact())
    }
}

fn recover<T>(
    patient_id: PatientId,
    section: ReportSection,
    fetched: Result<Vec<T>>,
    degraded: &mut Vec<ReportSection>,
) -> Vec<T> {
    match fetched {
        Ok(items) => items,
        Err(e) => {
            let err = MedicError::PartialAggregation {
                section,
                source: Box::new(e),
            };
            warn!("Patient {}: {}", patient_id, err);
            degraded.push(section);
            Vec::new()
        }
    }
}
