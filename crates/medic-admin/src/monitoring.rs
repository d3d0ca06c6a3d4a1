//! 业务监控
//!
//! 记录床位分配结果和报告生成情况，以Prometheus文本格式导出。

use anyhow::Result;
use medic_core::MedicError;
use medic_report::Report;
use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry};
use std::time::Duration;
use tracing::debug;

/// 床位分配和报告生成的结果分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationOutcome {
    Success,
    Conflict,
    NotFound,
    Unavailable,
    Failed,
}

impl OperationOutcome {
    pub fn of<T>(result: &medic_core::Result<T>) -> Self {
        match result {
            Ok(_) => OperationOutcome::Success,
            Err(MedicError::BedOccupied(_)) => OperationOutcome::Conflict,
            Err(MedicError::NotFound(_)) => OperationOutcome::NotFound,
            Err(e) if e.is_retryable() => OperationOutcome::Unavailable,
            Err(_) => OperationOutcome::Failed,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OperationOutcome::Success => "success",
            OperationOutcome::Conflict => "conflict",
            OperationOutcome::NotFound => "not_found",
            OperationOutcome::Unavailable => "unavailable",
            OperationOutcome::Failed => "failed",
        }
    }
}

/// 临床业务监控器
#[derive(Debug)]
pub struct ClinicalMonitor {
    /// Prometheus指标注册表
    registry: Registry,
    /// 床位分配计数，按操作和结果区分
    allocations_total: IntCounterVec,
    /// 报告生成计数
    reports_built_total: IntCounter,
    /// 报告生成失败计数，按结果区分
    report_failures_total: IntCounterVec,
    /// 含危急生命体征的报告计数
    critical_reports_total: IntCounter,
    /// 降级部分计数，按类别区分
    degraded_sections_total: IntCounterVec,
    /// 报告生成耗时
    report_build_duration: Histogram,
}

impl ClinicalMonitor {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let allocations_total = IntCounterVec::new(
            Opts::new("bed_allocations_total", "Total number of bed allocation operations"),
            &["operation", "outcome"],
        )?;

        let reports_built_total = IntCounter::with_opts(Opts::new(
            "reports_built_total",
            "Total number of clinical reports built",
        ))?;

        let report_failures_total = IntCounterVec::new(
            Opts::new("report_failures_total", "Total number of failed report builds"),
            &["outcome"],
        )?;

        let critical_reports_total = IntCounter::with_opts(Opts::new(
            "critical_reports_total",
            "Total number of reports with critical vitals",
        ))?;

        let degraded_sections_total = IntCounterVec::new(
            Opts::new(
                "report_degraded_sections_total",
                "Total number of report sections replaced by empty collections",
            ),
            &["section"],
        )?;

        let report_build_duration = Histogram::with_opts(HistogramOpts::new(
            "report_build_duration_seconds",
            "Clinical report build duration in seconds",
        ))?;

        registry.register(Box::new(allocations_total.clone()))?;
        registry.register(Box::new(reports_built_total.clone()))?;
        registry.register(Box::new(report_failures_total.clone()))?;
        registry.register(Box::new(critical_reports_total.clone()))?;
        registry.register(Box::new(degraded_sections_total.clone()))?;
        registry.register(Box::new(report_build_duration.clone()))?;

        Ok(Self {
            registry,
            allocations_total,
            reports_built_total,
            report_failures_total,
            critical_reports_total,
            degraded_sections_total,
            report_build_duration,
        })
    }

    /// 记录一次分配或释放
    pub fn record_allocation(&self, operation: &str, outcome: OperationOutcome) {
        debug!("Bed {} finished: {}", operation, outcome.as_str());
        self.allocations_total
            .with_label_values(&[operation, outcome.as_str()])
            .inc();
    }

    /// 记录一份成功生成的报告
    pub fn record_report(&self, report: &Report, duration: Duration) {
        self.reports_built_total.inc();
        if report.critical_vitals() {
            self.critical_reports_total.inc();
        }
        for section in report.degraded_sections() {
            let label = section.to_string();
            self.degraded_sections_total
                .with_label_values(&[label.as_str()])
                .inc();
        }
        self.report_build_duration.observe(duration.as_secs_f64());
    }

    /// 记录一次报告生成结果；成功时等同于 `record_report`
    pub fn record_report_result(&self, result: &medic_core::Result<Report>, duration: Duration) {
        match result {
            Ok(report) => self.record_report(report, duration),
            Err(_) => {
                let outcome = OperationOutcome::of(result);
                debug!("Report build failed: {}", outcome.as_str());
                self.report_failures_total
                    .with_label_values(&[outcome.as_str()])
                    .inc();
            }
        }
    }

    pub fn report_failures(&self, outcome: OperationOutcome) -> u64 {
        self.report_failures_total
            .with_label_values(&[outcome.as_str()])
            .get()
    }

    pub fn allocation_count(&self, operation: &str, outcome: OperationOutcome) -> u64 {
        self.allocations_total
            .with_label_values(&[operation, outcome.as_str()])
            .get()
    }

    pub fn reports_built(&self) -> u64 {
        self.reports_built_total.get()
    }

    /// 获取Prometheus指标
    pub fn get_prometheus_metrics(&self) -> Result<String> {
        use prometheus::Encoder;

        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;

        Ok(String::from_utf8(buffer)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use medic_core::{BedId, Entity, Patient, PatientId, ReportSection};
    use medic_database::{Fault, MemoryGateway};
    use medic_report::ReportBuilder;

    fn patient() -> Patient {
        Patient {
            id: PatientId(1),
            first_name: "John".to_string(),
            middle_name: None,
            last_name: "Doe".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(1990, 3, 1),
            gender: None,
            contact_number: None,
            bed_id: None,
        }
    }

    #[test]
    fn test_outcome_classification() {
        let ok: medic_core::Result<()> = Ok(());
        assert_eq!(OperationOutcome::of(&ok), OperationOutcome::Success);

        let conflict: medic_core::Result<()> = Err(MedicError::BedOccupied(BedId(3)));
        assert_eq!(OperationOutcome::of(&conflict), OperationOutcome::Conflict);

        let missing: medic_core::Result<()> =
            Err(MedicError::NotFound(Entity::Patient(PatientId(1))));
        assert_eq!(OperationOutcome::of(&missing), OperationOutcome::NotFound);

        let down: medic_core::Result<()> = Err(MedicError::Unavailable("pool timed out".into()));
        assert_eq!(OperationOutcome::of(&down), OperationOutcome::Unavailable);

        let broken: medic_core::Result<()> = Err(MedicError::Database("syntax".into()));
        assert_eq!(OperationOutcome::of(&broken), OperationOutcome::Failed);
    }

    #[test]
    fn test_allocation_counters() {
        let monitor = ClinicalMonitor::new().unwrap();
        monitor.record_allocation("assign", OperationOutcome::Success);
        monitor.record_allocation("assign", OperationOutcome::Success);
        monitor.record_allocation("assign", OperationOutcome::Conflict);

        assert_eq!(monitor.allocation_count("assign", OperationOutcome::Success), 2);
        assert_eq!(monitor.allocation_count("assign", OperationOutcome::Conflict), 1);
        assert_eq!(monitor.allocation_count("release", OperationOutcome::Success), 0);

        let text = monitor.get_prometheus_metrics().unwrap();
        assert!(text.contains("bed_allocations_total"));
        assert!(text.contains("outcome=\"conflict\""));
    }

    #[tokio::test]
    async fn test_record_degraded_report() {
        let gateway = MemoryGateway::new();
        gateway.insert_patient(patient()).await;
        gateway.inject_fault(Fault::Results).await;

        let report = ReportBuilder::new()
            .build_at(&gateway, PatientId(1), Utc::now())
            .await
            .unwrap();
        assert_eq!(report.degraded_sections(), &[ReportSection::Results]);

        let monitor = ClinicalMonitor::new().unwrap();
        monitor.record_report(&report, Duration::from_millis(12));

        assert_eq!(monitor.reports_built(), 1);
        let text = monitor.get_prometheus_metrics().unwrap();
        assert!(text.contains("report_degraded_sections_total{section=\"results\"} 1"));
        assert!(text.contains("report_build_duration_seconds_count 1"));
    }

    #[tokio::test]
    async fn test_record_failed_reports() {
        let gateway = MemoryGateway::new();
        gateway.insert_patient(patient()).await;
        let builder = ReportBuilder::new();
        let monitor = ClinicalMonitor::new().unwrap();

        let missing = builder.build(&gateway, PatientId(404)).await;
        monitor.record_report_result(&missing, Duration::from_millis(3));

        gateway.inject_fault(Fault::Vitals).await;
        let down = builder.build(&gateway, PatientId(1)).await;
        monitor.record_report_result(&down, Duration::from_millis(3));

        assert_eq!(monitor.reports_built(), 0);
        assert_eq!(monitor.report_failures(OperationOutcome::NotFound), 1);
        assert_eq!(monitor.report_failures(OperationOutcome::Unavailable), 1);

        let text = monitor.get_prometheus_metrics().unwrap();
        assert!(text.contains("report_failures_total{outcome=\"not_found\"} 1"));
        assert!(text.contains("report_build_duration_seconds_count 0"));
    }
}
