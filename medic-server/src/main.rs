//! Medic命令行主程序

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use medic_admin::{
    write_default_config, ClinicalMonitor, ConfigManager, MedicConfig, OperationOutcome,
};
use medic_core::{BedId, Gender, PatientId, StorageGateway, WardId};
use medic_database::{
    DatabasePool, DatabaseQueries, NewBed, NewBiometrics, NewDiagnosis, NewDosage, NewPatient,
    NewTestResult, NewVitals, PgGateway,
};
use medic_report::ReportBuilder;
use medic_ward::BedAllocationManager;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

/// 命令行参数
#[derive(Parser, Debug)]
#[command(name = "medic-server")]
#[command(about = "病房床位分配与临床报告工具")]
struct Args {
    /// 配置文件路径
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// 日志级别，覆盖配置文件中的 logging.level
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// 命令结束后输出Prometheus指标
    #[arg(long, global = true)]
    metrics: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 把默认配置写入TOML文件
    WriteConfig { path: PathBuf },
    #[command(flatten)]
    Db(DbCommand),
}

/// 需要数据库连接的命令
#[derive(Subcommand, Debug)]
enum DbCommand {
    /// 创建数据表和索引
    InitDb,
    /// 写入一个示例病房、床位和患者
    Seed,
    /// 为患者分配床位
    Assign {
        #[arg(long)]
        patient: i32,
        #[arg(long)]
        bed: i32,
    },
    /// 释放患者当前床位
    Release {
        #[arg(long)]
        patient: i32,
    },
    /// 生成患者临床报告（JSON）
    Report {
        #[arg(long)]
        patient: i32,
        /// 只输出精简报告
        #[arg(long)]
        compact: bool,
    },
    /// 检查床位占用一致性
    AuditBeds,
    /// 查看病房床位占用情况，不指定病房时列出全部病房
    Wards {
        #[arg(long)]
        ward: Option<i32>,
    },
}

impl DbCommand {
    fn name(&self) -> &'static str {
        match self {
            DbCommand::InitDb => "init-db",
            DbCommand::Seed => "seed",
            DbCommand::Assign { .. } => "assign",
            DbCommand::Release { .. } => "release",
            DbCommand::Report { .. } => "report",
            DbCommand::AuditBeds => "audit-beds",
            DbCommand::Wards { .. } => "wards",
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let command = match args.command {
        Command::WriteConfig { path } => {
            init_tracing(args.log_level.as_deref().unwrap_or("info"));
            return write_default_config(path).await;
        }
        Command::Db(command) => command,
    };

    let config_manager = ConfigManager::new(args.config.as_deref())?;
    let config = config_manager.get_config().await;
    init_tracing(args.log_level.as_deref().unwrap_or(&config.logging.level));

    let monitor = ClinicalMonitor::new()?;
    let request_id = Uuid::new_v4();
    let span = info_span!("command", %request_id, name = command.name());

    let outcome = run(command, &config, &monitor).instrument(span).await;

    if args.metrics {
        println!("{}", monitor.get_prometheus_metrics()?);
    }
    outcome
}

fn init_tracing(filter: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(command: DbCommand, config: &MedicConfig, monitor: &ClinicalMonitor) -> Result<()> {
    let pool = DatabasePool::connect(&config.database)
        .await
        .context("Failed to connect to database")?;
    let gateway = PgGateway::new(pool);
    let manager = BedAllocationManager::new();

    match command {
        DbCommand::InitDb => {
            gateway.queries().create_tables().await?;
            info!("Database schema ready");
        }
        DbCommand::Seed => {
            let seeded = seed(&gateway.queries()).await?;
            print_json(&seeded)?;
        }
        DbCommand::Assign { patient, bed } => {
            let result = manager
                .assign(&gateway, PatientId(patient), Some(BedId(bed)))
                .await;
            monitor.record_allocation("assign", OperationOutcome::of(&result));
            let allocation = result
                .with_context(|| format!("Failed to assign bed {} to patient {}", bed, patient))?;
            print_json(&allocation)?;
        }
        DbCommand::Release { patient } => {
            let result = manager.release(&gateway, PatientId(patient)).await;
            monitor.record_allocation("release", OperationOutcome::of(&result));
            let allocation =
                result.with_context(|| format!("Failed to release bed of patient {}", patient))?;
            print_json(&allocation)?;
        }
        DbCommand::Report { patient, compact } => {
            let builder = ReportBuilder::with_thresholds(config.report.thresholds.clone());
            let started = Instant::now();
            let result = builder.build(&gateway, PatientId(patient)).await;
            monitor.record_report_result(&result, started.elapsed());
            let report =
                result.with_context(|| format!("Failed to build report for patient {}", patient))?;

            if compact {
                print_json(&report.compact())?;
            } else {
                print_json(&report)?;
            }
        }
        DbCommand::AuditBeds => {
            let discrepancies = manager.audit(&gateway).await?;
            print_json(&discrepancies)?;
        }
        DbCommand::Wards { ward: Some(id) } => {
            let occupancy = manager
                .ward_occupancy(&gateway, WardId(id))
                .await
                .with_context(|| format!("Failed to load ward {}", id))?;
            print_json(&occupancy)?;
        }
        DbCommand::Wards { ward: None } => {
            let mut wards = Vec::new();
            for ward in gateway.list_wards().await? {
                wards.push(manager.ward_occupancy(&gateway, ward.id).await?);
            }
            print_json(&wards)?;
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", text);
    Ok(())
}

#[derive(Debug, Serialize)]
struct SeedSummary {
    ward_id: i32,
    bed_ids: Vec<i32>,
    patient_id: i32,
}

async fn seed(queries: &DatabaseQueries<'_>) -> Result<SeedSummary> {
    let ward_id = queries.create_ward("General Medicine", "Building A, 2F").await?;

    let mut bed_ids = Vec::new();
    for (index, number) in ["A-01", "A-02", "A-03", "A-04"].into_iter().enumerate() {
        let column = i32::try_from(index).context("bed index out of range")?;
        let bed_id = queries
            .create_bed(&NewBed {
                ward_id,
                bed_number: number.to_string(),
                bed_row: 1,
                bed_column: column + 1,
            })
            .await?;
        bed_ids.push(bed_id.0);
    }

    let patient_id = queries
        .create_patient(&NewPatient {
            first_name: "John".to_string(),
            middle_name: None,
            last_name: "Doe".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(1970, 1, 1),
            gender: Some(Gender::Male),
            contact_number: Some("555-0100".to_string()),
        })
        .await?;

    queries
        .upsert_vitals(
            patient_id,
            &NewVitals {
                temperature: 37.2,
                heart_rate: 88,
                blood_pressure_systolic: 135,
                blood_pressure_diastolic: 85,
                respiratory_rate: 18,
                oxygen_saturation: 96.0,
                note: None,
            },
        )
        .await?;
    queries
        .upsert_biometrics(
            patient_id,
            &NewBiometrics {
                mass: 82.0,
                height: 178.0,
                waist_circumference: 94.0,
            },
        )
        .await?;
    queries
        .add_diagnosis(
            patient_id,
            &NewDiagnosis {
                diagnosed: Some("Community-acquired pneumonia".to_string()),
                symptoms: Some("Cough, fever".to_string()),
                ..NewDiagnosis::default()
            },
        )
        .await?;
    queries
        .add_dosage(
            patient_id,
            &NewDosage {
                drug_name: "Amoxicillin".to_string(),
                amount: "500mg".to_string(),
                prescription: "three times daily".to_string(),
                caution: None,
                note: None,
            },
        )
        .await?;
    queries
        .add_result(
            patient_id,
            &NewTestResult {
                result_code: "CXR".to_string(),
                description: "Right lower lobe consolidation".to_string(),
                result_type: "Radiology".to_string(),
                test_method: "Chest X-ray".to_string(),
                notes: None,
            },
        )
        .await?;

    info!("Seeded ward {} with {} beds and patient {}", ward_id, bed_ids.len(), patient_id);
    Ok(SeedSummary {
        ward_id: ward_id.0,
        bed_ids,
        patient_id: patient_id.0,
    })
}
