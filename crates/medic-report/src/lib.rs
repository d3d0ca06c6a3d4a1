//! # Medic报告模块
//!
//! 汇总患者的生命体征、体格测量、诊断、用药和检验结果，生成临床报告：
//! - 年龄、BMI及分类
//! - 危急生命体征判定（阈值可配置）
//! - 诊断摘要
//! - 子记录获取失败时的局部降级

pub mod builder;
pub mod report;
pub mod vitals;

pub use builder::ReportBuilder;
pub use report::{body_mass_index, summarize, BmiCategory, CompactReport, Report, NO_DIAGNOSES};
pub use vitals::{VitalSign, VitalThresholds};
