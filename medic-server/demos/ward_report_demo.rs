//! 床位分配与临床报告演示程序
//!
//! 使用内存存储网关，展示分配、换床、冲突拒绝、释放、一致性检查和报告生成

use chrono::{NaiveDate, Utc};
use medic_core::{
    Bed, BedId, Biometrics, Diagnosis, Gender, Patient, PatientId, StorageGateway, Vitals, Ward,
    WardId,
};
use medic_database::{Fault, MemoryGateway};
use medic_report::ReportBuilder;
use medic_ward::BedAllocationManager;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 初始化日志
    tracing_subscriber::fmt::init();

    println!("🏥 病房床位与临床报告演示\n");

    let gateway = MemoryGateway::new();
    seed(&gateway).await;
    for ward in gateway.list_wards().await? {
        println!("✅ 病房 {} ({}) 已就绪", ward.name, ward.location);
    }

    let manager = BedAllocationManager::new();
    let alice = PatientId(1);
    let bob = PatientId(2);

    // 1. 分配床位
    let allocation = manager.assign(&gateway, alice, Some(BedId(1))).await?;
    println!("🛏️  患者 {} 入住床位 {:?}", alice, allocation.assigned);

    // 2. 冲突：床位已被占用
    match manager.assign(&gateway, bob, Some(BedId(1))).await {
        Ok(_) => println!("⚠️  意外成功"),
        Err(e) => println!("⛔ 患者 {} 分配被拒绝: {}", bob, e),
    }

    // 3. 换床
    let allocation = manager.assign(&gateway, alice, Some(BedId(2))).await?;
    println!(
        "🔄 患者 {} 换床: {:?} -> {:?}",
        alice, allocation.released, allocation.assigned
    );
    manager.assign(&gateway, bob, Some(BedId(1))).await?;
    println!("🛏️  患者 {} 入住床位 1", bob);

    // 4. 释放
    let allocation = manager.release(&gateway, bob).await?;
    println!("🚪 患者 {} 出院，释放床位 {:?}", bob, allocation.released);

    // 5. 一致性检查
    let discrepancies = manager.audit(&gateway).await?;
    println!("🔍 占用一致性问题: {}", discrepancies.len());
    let view = manager.ward_occupancy(&gateway, WardId(1)).await?;
    println!("   {}: 占用 {} / 空闲 {}", view.ward.name, view.occupied, view.free);
    for entry in &view.beds {
        match entry.occupant {
            Some(patient) => println!("   - {} 患者 {}", entry.bed.bed_number, patient),
            None => println!("   - {} 空闲", entry.bed.bed_number),
        }
    }

    // 6. 报告
    let builder = ReportBuilder::new();
    let report = builder.build(&gateway, alice).await?;
    println!("\n📋 {}", report.formatted_patient_info());
    println!("   血压: {}", report.formatted_blood_pressure());
    if let (Some(bmi), Some(category)) = (report.bmi(), report.bmi_category()) {
        println!("   BMI: {:.1} ({})", bmi, category);
    }
    println!("   危急生命体征: {:?}", report.critical_signs());
    println!("   诊断摘要: {}", report.summary());

    // 7. 子记录获取失败时的降级
    gateway.inject_fault(Fault::Dosages).await;
    let degraded = builder.compact(&gateway, alice).await?;
    println!("\n📉 降级后的精简报告:");
    println!("{}", serde_json::to_string_pretty(&degraded)?);

    Ok(())
}

async fn seed(gateway: &MemoryGateway) {
    gateway
        .insert_ward(Ward {
            id: WardId(1),
            name: "Internal Medicine".to_string(),
            location: "Building B, 3F".to_string(),
        })
        .await;

    for id in 1..=3 {
        gateway
            .insert_bed(Bed {
                id: BedId(id),
                ward_id: WardId(1),
                bed_number: format!("B-{:02}", id),
                bed_row: 1,
                bed_column: id,
                occupied: false,
            })
            .await;
    }

    for (id, first, last, dob, gender) in [
        (1, "Alice", "Ng", (1958, 4, 2), Gender::Female),
        (2, "Bob", "Mensah", (1991, 11, 23), Gender::Male),
    ] {
        gateway
            .insert_patient(Patient {
                id: PatientId(id),
                first_name: first.to_string(),
                middle_name: None,
                last_name: last.to_string(),
                date_of_birth: NaiveDate::from_ymd_opt(dob.0, dob.1, dob.2),
                gender: Some(gender),
                contact_number: None,
                bed_id: None,
            })
            .await;
    }

    gateway
        .set_vitals(Vitals {
            id: 1,
            patient_id: PatientId(1),
            temperature: 39.4,
            heart_rate: 112,
            blood_pressure_systolic: 145,
            blood_pressure_diastolic: 92,
            respiratory_rate: 24,
            oxygen_saturation: 90.5,
            note: Some(format!("recorded {}", Utc::now().format("%Y-%m-%d %H:%M"))),
        })
        .await;
    gateway
        .set_biometrics(Biometrics {
            id: 1,
            patient_id: PatientId(1),
            mass: 64.0,
            height: 162.0,
            waist_circumference: 81.0,
        })
        .await;
    for (id, text) in [(1, "Sepsis"), (2, "Type 2 diabetes")] {
        gateway
            .add_diagnosis(Diagnosis {
                id,
                patient_id: PatientId(1),
                diagnosed: Some(text.to_string()),
                symptoms: None,
                signs: None,
                treatment: None,
            })
            .await;
    }
}
