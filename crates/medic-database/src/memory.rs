//! 内存存储网关
//!
//! 供测试和嵌入式场景使用。事务持有整个存储的互斥锁直到提交或回滚，
//! 写入先暂存在事务中，提交时一次性生效。

use async_trait::async_trait;
use medic_core::{
    Bed, BedId, Biometrics, Diagnosis, Dosage, GatewayTransaction, MedicError, Patient, PatientId,
    Result, StorageGateway, TestResult, Vitals, Ward, WardId,
};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// 可注入的故障点
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fault {
    Begin,
    SaveBed,
    SavePatient,
    Commit,
    Vitals,
    Biometrics,
    Diagnoses,
    Dosages,
    Results,
}

#[derive(Debug, Default)]
struct MemoryState {
    wards: BTreeMap<WardId, Ward>,
    beds: BTreeMap<BedId, Bed>,
    patients: BTreeMap<PatientId, Patient>,
    vitals: BTreeMap<PatientId, Vitals>,
    biometrics: BTreeMap<PatientId, Biometrics>,
    diagnoses: Vec<Diagnosis>,
    dosages: Vec<Dosage>,
    results: Vec<TestResult>,
    faults: HashSet<Fault>,
    commits: u64,
}

impl MemoryState {
    fn check(&self, fault: Fault) -> Result<()> {
        if self.faults.contains(&fault) {
            return Err(MedicError::Unavailable(format!("injected fault: {:?}", fault)));
        }
        Ok(())
    }
}

/// 内存存储网关
#[derive(Debug, Clone, Default)]
pub struct MemoryGateway {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_ward(&self, ward: Ward) {
        self.state.lock().await.wards.insert(ward.id, ward);
    }

    pub async fn insert_bed(&self, bed: Bed) {
        self.state.lock().await.beds.insert(bed.id, bed);
    }

    pub async fn insert_patient(&self, patient: Patient) {
        self.state.lock().await.patients.insert(patient.id, patient);
    }

    pub async fn set_vitals(&self, vitals: Vitals) {
        self.state.lock().await.vitals.insert(vitals.patient_id, vitals);
    }

    pub async fn set_biometrics(&self, biometrics: Biometrics) {
        self.state
            .lock()
            .await
            .biometrics
            .insert(biometrics.patient_id, biometrics);
    }

    pub async fn add_diagnosis(&self, diagnosis: Diagnosis) {
        self.state.lock().await.diagnoses.push(diagnosis);
    }

    pub async fn add_dosage(&self, dosage: Dosage) {
        self.state.lock().await.dosages.push(dosage);
    }

    pub async fn add_result(&self, result: TestResult) {
        self.state.lock().await.results.push(result);
    }

    /// 让指定操作在之后的调用中失败，返回 `Unavailable`
    pub async fn inject_fault(&self, fault: Fault) {
        self.state.lock().await.faults.insert(fault);
    }

    pub async fn clear_fault(&self, fault: Fault) {
        self.state.lock().await.faults.remove(&fault);
    }

    /// 已成功提交的事务数
    pub async fn commit_count(&self) -> u64 {
        self.state.lock().await.commits
    }
}

#[async_trait]
impl StorageGateway for MemoryGateway {
    async fn get_patient(&self, id: PatientId) -> Result<Option<Patient>> {
        Ok(self.state.lock().await.patients.get(&id).cloned())
    }

    async fn get_bed(&self, id: BedId) -> Result<Option<Bed>> {
        Ok(self.state.lock().await.beds.get(&id).cloned())
    }

    async fn get_vitals(&self, patient_id: PatientId) -> Result<Option<Vitals>> {
        let state = self.state.lock().await;
        state.check(Fault::Vitals)?;
        Ok(state.vitals.get(&patient_id).cloned())
    }

    async fn get_biometrics(&self, patient_id: PatientId) -> Result<Option<Biometrics>> {
        let state = self.state.lock().await;
        state.check(Fault::Biometrics)?;
        Ok(state.biometrics.get(&patient_id).cloned())
    }

    async fn get_diagnoses(&self, patient_id: PatientId) -> Result<Vec<Diagnosis>> {
        let state = self.state.lock().await;
        state.check(Fault::Diagnoses)?;
        let mut diagnoses: Vec<_> = state
            .diagnoses
            .iter()
            .filter(|d| d.patient_id == patient_id)
            .cloned()
            .collect();
        diagnoses.sort_by_key(|d| d.id);
        Ok(diagnoses)
    }

    async fn get_dosages(&self, patient_id: PatientId) -> Result<Vec<Dosage>> {
        let state = self.state.lock().await;
        state.check(Fault::Dosages)?;
        let mut dosages: Vec<_> = state
            .dosages
            .iter()
            .filter(|d| d.patient_id == patient_id)
            .cloned()
            .collect();
        dosages.sort_by_key(|d| d.id);
        Ok(dosages)
    }

    async fn get_results(&self, patient_id: PatientId) -> Result<Vec<TestResult>> {
        let state = self.state.lock().await;
        state.check(Fault::Results)?;
        let mut results: Vec<_> = state
            .results
            .iter()
            .filter(|r| r.patient_id == patient_id)
            .cloned()
            .collect();
        results.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(results)
    }

    async fn list_beds(&self) -> Result<Vec<Bed>> {
        Ok(self.state.lock().await.beds.values().cloned().collect())
    }

    async fn list_wards(&self) -> Result<Vec<Ward>> {
        Ok(self.state.lock().await.wards.values().cloned().collect())
    }

    async fn get_ward(&self, id: WardId) -> Result<Option<Ward>> {
        Ok(self.state.lock().await.wards.get(&id).cloned())
    }

    async fn list_beds_in_ward(&self, ward_id: WardId) -> Result<Vec<Bed>> {
        let state = self.state.lock().await;
        let mut beds: Vec<_> = state
            .beds
            .values()
            .filter(|b| b.ward_id == ward_id)
            .cloned()
            .collect();
        beds.sort_by_key(|b| (b.bed_row, b.bed_column, b.id));
        Ok(beds)
    }

    async fn bed_occupants(&self) -> Result<Vec<(PatientId, BedId)>> {
        Ok(self
            .state
            .lock()
            .await
            .patients
            .values()
            .filter_map(|p| p.bed_id.map(|bed_id| (p.id, bed_id)))
            .collect())
    }

    async fn begin(&self) -> Result<Box<dyn GatewayTransaction>> {
        let guard = self.state.clone().lock_owned().await;
        guard.check(Fault::Begin)?;
        Ok(Box::new(MemoryTransaction {
            guard,
            staged_beds: BTreeMap::new(),
            staged_patients: BTreeMap::new(),
        }))
    }
}

/// 内存事务
pub struct MemoryTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    staged_beds: BTreeMap<BedId, Bed>,
    staged_patients: BTreeMap<PatientId, Patient>,
}

#[async_trait]
impl GatewayTransaction for MemoryTransaction {
    async fn get_patient(&mut self, id: PatientId) -> Result<Option<Patient>> {
        Ok(self
            .staged_patients
            .get(&id)
            .or_else(|| self.guard.patients.get(&id))
            .cloned())
    }

    async fn get_bed(&mut self, id: BedId) -> Result<Option<Bed>> {
        Ok(self
            .staged_beds
            .get(&id)
            .or_else(|| self.guard.beds.get(&id))
            .cloned())
    }

    async fn save_bed(&mut self, bed: &Bed) -> Result<()> {
        self.guard.check(Fault::SaveBed)?;
        if !self.guard.beds.contains_key(&bed.id) {
            return Err(MedicError::NotFound(medic_core::Entity::Bed(bed.id)));
        }
        self.staged_beds.insert(bed.id, bed.clone());
        Ok(())
    }

    async fn save_patient(&mut self, patient: &Patient) -> Result<()> {
        self.guard.check(Fault::SavePatient)?;
        if !self.guard.patients.contains_key(&patient.id) {
            return Err(MedicError::NotFound(medic_core::Entity::Patient(patient.id)));
        }
        self.staged_patients.insert(patient.id, patient.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let MemoryTransaction {
            mut guard,
            staged_beds,
            staged_patients,
        } = *self;
        guard.check(Fault::Commit)?;
        guard.beds.extend(staged_beds);
        guard.patients.extend(staged_patients);
        guard.commits += 1;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bed(id: i32) -> Bed {
        Bed {
            id: BedId(id),
            ward_id: WardId(1),
            bed_number: format!("A-{}", id),
            bed_row: 1,
            bed_column: id,
            occupied: false,
        }
    }

    #[tokio::test]
    async fn test_uncommitted_writes_are_discarded() {
        let gateway = MemoryGateway::new();
        gateway.insert_bed(bed(1)).await;

        let mut tx = gateway.begin().await.unwrap();
        let mut staged = tx.get_bed(BedId(1)).await.unwrap().unwrap();
        staged.occupied = true;
        tx.save_bed(&staged).await.unwrap();
        assert!(tx.get_bed(BedId(1)).await.unwrap().unwrap().occupied);
        tx.rollback().await.unwrap();

        assert!(!gateway.get_bed(BedId(1)).await.unwrap().unwrap().occupied);
        assert_eq!(gateway.commit_count().await, 0);
    }

    #[tokio::test]
    async fn test_commit_applies_staged_writes() {
        let gateway = MemoryGateway::new();
        gateway.insert_bed(bed(2)).await;

        let mut tx = gateway.begin().await.unwrap();
        let mut staged = tx.get_bed(BedId(2)).await.unwrap().unwrap();
        staged.occupied = true;
        tx.save_bed(&staged).await.unwrap();
        tx.commit().await.unwrap();

        assert!(gateway.get_bed(BedId(2)).await.unwrap().unwrap().occupied);
        assert_eq!(gateway.commit_count().await, 1);
    }

    #[tokio::test]
    async fn test_injected_fault_surfaces_as_unavailable() {
        let gateway = MemoryGateway::new();
        gateway.inject_fault(Fault::Dosages).await;

        let err = gateway.get_dosages(PatientId(1)).await.unwrap_err();
        assert!(err.is_retryable());

        gateway.clear_fault(Fault::Dosages).await;
        assert!(gateway.get_dosages(PatientId(1)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ward_reads() {
        let gateway = MemoryGateway::new();
        gateway
            .insert_ward(Ward {
                id: WardId(1),
                name: "Surgery".to_string(),
                location: "East wing".to_string(),
            })
            .await;
        gateway
            .insert_bed(Bed {
                bed_row: 2,
                bed_column: 1,
                ..bed(1)
            })
            .await;
        gateway
            .insert_bed(Bed {
                occupied: true,
                ..bed(2)
            })
            .await;
        gateway
            .insert_bed(Bed {
                ward_id: WardId(9),
                ..bed(3)
            })
            .await;

        let wards = gateway.list_wards().await.unwrap();
        assert_eq!(wards.len(), 1);
        assert!(gateway.get_ward(WardId(9)).await.unwrap().is_none());

        let beds = gateway.list_beds_in_ward(WardId(1)).await.unwrap();
        let ids: Vec<_> = beds.iter().map(|b| (b.id, b.occupied)).collect();
        assert_eq!(ids, vec![(BedId(2), true), (BedId(1), false)]);
    }
}
