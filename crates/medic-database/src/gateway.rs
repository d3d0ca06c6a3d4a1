//! PostgreSQL存储网关
//!
//! 读取直接走连接池；事务内的患者和床位读取使用 `SELECT ... FOR UPDATE`，
//! 同一床位上的并发分配会在行锁上排队。

use crate::connection::DatabasePool;
use crate::models::{DbBed, DbPatient};
use crate::queries::DatabaseQueries;
use async_trait::async_trait;
use medic_core::{
    Bed, BedId, Biometrics, Diagnosis, Dosage, GatewayTransaction, MedicError, Patient, PatientId,
    Result, StorageGateway, TestResult, Vitals, Ward, WardId,
};
use sqlx::{Postgres, Transaction};

/// 基于PostgreSQL的存储网关
#[derive(Debug, Clone)]
pub struct PgGateway {
    pool: DatabasePool,
}

impl PgGateway {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    pub fn queries(&self) -> DatabaseQueries<'_> {
        DatabaseQueries::new(&self.pool)
    }
}

#[async_trait]
impl StorageGateway for PgGateway {
    async fn get_patient(&self, id: PatientId) -> Result<Option<Patient>> {
        self.queries().get_patient_by_id(id).await
    }

    async fn get_bed(&self, id: BedId) -> Result<Option<Bed>> {
        self.queries().get_bed_by_id(id).await
    }

    async fn get_vitals(&self, patient_id: PatientId) -> Result<Option<Vitals>> {
        self.queries().get_vitals(patient_id).await
    }

    async fn get_biometrics(&self, patient_id: PatientId) -> Result<Option<Biometrics>> {
        self.queries().get_biometrics(patient_id).await
    }

    async fn get_diagnoses(&self, patient_id: PatientId) -> Result<Vec<Diagnosis>> {
        self.queries().get_diagnoses(patient_id).await
    }

    async fn get_dosages(&self, patient_id: PatientId) -> Result<Vec<Dosage>> {
        self.queries().get_dosages(patient_id).await
    }

    async fn get_results(&self, patient_id: PatientId) -> Result<Vec<TestResult>> {
        self.queries().get_results(patient_id).await
    }

    async fn list_beds(&self) -> Result<Vec<Bed>> {
        self.queries().list_beds().await
    }

    async fn list_wards(&self) -> Result<Vec<Ward>> {
        self.queries().list_wards().await
    }

    async fn get_ward(&self, id: WardId) -> Result<Option<Ward>> {
        self.queries().get_ward_by_id(id).await
    }

    async fn list_beds_in_ward(&self, ward_id: WardId) -> Result<Vec<Bed>> {
        self.queries().list_beds_by_ward(ward_id).await
    }

    async fn bed_occupants(&self) -> Result<Vec<(PatientId, BedId)>> {
        self.queries().bed_occupants().await
    }

    async fn begin(&self) -> Result<Box<dyn GatewayTransaction>> {
        let tx = self.pool.pool().begin().await.map_err(MedicError::from)?;
        Ok(Box::new(PgTransaction { tx }))
    }
}

/// PostgreSQL事务，丢弃时由sqlx自动回滚
pub struct PgTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl GatewayTransaction for PgTransaction {
    async fn get_patient(&mut self, id: PatientId) -> Result<Option<Patient>> {
        let row = sqlx::query_as::<_, DbPatient>(
            "SELECT * FROM patients WHERE id = $1 FOR UPDATE"
        )
        .bind(id.0)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(MedicError::from)?;

        Ok(row.map(Patient::from))
    }

    async fn get_bed(&mut self, id: BedId) -> Result<Option<Bed>> {
        let row = sqlx::query_as::<_, DbBed>("SELECT * FROM beds WHERE id = $1 FOR UPDATE")
            .bind(id.0)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(MedicError::from)?;

        Ok(row.map(Bed::from))
    }

    async fn save_bed(&mut self, bed: &Bed) -> Result<()> {
        let updated = sqlx::query(r#"
            UPDATE beds
            SET ward_id = $2, bed_number = $3, bed_row = $4, bed_column = $5, occupied = $6
            WHERE id = $1
        "#)
        .bind(bed.id.0)
        .bind(bed.ward_id.0)
        .bind(&bed.bed_number)
        .bind(bed.bed_row)
        .bind(bed.bed_column)
        .bind(bed.occupied)
        .execute(&mut *self.tx)
        .await
        .map_err(MedicError::from)?;

        if updated.rows_affected() == 0 {
            return Err(MedicError::NotFound(medic_core::Entity::Bed(bed.id)));
        }
        Ok(())
    }

    async fn save_patient(&mut self, patient: &Patient) -> Result<()> {
        let updated = sqlx::query(r#"
            UPDATE patients
            SET first_name = $2, middle_name = $3, last_name = $4, date_of_birth = $5,
                gender = $6, contact_number = $7, bed_id = $8, updated_at = NOW()
            WHERE id = $1
        "#)
        .bind(patient.id.0)
        .bind(&patient.first_name)
        .bind(&patient.middle_name)
        .bind(&patient.last_name)
        .bind(patient.date_of_birth)
        .bind(patient.gender.map(|g| g.code()))
        .bind(&patient.contact_number)
        .bind(patient.bed_id.map(|b| b.0))
        .execute(&mut *self.tx)
        .await
        .map_err(MedicError::from)?;

        if updated.rows_affected() == 0 {
            return Err(MedicError::NotFound(medic_core::Entity::Patient(patient.id)));
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await.map_err(MedicError::from)
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.tx.rollback().await.map_err(MedicError::from)
    }
}
