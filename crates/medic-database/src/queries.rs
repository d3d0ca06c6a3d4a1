//! 数据库查询操作

use crate::connection::DatabasePool;
use crate::models::*;
use medic_core::{
    Bed, BedId, Biometrics, Diagnosis, Dosage, MedicError, Patient, PatientId, Result, TestResult,
    Vitals, Ward, WardId,
};
use sqlx::Row;

/// 数据库查询操作接口
pub struct DatabaseQueries<'a> {
    pool: &'a DatabasePool,
}

impl<'a> DatabaseQueries<'a> {
    pub fn new(pool: &'a DatabasePool) -> Self {
        Self { pool }
    }

    /// 创建数据库表
    pub async fn create_tables(&self) -> Result<()> {
        let pool = self.pool.pool();

        // 创建病房表
        sqlx::query(r#"
            CREATE TABLE IF NOT EXISTS wards (
                id SERIAL PRIMARY KEY,
                name VARCHAR(128) NOT NULL,
                location VARCHAR(255) NOT NULL
            )
        "#).execute(pool).await.map_err(MedicError::from)?;

        // 创建床位表
        sqlx::query(r#"
            CREATE TABLE IF NOT EXISTS beds (
                id SERIAL PRIMARY KEY,
                ward_id INTEGER NOT NULL REFERENCES wards(id),
                bed_number VARCHAR(32) NOT NULL,
                bed_row INTEGER NOT NULL,
                bed_column INTEGER NOT NULL,
                occupied BOOLEAN NOT NULL DEFAULT FALSE
            )
        "#).execute(pool).await.map_err(MedicError::from)?;

        // 创建患者表
        sqlx::query(r#"
            CREATE TABLE IF NOT EXISTS patients (
                id SERIAL PRIMARY KEY,
                first_name VARCHAR(128) NOT NULL,
                middle_name VARCHAR(128),
                last_name VARCHAR(128) NOT NULL,
                date_of_birth DATE,
                gender VARCHAR(1),
                contact_number VARCHAR(32),
                bed_id INTEGER REFERENCES beds(id),
                created_at TIMESTAMP WITH TIME ZONE DEFAULT NOW(),
                updated_at TIMESTAMP WITH TIME ZONE DEFAULT NOW()
            )
        "#).execute(pool).await.map_err(MedicError::from)?;

        // 创建生命体征表（每个患者至多一条）
        sqlx::query(r#"
            CREATE TABLE IF NOT EXISTS vitals (
                id SERIAL PRIMARY KEY,
                patient_id INTEGER UNIQUE NOT NULL REFERENCES patients(id) ON DELETE CASCADE,
                temperature DOUBLE PRECISION NOT NULL,
                heart_rate INTEGER NOT NULL,
                blood_pressure_systolic INTEGER NOT NULL,
                blood_pressure_diastolic INTEGER NOT NULL,
                respiratory_rate INTEGER NOT NULL,
                oxygen_saturation DOUBLE PRECISION NOT NULL,
                note TEXT
            )
        "#).execute(pool).await.map_err(MedicError::from)?;

        // 创建体格测量表（每个患者至多一条）
        sqlx::query(r#"
            CREATE TABLE IF NOT EXISTS biometrics (
                id SERIAL PRIMARY KEY,
                patient_id INTEGER UNIQUE NOT NULL REFERENCES patients(id) ON DELETE CASCADE,
                mass DOUBLE PRECISION NOT NULL,
                height DOUBLE PRECISION NOT NULL,
                waist_circumference DOUBLE PRECISION NOT NULL
            )
        "#).execute(pool).await.map_err(MedicError::from)?;

        // 创建诊断表
        sqlx::query(r#"
            CREATE TABLE IF NOT EXISTS diagnoses (
                id SERIAL PRIMARY KEY,
                patient_id INTEGER NOT NULL REFERENCES patients(id) ON DELETE CASCADE,
                diagnosed TEXT,
                symptoms TEXT,
                signs TEXT,
                treatment TEXT
            )
        "#).execute(pool).await.map_err(MedicError::from)?;

        // 创建用药表
        sqlx::query(r#"
            CREATE TABLE IF NOT EXISTS dosages (
                id SERIAL PRIMARY KEY,
                patient_id INTEGER NOT NULL REFERENCES patients(id) ON DELETE CASCADE,
                drug_name VARCHAR(255) NOT NULL,
                amount VARCHAR(64) NOT NULL,
                prescription TEXT NOT NULL,
                caution TEXT,
                note TEXT
            )
        "#).execute(pool).await.map_err(MedicError::from)?;

        // 创建检验结果表
        sqlx::query(r#"
            CREATE TABLE IF NOT EXISTS test_results (
                id SERIAL PRIMARY KEY,
                patient_id INTEGER NOT NULL REFERENCES patients(id) ON DELETE CASCADE,
                result_code VARCHAR(64) NOT NULL,
                description TEXT NOT NULL,
                result_type VARCHAR(64) NOT NULL,
                test_method VARCHAR(128) NOT NULL,
                notes TEXT,
                created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
            )
        "#).execute(pool).await.map_err(MedicError::from)?;

        self.create_indexes().await?;

        tracing::info!("Database tables created successfully");
        Ok(())
    }

    /// 创建数据库索引
    async fn create_indexes(&self) -> Result<()> {
        let pool = self.pool.pool();

        let indexes = vec![
            "CREATE INDEX IF NOT EXISTS idx_beds_ward_id ON beds(ward_id)",
            // 一张床位最多被一个患者引用
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_patients_bed_id ON patients(bed_id) WHERE bed_id IS NOT NULL",
            "CREATE INDEX IF NOT EXISTS idx_patients_last_name ON patients(last_name)",
            "CREATE INDEX IF NOT EXISTS idx_diagnoses_patient_id ON diagnoses(patient_id)",
            "CREATE INDEX IF NOT EXISTS idx_dosages_patient_id ON dosages(patient_id)",
            "CREATE INDEX IF NOT EXISTS idx_test_results_patient_id ON test_results(patient_id)",
        ];

        for index_sql in indexes {
            sqlx::query(index_sql)
                .execute(pool)
                .await
                .map_err(MedicError::from)?;
        }

        tracing::info!("Database indexes created successfully");
        Ok(())
    }

    // ========== 病房与床位 ==========

    /// 创建病房
    pub async fn create_ward(&self, name: &str, location: &str) -> Result<WardId> {
        sqlx::query("INSERT INTO wards (name, location) VALUES ($1, $2) RETURNING id")
            .bind(name)
            .bind(location)
            .fetch_one(self.pool.pool())
            .await
            .map(|row| WardId(row.get("id")))
            .map_err(MedicError::from)
    }

    /// 创建床位，新床位总是空闲
    pub async fn create_bed(&self, bed: &NewBed) -> Result<BedId> {
        sqlx::query(r#"
            INSERT INTO beds (ward_id, bed_number, bed_row, bed_column, occupied)
            VALUES ($1, $2, $3, $4, FALSE)
            RETURNING id
        "#)
        .bind(bed.ward_id.0)
        .bind(&bed.bed_number)
        .bind(bed.bed_row)
        .bind(bed.bed_column)
        .fetch_one(self.pool.pool())
        .await
        .map(|row| BedId(row.get("id")))
        .map_err(MedicError::from)
    }

    pub async fn list_wards(&self) -> Result<Vec<Ward>> {
        let rows = sqlx::query_as::<_, DbWard>("SELECT * FROM wards ORDER BY id")
            .fetch_all(self.pool.pool())
            .await
            .map_err(MedicError::from)?;

        Ok(rows.into_iter().map(Ward::from).collect())
    }

    pub async fn get_ward_by_id(&self, id: WardId) -> Result<Option<Ward>> {
        let row = sqlx::query_as::<_, DbWard>("SELECT * FROM wards WHERE id = $1")
            .bind(id.0)
            .fetch_optional(self.pool.pool())
            .await
            .map_err(MedicError::from)?;

        Ok(row.map(Ward::from))
    }

    pub async fn get_bed_by_id(&self, id: BedId) -> Result<Option<Bed>> {
        let row = sqlx::query_as::<_, DbBed>("SELECT * FROM beds WHERE id = $1")
            .bind(id.0)
            .fetch_optional(self.pool.pool())
            .await
            .map_err(MedicError::from)?;

        Ok(row.map(Bed::from))
    }

    pub async fn list_beds(&self) -> Result<Vec<Bed>> {
        let rows = sqlx::query_as::<_, DbBed>("SELECT * FROM beds ORDER BY id")
            .fetch_all(self.pool.pool())
            .await
            .map_err(MedicError::from)?;

        Ok(rows.into_iter().map(Bed::from).collect())
    }

    /// 根据病房获取床位，按行列排序
    pub async fn list_beds_by_ward(&self, ward_id: WardId) -> Result<Vec<Bed>> {
        let rows = sqlx::query_as::<_, DbBed>(
            "SELECT * FROM beds WHERE ward_id = $1 ORDER BY bed_row, bed_column, id"
        )
        .bind(ward_id.0)
        .fetch_all(self.pool.pool())
        .await
        .map_err(MedicError::from)?;

        Ok(rows.into_iter().map(Bed::from).collect())
    }

    pub async fn bed_occupants(&self) -> Result<Vec<(PatientId, BedId)>> {
        let rows = sqlx::query(
            "SELECT id, bed_id FROM patients WHERE bed_id IS NOT NULL ORDER BY id"
        )
        .fetch_all(self.pool.pool())
        .await
        .map_err(MedicError::from)?;

        Ok(rows
            .into_iter()
            .map(|row| (PatientId(row.get("id")), BedId(row.get("bed_id"))))
            .collect())
    }

    // ========== 患者相关操作 ==========

    /// 创建新患者，不带床位
    pub async fn create_patient(&self, patient: &NewPatient) -> Result<PatientId> {
        sqlx::query(r#"
            INSERT INTO patients (first_name, middle_name, last_name, date_of_birth, gender, contact_number)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
        "#)
        .bind(&patient.first_name)
        .bind(&patient.middle_name)
        .bind(&patient.last_name)
        .bind(patient.date_of_birth)
        .bind(patient.gender.map(|g| g.code()))
        .bind(&patient.contact_number)
        .fetch_one(self.pool.pool())
        .await
        .map(|row| PatientId(row.get("id")))
        .map_err(MedicError::from)
    }

    /// 根据ID查找患者
    pub async fn get_patient_by_id(&self, id: PatientId) -> Result<Option<Patient>> {
        let row = sqlx::query_as::<_, DbPatient>("SELECT * FROM patients WHERE id = $1")
            .bind(id.0)
            .fetch_optional(self.pool.pool())
            .await
            .map_err(MedicError::from)?;

        Ok(row.map(Patient::from))
    }

    // ========== 临床子记录 ==========

    /// 写入或替换患者的生命体征
    pub async fn upsert_vitals(&self, patient_id: PatientId, vitals: &NewVitals) -> Result<()> {
        sqlx::query(r#"
            INSERT INTO vitals (patient_id, temperature, heart_rate, blood_pressure_systolic,
                                blood_pressure_diastolic, respiratory_rate, oxygen_saturation, note)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (patient_id) DO UPDATE SET
                temperature = EXCLUDED.temperature,
                heart_rate = EXCLUDED.heart_rate,
                blood_pressure_systolic = EXCLUDED.blood_pressure_systolic,
                blood_pressure_diastolic = EXCLUDED.blood_pressure_diastolic,
                respiratory_rate = EXCLUDED.respiratory_rate,
                oxygen_saturation = EXCLUDED.oxygen_saturation,
                note = EXCLUDED.note
        "#)
        .bind(patient_id.0)
        .bind(vitals.temperature)
        .bind(vitals.heart_rate)
        .bind(vitals.blood_pressure_systolic)
        .bind(vitals.blood_pressure_diastolic)
        .bind(vitals.respiratory_rate)
        .bind(vitals.oxygen_saturation)
        .bind(&vitals.note)
        .execute(self.pool.pool())
        .await
        .map_err(MedicError::from)?;

        Ok(())
    }

    /// 写入或替换患者的体格测量
    pub async fn upsert_biometrics(&self, patient_id: PatientId, biometrics: &NewBiometrics) -> Result<()> {
        sqlx::query(r#"
            INSERT INTO biometrics (patient_id, mass, height, waist_circumference)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (patient_id) DO UPDATE SET
                mass = EXCLUDED.mass,
                height = EXCLUDED.height,
                waist_circumference = EXCLUDED.waist_circumference
        "#)
        .bind(patient_id.0)
        .bind(biometrics.mass)
        .bind(biometrics.height)
        .bind(biometrics.waist_circumference)
        .execute(self.pool.pool())
        .await
        .map_err(MedicError::from)?;

        Ok(())
    }

    pub async fn add_diagnosis(&self, patient_id: PatientId, diagnosis: &NewDiagnosis) -> Result<i32> {
        sqlx::query(r#"
            INSERT INTO diagnoses (patient_id, diagnosed, symptoms, signs, treatment)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
        "#)
        .bind(patient_id.0)
        .bind(&diagnosis.diagnosed)
        .bind(&diagnosis.symptoms)
        .bind(&diagnosis.signs)
        .bind(&diagnosis.treatment)
        .fetch_one(self.pool.pool())
        .await
        .map(|row| row.get("id"))
        .map_err(MedicError::from)
    }

    pub async fn add_dosage(&self, patient_id: PatientId, dosage: &NewDosage) -> Result<i32> {
        sqlx::query(r#"
            INSERT INTO dosages (patient_id, drug_name, amount, prescription, caution, note)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
        "#)
        .bind(patient_id.0)
        .bind(&dosage.drug_name)
        .bind(&dosage.amount)
        .bind(&dosage.prescription)
        .bind(&dosage.caution)
        .bind(&dosage.note)
        .fetch_one(self.pool.pool())
        .await
        .map(|row| row.get("id"))
        .map_err(MedicError::from)
    }

    pub async fn add_result(&self, patient_id: PatientId, result: &NewTestResult) -> Result<i32> {
        sqlx::query(r#"
            INSERT INTO test_results (patient_id, result_code, description, result_type, test_method, notes)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
        "#)
        .bind(patient_id.0)
        .bind(&result.result_code)
        .bind(&result.description)
        .bind(&result.result_type)
        .bind(&result.test_method)
        .bind(&result.notes)
        .fetch_one(self.pool.pool())
        .await
        .map(|row| row.get("id"))
        .map_err(MedicError::from)
    }

    pub async fn get_vitals(&self, patient_id: PatientId) -> Result<Option<Vitals>> {
        let row = sqlx::query_as::<_, DbVitals>("SELECT * FROM vitals WHERE patient_id = $1")
            .bind(patient_id.0)
            .fetch_optional(self.pool.pool())
            .await
            .map_err(MedicError::from)?;

        Ok(row.map(Vitals::from))
    }

    pub async fn get_biometrics(&self, patient_id: PatientId) -> Result<Option<Biometrics>> {
        let row = sqlx::query_as::<_, DbBiometrics>("SELECT * FROM biometrics WHERE patient_id = $1")
            .bind(patient_id.0)
            .fetch_optional(self.pool.pool())
            .await
            .map_err(MedicError::from)?;

        Ok(row.map(Biometrics::from))
    }

    pub async fn get_diagnoses(&self, patient_id: PatientId) -> Result<Vec<Diagnosis>> {
        let rows = sqlx::query_as::<_, DbDiagnosis>(
            "SELECT * FROM diagnoses WHERE patient_id = $1 ORDER BY id"
        )
        .bind(patient_id.0)
        .fetch_all(self.pool.pool())
        .await
        .map_err(MedicError::from)?;

        Ok(rows.into_iter().map(Diagnosis::from).collect())
    }

    pub async fn get_dosages(&self, patient_id: PatientId) -> Result<Vec<Dosage>> {
        let rows = sqlx::query_as::<_, DbDosage>(
            "SELECT * FROM dosages WHERE patient_id = $1 ORDER BY id"
        )
        .bind(patient_id.0)
        .fetch_all(self.pool.pool())
        .await
        .map_err(MedicError::from)?;

        Ok(rows.into_iter().map(Dosage::from).collect())
    }

    pub async fn get_results(&self, patient_id: PatientId) -> Result<Vec<TestResult>> {
        let rows = sqlx::query_as::<_, DbTestResult>(
            "SELECT * FROM test_results WHERE patient_id = $1 ORDER BY created_at DESC, id"
        )
        .bind(patient_id.0)
        .fetch_all(self.pool.pool())
        .await
        .map_err(MedicError::from)?;

        Ok(rows.into_iter().map(TestResult::from).collect())
    }
}
