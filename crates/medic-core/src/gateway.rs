//! 存储网关接口
//!
//! 核心模块只依赖这里定义的契约。读取操作在连接池上直接执行，
//! 床位分配等写操作必须通过 [`GatewayTransaction`] 在同一个事务中完成。

use crate::models::*;
use crate::Result;
use async_trait::async_trait;

/// 存储网关
#[async_trait]
pub trait StorageGateway: Send + Sync {
    /// 根据ID读取患者
    async fn get_patient(&self, id: PatientId) -> Result<Option<Patient>>;

    /// 根据ID读取床位
    async fn get_bed(&self, id: BedId) -> Result<Option<Bed>>;

    async fn get_vitals(&self, patient_id: PatientId) -> Result<Option<Vitals>>;

    async fn get_biometrics(&self, patient_id: PatientId) -> Result<Option<Biometrics>>;

    async fn get_diagnoses(&self, patient_id: PatientId) -> Result<Vec<Diagnosis>>;

    async fn get_dosages(&self, patient_id: PatientId) -> Result<Vec<Dosage>>;

    async fn get_results(&self, patient_id: PatientId) -> Result<Vec<TestResult>>;

    /// 全部床位，按ID排序
    async fn list_beds(&self) -> Result<Vec<Bed>>;

    /// 全部病房，按ID排序
    async fn list_wards(&self) -> Result<Vec<Ward>>;

    async fn get_ward(&self, id: WardId) -> Result<Option<Ward>>;

    /// 指定病房的床位，按行、列排序
    async fn list_beds_in_ward(&self, ward_id: WardId) -> Result<Vec<Bed>>;

    /// 所有持有床位引用的患者，按患者ID排序
    async fn bed_occupants(&self) -> Result<Vec<(PatientId, BedId)>>;

    /// 开启一个读写事务
    async fn begin(&self) -> Result<Box<dyn GatewayTransaction>>;
}

/// 网关事务
///
/// 事务内读取的患者和床位在提交或回滚前对其他事务加锁，
/// 因此“检查占用后再占用”不会与其他调用交错。
/// 未提交就被丢弃的事务等同于回滚。
#[async_trait]
pub trait GatewayTransaction: Send {
    async fn get_patient(&mut self, id: PatientId) -> Result<Option<Patient>>;

    async fn get_bed(&mut self, id: BedId) -> Result<Option<Bed>>;

    async fn save_bed(&mut self, bed: &Bed) -> Result<()>;

    async fn save_patient(&mut self, patient: &Patient) -> Result<()>;

    async fn commit(self: Box<Self>) -> Result<()>;

    async fn rollback(self: Box<Self>) -> Result<()>;
}
