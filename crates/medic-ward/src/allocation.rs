//! 床位分配管理
//!
//! 床位占用标记和患者床位引用的唯一写入方。每次分配或释放都在一个网关事务中完成，
//! 任何一步失败都会回滚，不会留下“床位已占用但无人引用”或相反的状态。

use medic_core::{
    Bed, BedId, Entity, GatewayTransaction, MedicError, Patient, PatientId, Result,
    StorageGateway, Ward, WardId,
};
use std::collections::HashMap;
use serde::{Deserialize, Serialize};

/// 一次分配操作的结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub patient_id: PatientId,
    /// 本次被释放的原床位
    pub released: Option<BedId>,
    /// 本次分配的新床位
    pub assigned: Option<BedId>,
}

impl Allocation {
    /// 是否没有产生任何写入
    pub fn is_noop(&self) -> bool {
        self.released.is_none() && self.assigned.is_none()
    }
}

/// 床位分配管理器
#[derive(Debug, Default, Clone)]
pub struct BedAllocationManager;

impl BedAllocationManager {
    pub fn new() -> Self {
        Self
    }

    /// 为患者分配床位；`bed_id` 为 `None` 时释放患者当前床位
    pub async fn assign(
        &self,
        gateway: &dyn StorageGateway,
        patient_id: PatientId,
        bed_id: Option<BedId>,
    ) -> Result<Allocation> {
        let mut tx = gateway.begin().await?;

        match self.assign_within(tx.as_mut(), patient_id, bed_id).await {
            Ok(allocation) => {
                tx.commit().await?;
                tracing::info!(
                    "Bed allocation committed for patient {}: released={:?}, assigned={:?}",
                    patient_id,
                    allocation.released,
                    allocation.assigned
                );
                Ok(allocation)
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::error!(
                        "Rollback failed after allocation error for patient {}: {}",
                        patient_id,
                        rollback_err
                    );
                }
                tracing::warn!("Bed allocation rejected for patient {}: {}", patient_id, e);
                Err(e)
            }
        }
    }

    /// 释放患者当前床位，未持有床位时不做任何写入
    pub async fn release(
        &self,
        gateway: &dyn StorageGateway,
        patient_id: PatientId,
    ) -> Result<Allocation> {
        self.assign(gateway, patient_id, None).await
    }

    /// 在调用方提供的事务中执行分配，不提交
    ///
    /// 写入顺序固定：先释放原床位，再占用新床位，最后更新患者。
    pub async fn assign_within(
        &self,
        tx: &mut dyn GatewayTransaction,
        patient_id: PatientId,
        bed_id: Option<BedId>,
    ) -> Result<Allocation> {
        let mut patient = tx
            .get_patient(patient_id)
            .await?
            .ok_or(MedicError::NotFound(Entity::Patient(patient_id)))?;

        match bed_id {
            Some(bed_id) => self.occupy(tx, &mut patient, bed_id).await,
            None => self.vacate(tx, &mut patient).await,
        }
    }

    async fn occupy(
        &self,
        tx: &mut dyn GatewayTransaction,
        patient: &mut Patient,
        bed_id: BedId,
    ) -> Result<Allocation> {
        let mut bed = tx
            .get_bed(bed_id)
            .await?
            .ok_or(MedicError::NotFound(Entity::Bed(bed_id)))?;

        // 即使占用者就是该患者本人也按冲突处理
        if bed.occupied {
            return Err(MedicError::BedOccupied(bed_id));
        }

        let released = match patient.bed_id {
            Some(current) if current != bed_id => self.free_bed(tx, current).await?,
            _ => None,
        };

        bed.occupied = true;
        tx.save_bed(&bed).await?;

        patient.bed_id = Some(bed_id);
        tx.save_patient(patient).await?;

        tracing::debug!("Bed {} marked occupied by patient {}", bed_id, patient.id);

        Ok(Allocation {
            patient_id: patient.id,
            released,
            assigned: Some(bed_id),
        })
    }

    async fn vacate(
        &self,
        tx: &mut dyn GatewayTransaction,
        patient: &mut Patient,
    ) -> Result<Allocation> {
        let Some(current) = patient.bed_id else {
            tracing::debug!("Patient {} holds no bed; release is a no-op", patient.id);
            return Ok(Allocation {
                patient_id: patient.id,
                released: None,
                assigned: None,
            });
        };

        let released = self.free_bed(tx, current).await?;

        patient.bed_id = None;
        tx.save_patient(patient).await?;

        Ok(Allocation {
            patient_id: patient.id,
            released,
            assigned: None,
        })
    }

    /// 把床位标记为空闲；床位记录已不存在时只记录告警
    async fn free_bed(
        &self,
        tx: &mut dyn GatewayTransaction,
        bed_id: BedId,
    ) -> Result<Option<BedId>> {
        match tx.get_bed(bed_id).await? {
            Some(mut bed) => {
                bed.occupied = false;
                tx.save_bed(&bed).await?;
                tracing::debug!("Bed {} marked unoccupied", bed_id);
                Ok(Some(bed_id))
            }
            None => {
                tracing::warn!("Patient referenced missing bed {}; clearing reference", bed_id);
                Ok(None)
            }
        }
    }
}

/// 占用一致性检查中发现的问题
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OccupancyDiscrepancy {
    /// 床位标记为占用但没有患者引用
    OccupiedWithoutPatient { bed_id: BedId },
    /// 有患者引用但床位标记为空闲
    ReferencedButFree { bed_id: BedId, patient_id: PatientId },
    /// 同一床位被多个患者引用
    SharedBed { bed_id: BedId, patients: Vec<PatientId> },
    /// 患者引用了不存在的床位
    MissingBed { bed_id: BedId, patient_id: PatientId },
}

impl BedAllocationManager {
    /// 检查全部床位的占用一致性，返回空列表表示一致
    pub async fn audit(&self, gateway: &dyn StorageGateway) -> Result<Vec<OccupancyDiscrepancy>> {
        let beds = gateway.list_beds().await?;
        let occupants = gateway.bed_occupants().await?;
        let discrepancies = find_discrepancies(&beds, &occupants);

        if discrepancies.is_empty() {
            tracing::info!("Occupancy audit passed for {} beds", beds.len());
        } else {
            tracing::warn!(
                "Occupancy audit found {} discrepancies across {} beds",
                discrepancies.len(),
                beds.len()
            );
        }
        Ok(discrepancies)
    }
}

/// 单个床位的占用情况
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BedOccupancy {
    pub bed: Bed,
    /// 引用该床位的患者
    pub occupant: Option<PatientId>,
}

/// 病房床位视图
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WardOccupancy {
    pub ward: Ward,
    /// 按行、列排序
    pub beds: Vec<BedOccupancy>,
    pub occupied: usize,
    pub free: usize,
}

impl BedAllocationManager {
    /// 病房内每张床位的占用者和空闲统计
    ///
    /// 统计以床位的占用标记为准，两者不一致时由 [`audit`](Self::audit) 报告。
    pub async fn ward_occupancy(
        &self,
        gateway: &dyn StorageGateway,
        ward_id: WardId,
    ) -> Result<WardOccupancy> {
        let ward = gateway
            .get_ward(ward_id)
            .await?
            .ok_or(MedicError::NotFound(Entity::Ward(ward_id)))?;

        let beds = gateway.list_beds_in_ward(ward_id).await?;
        let occupants: HashMap<BedId, PatientId> = gateway
            .bed_occupants()
            .await?
            .into_iter()
            .map(|(patient_id, bed_id)| (bed_id, patient_id))
            .collect();

        let occupied = beds.iter().filter(|b| b.occupied).count();
        let free = beds.len() - occupied;
        let beds = beds
            .into_iter()
            .map(|bed| BedOccupancy {
                occupant: occupants.get(&bed.id).copied(),
                bed,
            })
            .collect();

        Ok(WardOccupancy {
            ward,
            beds,
            occupied,
            free,
        })
    }
}

fn find_discrepancies(
    beds: &[Bed],
    occupants: &[(PatientId, BedId)],
) -> Vec<OccupancyDiscrepancy> {
    use std::collections::BTreeMap;

    let mut by_bed: BTreeMap<BedId, Vec<PatientId>> = BTreeMap::new();
    for (patient_id, bed_id) in occupants {
        by_bed.entry(*bed_id).or_default().push(*patient_id);
    }

    let mut discrepancies = Vec::new();
    for bed in beds {
        match by_bed.remove(&bed.id) {
            None if bed.occupied => {
                discrepancies.push(OccupancyDiscrepancy::OccupiedWithoutPatient { bed_id: bed.id });
            }
            None => {}
            Some(patients) => {
                if !bed.occupied {
                    discrepancies.push(OccupancyDiscrepancy::ReferencedButFree {
                        bed_id: bed.id,
                        patient_id: patients[0],
                    });
                }
                if patients.len() > 1 {
                    discrepancies.push(OccupancyDiscrepancy::SharedBed {
                        bed_id: bed.id,
                        patients,
                    });
                }
            }
        }
    }

    // 剩下的引用指向不存在的床位
    for (bed_id, patients) in by_bed {
        for patient_id in patients {
            discrepancies.push(OccupancyDiscrepancy::MissingBed { bed_id, patient_id });
        }
    }

    discrepancies
}
