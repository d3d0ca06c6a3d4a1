//! # Medic病房模块
//!
//! 床位分配与占用一致性检查：
//! - 分配、换床、释放床位，整体在一个事务中提交
//! - 全量检查床位占用标记与患者床位引用是否一致
//! - 按病房查看床位占用情况

pub mod allocation;

pub use allocation::{
    Allocation, BedAllocationManager, BedOccupancy, OccupancyDiscrepancy, WardOccupancy,
};
