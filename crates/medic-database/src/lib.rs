//! # Medic数据库模块
//!
//! 存储网关的实现：PostgreSQL连接池、表结构与CRUD操作，以及用于测试和嵌入的内存网关。

pub mod connection;
pub mod gateway;
pub mod memory;
pub mod models;
pub mod queries;

// 重新导出主要类型
pub use connection::{DatabaseConfig, DatabasePool};
pub use gateway::{PgGateway, PgTransaction};
pub use memory::{Fault, MemoryGateway};
pub use models::*;
pub use queries::DatabaseQueries;
