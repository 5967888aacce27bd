// ==========================================
// 可变计量单位定价引擎 - 数据仓储层
// ==========================================
// 红线: Repository 不含计价逻辑
// 约束: 所有查询使用参数化
// ==========================================

pub mod error;
pub mod pricing_config_repo;

pub use error::{RepositoryError, RepositoryResult};
pub use pricing_config_repo::SqlitePricingConfigStore;
