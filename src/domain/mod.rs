// ==========================================
// 可变计量单位定价引擎 - 领域层
// ==========================================
// 职责: 定义定价配置、单据行与状态枚举
// 红线: 领域层不含计算逻辑、不含 I/O
// ==========================================

pub mod line_item;
pub mod pricing;
pub mod types;

pub use line_item::{LineItem, RowId, SalesDocument, SharedDocument};
pub use pricing::{CustomerGroupMinimum, ItemPricingConfig, PricingTier};
pub use types::{DocumentType, LineField, OverrideState, PricingMode, SellingMode};
