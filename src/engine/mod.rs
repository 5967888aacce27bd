// ==========================================
// 可变计量单位定价引擎 - 引擎层
// ==========================================
// 职责: 数量解析、最低计量、阶梯匹配、价格计算、单价接管状态机、重算编排
// 红线: 纯函数部分无 I/O；所有计算结论写入行说明
// ==========================================

pub mod error;
pub mod events;
pub mod lookup_cache;
pub mod minimum;
pub mod orchestrator;
pub mod override_state;
pub mod price;
pub mod quantity;
pub mod rounding;
pub mod tier;
pub mod validation;

// 重导出核心引擎
pub use error::{EngineError, EngineResult};
pub use events::{
    NoOpEventPublisher, OptionalEventPublisher, PricingEvent, PricingEventPublisher,
    PricingEventType, RowWriteObserver,
};
pub use lookup_cache::LookupCache;
pub use minimum::{MinimumEnforcer, MinimumOutcome};
pub use orchestrator::{PricingOrchestrator, RecalcOutcome};
pub use override_state::{base_note, InputDecision, OverrideStateMachine};
pub use price::{PriceCalculator, PriceInput, PriceOutcome, PriceSource};
pub use quantity::{QuantityOutcome, QuantityResolver, RawDimensions};
pub use tier::{TierMatch, TierMatchKind, TierResolver};
pub use validation::{validate_item_config, ConfigIssue, ConfigIssueKind};
