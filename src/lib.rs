// ==========================================
// 可变计量单位定价引擎 - 核心库
// ==========================================
// 职责: 销售单据行按 面积 / 长度 / 件数 计价
// 技术栈: Rust + Tokio + SQLite
// 系统定位: 由单据表单事件驱动的定价库 (不含 UI)
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "zh-CN");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 引擎层 - 定价规则
pub mod engine;

// 配置层 - 外部配置源与引擎参数
pub mod config;

// 数据仓储层 - SQLite 配置源
pub mod repository;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{DocumentType, LineField, OverrideState, PricingMode, SellingMode};

// 领域实体
pub use domain::{
    CustomerGroupMinimum, ItemPricingConfig, LineItem, PricingTier, RowId, SalesDocument,
    SharedDocument,
};

// 引擎
pub use engine::{
    MinimumEnforcer, OverrideStateMachine, PriceCalculator, PricingOrchestrator,
    QuantityResolver, TierResolver,
};

// 配置
pub use config::{EngineSettings, PricingConfigStore};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "可变计量单位定价引擎";
