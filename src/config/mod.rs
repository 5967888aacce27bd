// ==========================================
// 可变计量单位定价引擎 - 配置层
// ==========================================
// 职责: 外部定价配置源接口 + 引擎运行参数
// 存储: config_kv 表（引擎参数）
// ==========================================

pub mod config_manager;
pub mod config_store;

pub use config_manager::{config_keys, ConfigManager, EngineSettings};
pub use config_store::{LookupError, PricingConfigStore, RemotePriceRequest, RemoteQuote};
