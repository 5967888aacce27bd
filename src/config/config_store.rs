// ==========================================
// 可变计量单位定价引擎 - 外部配置源 Trait
// ==========================================
// 职责: 定义引擎读取定价配置与客户组的接口（不包含实现）
// 实现者: SqlitePricingConfigStore（repository 层）、测试用内存配置源
// 红线: 不包含计价逻辑
// ==========================================

use crate::domain::pricing::ItemPricingConfig;
use crate::domain::types::SellingMode;
use crate::engine::quantity::RawDimensions;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 配置查询错误
///
/// 需要 Clone：同一 key 的在途查询被多个调用方共享结果
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LookupError {
    #[error("物料未配置定价: {0}")]
    ItemNotFound(String),

    #[error("客户不存在: {0}")]
    CustomerNotFound(String),

    #[error("配置源不支持服务端计价")]
    RemotePricingUnsupported,

    #[error("配置源访问失败: {0}")]
    Backend(String),
}

/// 服务端计价请求（PricingMode::Remote）
#[derive(Debug, Clone, PartialEq)]
pub struct RemotePriceRequest {
    pub item_code: String,
    pub customer_id: String,
    pub selling_mode: SellingMode,
    pub dims: RawDimensions,
    pub piece_count: f64,
    pub manual_unit_price: Option<f64>,
}

/// 服务端计价结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteQuote {
    pub rate: f64,
    pub unit_price: Option<f64>,
    pub tier_label: Option<String>,
    pub note: String,
}

// ==========================================
// PricingConfigStore Trait
// ==========================================
#[async_trait]
pub trait PricingConfigStore: Send + Sync {
    /// 读取物料定价配置（阶梯 + 客户组最低计量 + 默认销售方式）
    async fn get_item_pricing_config(&self, item_code: &str) -> Result<ItemPricingConfig, LookupError>;

    /// 读取客户所属客户组（未分组返回 None）
    async fn get_customer_group(&self, customer_id: &str) -> Result<Option<String>, LookupError>;

    /// 服务端计价（可选能力）
    async fn compute_price(&self, _request: &RemotePriceRequest) -> Result<RemoteQuote, LookupError> {
        Err(LookupError::RemotePricingUnsupported)
    }
}
