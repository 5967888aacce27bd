// ==========================================
// 可变计量单位定价引擎 - 定价配置领域模型
// ==========================================
// 用途: 外部配置源提供，引擎只读
// 同一次计算内不可变，可按 item_code 在编辑会话内缓存
// ==========================================

use crate::domain::types::SellingMode;
use serde::{Deserialize, Serialize};

// ==========================================
// PricingTier - 价格阶梯
// ==========================================
// 区间 [from_quantity, to_quantity]，上界包含
// to_quantity = None 表示无上限
// selling_mode = None 的阶梯对面积和长度两种方式共用
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingTier {
    pub from_quantity: f64,
    pub to_quantity: Option<f64>,
    pub unit_price: f64,
    pub label: String,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub selling_mode: Option<SellingMode>,
}

impl PricingTier {
    pub fn new(from_quantity: f64, to_quantity: Option<f64>, unit_price: f64, label: &str) -> Self {
        Self {
            from_quantity,
            to_quantity,
            unit_price,
            label: label.to_string(),
            is_default: false,
            selling_mode: None,
        }
    }

    /// 标记为兜底阶梯
    pub fn as_default(mut self) -> Self {
        self.is_default = true;
        self
    }

    /// 限定阶梯只用于某一种销售方式
    pub fn for_mode(mut self, mode: SellingMode) -> Self {
        self.selling_mode = Some(mode);
        self
    }

    pub fn applies_to(&self, mode: SellingMode) -> bool {
        self.selling_mode.map_or(true, |m| m == mode)
    }

    /// 计量值是否落在本阶梯区间内（上界包含）
    pub fn contains(&self, measure: f64) -> bool {
        measure >= self.from_quantity && self.to_quantity.map_or(true, |to| measure <= to)
    }

    /// 区间描述，例如 "0-5" / "5-∞"
    pub fn range_text(&self) -> String {
        match self.to_quantity {
            Some(to) => format!("{}-{}", self.from_quantity, to),
            None => format!("{}-∞", self.from_quantity),
        }
    }
}

// ==========================================
// CustomerGroupMinimum - 客户组最低计量
// ==========================================
// selling_mode = None 时对面积和长度两种方式都生效
// fixed_cost: 命中本规则时加到每件 rate 上的固定费用
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerGroupMinimum {
    pub customer_group: String,
    pub minimum_quantity: f64,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub selling_mode: Option<SellingMode>,
    #[serde(default)]
    pub fixed_cost: f64,
}

fn default_enabled() -> bool {
    true
}

impl CustomerGroupMinimum {
    pub fn new(customer_group: &str, minimum_quantity: f64) -> Self {
        Self {
            customer_group: customer_group.to_string(),
            minimum_quantity,
            enabled: true,
            description: String::new(),
            selling_mode: None,
            fixed_cost: 0.0,
        }
    }

    pub fn with_fixed_cost(mut self, fixed_cost: f64) -> Self {
        self.fixed_cost = fixed_cost;
        self
    }

    /// 是否带有需要计入的固定费用
    pub fn has_fixed_cost(&self) -> bool {
        self.fixed_cost.is_finite() && self.fixed_cost > 0.0
    }

    /// 是否适用于指定客户组与销售方式
    pub fn applies_to(&self, customer_group: &str, mode: SellingMode) -> bool {
        self.enabled
            && self.customer_group == customer_group
            && self.selling_mode.map_or(true, |m| m == mode)
    }
}

// ==========================================
// ItemPricingConfig - 物料定价配置
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemPricingConfig {
    pub item_code: String,
    pub default_selling_mode: SellingMode,
    #[serde(default)]
    pub tiers: Vec<PricingTier>,
    #[serde(default)]
    pub minimums: Vec<CustomerGroupMinimum>,
}

impl ItemPricingConfig {
    pub fn new(item_code: &str, default_selling_mode: SellingMode) -> Self {
        Self {
            item_code: item_code.to_string(),
            default_selling_mode,
            tiers: Vec::new(),
            minimums: Vec::new(),
        }
    }

    pub fn with_tiers(mut self, tiers: Vec<PricingTier>) -> Self {
        self.tiers = tiers;
        self
    }

    pub fn with_minimums(mut self, minimums: Vec<CustomerGroupMinimum>) -> Self {
        self.minimums = minimums;
        self
    }

    /// 指定销售方式可用的阶梯（保持配置顺序）
    pub fn tiers_for(&self, mode: SellingMode) -> Vec<PricingTier> {
        self.tiers.iter().filter(|t| t.applies_to(mode)).cloned().collect()
    }
}
