// ==========================================
// 可变计量单位定价引擎 - 定价配置校验
// ==========================================
// 职责: 检查阶梯与最低计量配置的可疑项
// 红线: 只报告不拒绝；运行期仍按确定性规则计价
// ==========================================

use crate::domain::pricing::{ItemPricingConfig, PricingTier};
use crate::domain::types::SellingMode;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Serialize)]
pub enum ConfigIssueKind {
    #[error("阶梯 {label} 起点为负数")]
    NegativeFrom { label: String },

    #[error("阶梯 {label} 的上限不大于起点")]
    InvertedRange { label: String },

    #[error("阶梯 {label} 单价必须大于 0")]
    NonPositivePrice { label: String },

    #[error("阶梯 {first} 与 {second} 区间重叠")]
    OverlappingTiers { first: String, second: String },

    #[error("存在 {count} 个兜底阶梯")]
    MultipleDefaults { count: usize },

    #[error("客户组 {customer_group} 的最低计量为负数")]
    NegativeMinimum { customer_group: String },

    #[error("客户组 {customer_group} 存在多条启用的最低计量规则，运行期取第一条")]
    DuplicateMinimum { customer_group: String },

    #[error("客户组 {customer_group} 的固定费用为负数或非数值")]
    InvalidFixedCost { customer_group: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigIssue {
    pub item_code: String,
    pub kind: ConfigIssueKind,
}

impl std::fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.item_code, self.kind)
    }
}

/// 校验物料定价配置
pub fn validate_item_config(config: &ItemPricingConfig) -> Vec<ConfigIssue> {
    let mut kinds = Vec::new();

    for tier in &config.tiers {
        if tier.from_quantity < 0.0 {
            kinds.push(ConfigIssueKind::NegativeFrom {
                label: tier.label.clone(),
            });
        }
        if tier.to_quantity.map_or(false, |to| to <= tier.from_quantity) {
            kinds.push(ConfigIssueKind::InvertedRange {
                label: tier.label.clone(),
            });
        }
        if !(tier.unit_price > 0.0) {
            kinds.push(ConfigIssueKind::NonPositivePrice {
                label: tier.label.clone(),
            });
        }
    }

    // 重叠与兜底只在同一销售方式可见的阶梯之间比较
    for mode in [SellingMode::Area, SellingMode::Length] {
        let scoped: Vec<&PricingTier> = config.tiers.iter().filter(|t| t.applies_to(mode)).collect();
        for kind in schedule_issues(scoped) {
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }
    }

    let enabled: Vec<_> = config.minimums.iter().filter(|m| m.enabled).collect();
    for (idx, minimum) in enabled.iter().enumerate() {
        if minimum.minimum_quantity < 0.0 {
            kinds.push(ConfigIssueKind::NegativeMinimum {
                customer_group: minimum.customer_group.clone(),
            });
        }
        if !minimum.fixed_cost.is_finite() || minimum.fixed_cost < 0.0 {
            kinds.push(ConfigIssueKind::InvalidFixedCost {
                customer_group: minimum.customer_group.clone(),
            });
        }
        // 同组且销售方式范围相交 → 重复（每组只报一次）
        let duplicated_later = enabled[idx + 1..].iter().any(|other| {
            other.customer_group == minimum.customer_group
                && match (minimum.selling_mode, other.selling_mode) {
                    (Some(a), Some(b)) => a == b,
                    _ => true,
                }
        });
        let reported = kinds.iter().any(|k| {
            matches!(k, ConfigIssueKind::DuplicateMinimum { customer_group } if *customer_group == minimum.customer_group)
        });
        if duplicated_later && !reported {
            kinds.push(ConfigIssueKind::DuplicateMinimum {
                customer_group: minimum.customer_group.clone(),
            });
        }
    }

    kinds
        .into_iter()
        .map(|kind| ConfigIssue {
            item_code: config.item_code.clone(),
            kind,
        })
        .collect()
}

fn schedule_issues(mut tiers: Vec<&PricingTier>) -> Vec<ConfigIssueKind> {
    let mut kinds = Vec::new();

    // 相邻阶梯共享边界（上界包含）不算重叠
    tiers.sort_by(|a, b| a.from_quantity.total_cmp(&b.from_quantity));
    for pair in tiers.windows(2) {
        let (prev, next) = (pair[0], pair[1]);
        let overlaps = prev.to_quantity.map_or(true, |to| to > next.from_quantity);
        if overlaps {
            kinds.push(ConfigIssueKind::OverlappingTiers {
                first: prev.label.clone(),
                second: next.label.clone(),
            });
        }
    }

    let defaults = tiers.iter().filter(|t| t.is_default).count();
    if defaults > 1 {
        kinds.push(ConfigIssueKind::MultipleDefaults { count: defaults });
    }
    kinds
}
