// ==========================================
// 可变计量单位定价引擎 - 客户组最低计量 纯函数库
// ==========================================
// 职责: 合计计量 + 客户组 → 生效计量（不低于客户组最低值）
// 红线: 仅面积/长度参与；按件销售直接旁路
// ==========================================

use crate::domain::pricing::CustomerGroupMinimum;
use crate::domain::types::SellingMode;

// ==========================================
// MinimumOutcome - 最低计量结果
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct MinimumOutcome {
    pub effective_measure: f64,
    pub minimum_applied: bool,
    pub matched_minimum: Option<CustomerGroupMinimum>,
}

impl MinimumOutcome {
    fn passthrough(total_measure: f64) -> Self {
        Self {
            effective_measure: total_measure,
            minimum_applied: false,
            matched_minimum: None,
        }
    }
}

pub struct MinimumEnforcer;

impl MinimumEnforcer {
    /// 查找客户组适用的最低计量规则
    ///
    /// 同一客户组存在多条启用规则时取第一条（配置校验会单独报告重复项）
    pub fn find_minimum<'a>(
        customer_group: &str,
        mode: SellingMode,
        minimums: &'a [CustomerGroupMinimum],
    ) -> Option<&'a CustomerGroupMinimum> {
        let mut matches = minimums.iter().filter(|m| m.applies_to(customer_group, mode));
        let first = matches.next()?;
        if matches.next().is_some() {
            tracing::warn!(
                "客户组 {} 存在多条启用的最低计量规则，采用第一条 (minimum={})",
                customer_group,
                first.minimum_quantity
            );
        }
        Some(first)
    }

    /// 应用客户组最低计量
    ///
    /// # 规则
    /// - 客户组为空 / 无匹配启用规则 / 按件销售 → 生效计量 = 合计计量
    /// - 否则 生效计量 = max(合计计量, 最低计量)，minimum_applied = 生效 > 合计
    pub fn enforce(
        mode: SellingMode,
        total_measure: f64,
        customer_group: Option<&str>,
        minimums: &[CustomerGroupMinimum],
    ) -> MinimumOutcome {
        if !mode.is_measured() {
            return MinimumOutcome::passthrough(total_measure);
        }

        let matched = match customer_group.and_then(|g| Self::find_minimum(g, mode, minimums)) {
            Some(m) => m,
            None => return MinimumOutcome::passthrough(total_measure),
        };

        let effective_measure = total_measure.max(matched.minimum_quantity);
        MinimumOutcome {
            effective_measure,
            minimum_applied: effective_measure > total_measure,
            matched_minimum: Some(matched.clone()),
        }
    }
}
