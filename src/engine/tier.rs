// ==========================================
// 可变计量单位定价引擎 - 价格阶梯匹配 纯函数库
// ==========================================
// 职责: 生效计量 + 阶梯表 → 单价 + 阶梯描述
// 红线: 无状态、无副作用、无 I/O
// ==========================================

use crate::domain::pricing::PricingTier;
use crate::domain::types::SellingMode;
use serde::{Deserialize, Serialize};

/// 阶梯命中方式（写入计算说明，便于追溯）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TierMatchKind {
    /// 区间直接命中
    Range,
    /// 区间存在空隙，取不高于计量的最高起点阶梯
    Floor,
    /// 兜底默认阶梯
    Default,
}

// ==========================================
// TierMatch - 阶梯匹配结果
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct TierMatch {
    pub unit_price: f64,
    pub tier_label: String,
    pub tier: PricingTier,
    pub kind: TierMatchKind,
}

impl TierMatch {
    fn from_tier(tier: &PricingTier, kind: TierMatchKind) -> Self {
        Self {
            unit_price: tier.unit_price,
            tier_label: tier.label.clone(),
            tier: tier.clone(),
            kind,
        }
    }
}

pub struct TierResolver;

impl TierResolver {
    /// 匹配价格阶梯
    ///
    /// 只考虑适用于 mode 的阶梯（限定该方式的，加上未限定方式的）
    ///
    /// # 规则（按顺序）
    /// 1. 按 from 升序扫描，取第一个 from ≤ 计量 且 (to 无上限 或 计量 ≤ to) 的阶梯（上界包含）
    /// 2. 未命中（区间有空隙）→ 按 from 降序扫描，取第一个 from ≤ 计量 的阶梯
    /// 3. 仍未命中 → 取 is_default 阶梯
    /// 4. 否则返回 None（由调用方走手工单价兜底或报零价）
    pub fn resolve(
        mode: SellingMode,
        effective_measure: f64,
        tiers: &[PricingTier],
    ) -> Option<TierMatch> {
        let scoped: Vec<&PricingTier> = tiers.iter().filter(|t| t.applies_to(mode)).collect();
        if scoped.is_empty() {
            return None;
        }

        // 稳定排序：起点相同的阶梯保持配置顺序
        let mut ascending = scoped.clone();
        ascending.sort_by(|a, b| a.from_quantity.total_cmp(&b.from_quantity));

        if let Some(tier) = ascending.iter().find(|t| t.contains(effective_measure)) {
            return Some(TierMatch::from_tier(tier, TierMatchKind::Range));
        }

        if let Some(tier) = ascending
            .iter()
            .rev()
            .find(|t| t.from_quantity <= effective_measure)
        {
            tracing::debug!(
                "计量 {} 落在阶梯空隙，按最高起点阶梯 {} 计价",
                effective_measure,
                tier.label
            );
            return Some(TierMatch::from_tier(tier, TierMatchKind::Floor));
        }

        scoped
            .into_iter()
            .find(|t| t.is_default)
            .map(|t| TierMatch::from_tier(t, TierMatchKind::Default))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schedule() -> Vec<PricingTier> {
        vec![
            PricingTier::new(0.0, Some(5.0), 10.0, "A"),
            PricingTier::new(5.0, None, 8.0, "B"),
        ]
    }

    #[test]
    fn test_range_match() {
        let m = TierResolver::resolve(SellingMode::Area, 1.0, &schedule()).unwrap();
        assert_eq!(m.tier_label, "A");
        assert_eq!(m.unit_price, 10.0);
        assert_eq!(m.kind, TierMatchKind::Range);

        let m = TierResolver::resolve(SellingMode::Area, 12.0, &schedule()).unwrap();
        assert_eq!(m.tier_label, "B");
    }

    #[test]
    fn test_upper_bound_inclusive() {
        // 5.0 同时满足 A 的上界与 B 的下界，取 A
        let m = TierResolver::resolve(SellingMode::Area, 5.0, &schedule()).unwrap();
        assert_eq!(m.tier_label, "A");
    }

    #[test]
    fn test_unsorted_input() {
        let mut tiers = schedule();
        tiers.reverse();
        let m = TierResolver::resolve(SellingMode::Area, 5.0, &tiers).unwrap();
        assert_eq!(m.tier_label, "A");
    }

    #[test]
    fn test_gap_falls_back_to_highest_floor() {
        let tiers = vec![
            PricingTier::new(0.0, Some(2.0), 20.0, "S"),
            PricingTier::new(3.0, Some(6.0), 15.0, "M"),
            PricingTier::new(10.0, Some(20.0), 12.0, "L"),
        ];
        let m = TierResolver::resolve(SellingMode::Area, 2.5, &tiers).unwrap();
        assert_eq!(m.tier_label, "S");
        assert_eq!(m.kind, TierMatchKind::Floor);

        let m = TierResolver::resolve(SellingMode::Area, 8.0, &tiers).unwrap();
        assert_eq!(m.tier_label, "M");

        let m = TierResolver::resolve(SellingMode::Area, 25.0, &tiers).unwrap();
        assert_eq!(m.tier_label, "L");
        assert_eq!(m.kind, TierMatchKind::Floor);
    }

    #[test]
    fn test_default_tier() {
        let tiers = vec![
            PricingTier::new(2.0, Some(5.0), 10.0, "A"),
            PricingTier::new(5.0, None, 9.0, "Std").as_default(),
        ];
        let m = TierResolver::resolve(SellingMode::Area, 1.0, &tiers).unwrap();
        assert_eq!(m.tier_label, "Std");
        assert_eq!(m.kind, TierMatchKind::Default);
    }

    #[test]
    fn test_schedules_per_selling_mode() {
        let tiers = vec![
            PricingTier::new(0.0, Some(10.0), 25.0, "m² S").for_mode(SellingMode::Area),
            PricingTier::new(10.0, None, 18.0, "m² L").for_mode(SellingMode::Area),
            PricingTier::new(0.0, Some(5.0), 8.0, "ml S").for_mode(SellingMode::Length),
            PricingTier::new(5.0, None, 6.0, "ml L").for_mode(SellingMode::Length),
        ];
        let area = TierResolver::resolve(SellingMode::Area, 3.0, &tiers).unwrap();
        assert_eq!(area.tier_label, "m² S");
        assert_eq!(area.unit_price, 25.0);

        let length = TierResolver::resolve(SellingMode::Length, 3.0, &tiers).unwrap();
        assert_eq!(length.tier_label, "ml S");
        assert_eq!(length.unit_price, 8.0);

        let length = TierResolver::resolve(SellingMode::Length, 12.0, &tiers).unwrap();
        assert_eq!(length.tier_label, "ml L");

        assert!(TierResolver::resolve(SellingMode::Piece, 3.0, &tiers).is_none());
    }

    #[test]
    fn test_default_tier_of_other_mode_ignored() {
        let tiers = vec![
            PricingTier::new(2.0, None, 10.0, "A").for_mode(SellingMode::Area),
            PricingTier::new(0.0, None, 4.0, "L").for_mode(SellingMode::Length).as_default(),
        ];
        assert!(TierResolver::resolve(SellingMode::Area, 1.0, &tiers).is_none());
    }

    #[test]
    fn test_no_tier() {
        assert!(TierResolver::resolve(SellingMode::Area, 1.0, &[]).is_none());
        let tiers = vec![PricingTier::new(2.0, Some(5.0), 10.0, "A")];
        assert!(TierResolver::resolve(SellingMode::Area, 1.0, &tiers).is_none());
    }
}
