// ==========================================
// 可变计量单位定价引擎 - 单价接管状态机
// ==========================================
// 状态: Unset / Auto / Manual / Locked
// 红线:
// - Manual / Locked 行的 rate 永不被自动计算覆盖
// - Manual / Locked 行仍然更新计量字段，amount 按 rate×件数 重算
// - 说明中的状态标记只保留一个，重复操作不累积
// ==========================================

use crate::domain::line_item::LineItem;
use crate::domain::types::{OverrideState, SellingMode};
use crate::engine::price::{PriceCalculator, PriceInput, PriceOutcome, PriceSource};
use crate::engine::quantity::{QuantityOutcome, QuantityResolver, RawDimensions};
use crate::i18n::t;

// ===== 说明标记 =====
pub const AUTO_MARKER: &str = "🤖";
pub const MANUAL_MARKER: &str = "🖊️";
pub const LOCKED_MARKER: &str = "🔒";
pub const UNLOCKED_MARKER: &str = "🔓";

const MARKERS: [&str; 4] = [AUTO_MARKER, MANUAL_MARKER, LOCKED_MARKER, UNLOCKED_MARKER];

/// 去掉说明末尾的状态标记，返回基础说明
pub fn base_note(note: &str) -> &str {
    let cut = MARKERS
        .iter()
        .filter_map(|m| {
            if note.starts_with(m) {
                Some(0)
            } else {
                note.find(&format!("\n{}", m))
            }
        })
        .min();
    match cut {
        Some(idx) => note[..idx].trim_end(),
        None => note.trim_end(),
    }
}

fn with_marker(note: &str, marker_key: &str) -> String {
    let base = base_note(note);
    let marker = t(marker_key);
    if base.is_empty() {
        marker
    } else {
        format!("{}\n{}", base, marker)
    }
}

/// 输入变更后的处理结论
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputDecision {
    /// Unset/Auto 的面积/长度行，输入完整，需要查询配置后计价
    Reprice(QuantityOutcome),
    /// 输入不完整，已写入零价与提示
    Incomplete,
    /// 已就地完成（按件销售、手工、锁定）
    Settled,
}

pub struct OverrideStateMachine;

impl OverrideStateMachine {
    /// 定价输入变更：总是先更新计量字段，再按状态决定后续动作
    pub fn on_input_changed(line: &mut LineItem) -> InputDecision {
        let quantity = QuantityResolver::resolve_line(line);
        QuantityResolver::apply_to_line(line, &quantity);

        if !line.override_state.allows_repricing() {
            Self::refresh_frozen_amount(line);
            return InputDecision::Settled;
        }

        if !quantity.is_valid {
            Self::clear_price(line);
            line.note = PriceCalculator::incomplete_note(line.selling_mode, line.piece_count);
            line.override_state = OverrideState::Unset;
            return InputDecision::Incomplete;
        }

        if line.selling_mode == SellingMode::Piece {
            let outcome = PriceCalculator::calculate(&PriceInput {
                mode: SellingMode::Piece,
                dims: RawDimensions::from_line(line),
                piece_count: line.piece_count,
                quantity,
                minimum: None,
                tier: None,
                manual_unit_price: None,
                current_rate: line.rate,
            });
            line.amount = outcome.amount;
            line.note = outcome.note;
            return InputDecision::Settled;
        }

        InputDecision::Reprice(quantity)
    }

    /// Manual / Locked：单价冻结，只重算金额
    ///
    /// 金额只取决于 rate×件数，尺寸是否完整不影响
    fn refresh_frozen_amount(line: &mut LineItem) {
        let count = if line.piece_count.is_finite() && line.piece_count > 0.0 {
            line.piece_count
        } else {
            0.0
        };
        line.amount = PriceCalculator::amount_for(line.rate, count);
    }

    /// 清空价格字段（rate/amount/单价/阶梯）并回到 Unset
    pub fn clear_price(line: &mut LineItem) {
        line.rate = 0.0;
        line.amount = 0.0;
        line.unit_price = None;
        line.tier_label = None;
        line.override_state = OverrideState::Unset;
    }

    /// 切换销售方式：清空尺寸与计算字段，回到 Unset
    pub fn on_selling_mode_changed(line: &mut LineItem, mode: SellingMode) {
        line.selling_mode = mode;
        line.reset_measurements();
        let quantity = QuantityResolver::resolve_line(line);
        QuantityResolver::apply_to_line(line, &quantity);
        if !quantity.is_valid {
            line.note = PriceCalculator::incomplete_note(mode, line.piece_count);
        }
    }

    /// 用户直接修改 rate → Manual
    pub fn on_rate_edited(line: &mut LineItem) {
        let quantity = QuantityResolver::resolve_line(line);
        QuantityResolver::apply_to_line(line, &quantity);
        line.override_state = OverrideState::Manual;
        Self::refresh_frozen_amount(line);
        line.note = with_marker(&line.note, "marker.manual");
    }

    pub fn lock(line: &mut LineItem) {
        line.override_state = OverrideState::Locked;
        line.note = with_marker(&line.note, "marker.locked");
    }

    /// 解锁：曾经自动计价过的回到 Auto，否则回到 Unset
    pub fn unlock(line: &mut LineItem) {
        line.override_state = if line.has_computed_price {
            OverrideState::Auto
        } else {
            OverrideState::Unset
        };
        line.note = with_marker(&line.note, "marker.unlocked");
    }

    /// 强制重算前清除接管状态
    pub fn reset_for_force(line: &mut LineItem) {
        line.override_state = OverrideState::Unset;
        line.note = base_note(&line.note).to_string();
    }

    /// 强制重算后按件销售行就地结算完成：Unset → Auto
    pub fn settle_forced_piece(line: &mut LineItem) -> bool {
        if line.selling_mode != SellingMode::Piece
            || line.override_state != OverrideState::Unset
            || !(line.piece_count.is_finite() && line.piece_count > 0.0)
        {
            return false;
        }
        line.override_state = OverrideState::Auto;
        line.note = with_marker(&line.note, "marker.auto");
        true
    }

    /// 写回自动计价结果
    ///
    /// 仅在 Unset/Auto 下调用；无可用价格时保持 Unset
    pub fn apply_price(line: &mut LineItem, outcome: &PriceOutcome) {
        line.rate = outcome.rate;
        line.amount = outcome.amount;
        line.unit_price = outcome.unit_price;
        line.tier_label = outcome.tier_label.clone();
        if outcome.source == PriceSource::Unavailable {
            line.override_state = OverrideState::Unset;
            line.note = outcome.note.clone();
        } else {
            line.override_state = OverrideState::Auto;
            line.has_computed_price = true;
            line.note = with_marker(&outcome.note, "marker.auto");
        }
    }

    /// 查询失败：rate/amount 归零，说明写入错误，状态不变
    pub fn apply_degraded(line: &mut LineItem, note: String) {
        line.rate = 0.0;
        line.amount = 0.0;
        line.unit_price = None;
        line.tier_label = None;
        line.note = note;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i18n::tests::LOCALE_TEST_LOCK;

    fn area_row() -> LineItem {
        LineItem::new(SellingMode::Area)
            .with_item("VINYL")
            .with_area(100.0, 50.0)
            .with_piece_count(2.0)
    }

    fn priced(rate: f64, amount: f64) -> PriceOutcome {
        PriceOutcome {
            rate,
            amount,
            unit_price: Some(10.0),
            tier_label: Some("A".to_string()),
            source: PriceSource::Tier,
            note: "计算过程".to_string(),
        }
    }

    #[test]
    fn test_base_note_strips_markers() {
        assert_eq!(base_note("abc\n🤖 自动计算"), "abc");
        assert_eq!(base_note("abc\n🔒 x\n🖊️ y"), "abc");
        assert_eq!(base_note("🔓 only"), "");
        assert_eq!(base_note("plain"), "plain");
    }

    #[test]
    fn test_unset_area_requests_pricing() {
        let mut row = area_row();
        match OverrideStateMachine::on_input_changed(&mut row) {
            InputDecision::Reprice(q) => assert_eq!(q.total_measure, 1.0),
            other => panic!("unexpected decision {:?}", other),
        }
        assert_eq!(row.unit_measure, 0.5);
        assert_eq!(row.total_measure, 1.0);
    }

    #[test]
    fn test_incomplete_zeroes_price() {
        let mut row = LineItem::new(SellingMode::Area).with_item("VINYL").with_rate(9.0);
        row.width = Some(100.0);
        assert_eq!(
            OverrideStateMachine::on_input_changed(&mut row),
            InputDecision::Incomplete
        );
        assert_eq!(row.rate, 0.0);
        assert_eq!(row.amount, 0.0);
        assert!(!row.note.is_empty());
    }

    #[test]
    fn test_piece_row_settles_locally() {
        let mut row = LineItem::new(SellingMode::Piece).with_rate(4.5).with_piece_count(3.0);
        assert_eq!(
            OverrideStateMachine::on_input_changed(&mut row),
            InputDecision::Settled
        );
        assert_eq!(row.amount, 13.5);
        assert_eq!(row.rate, 4.5);
    }

    #[test]
    fn test_manual_row_keeps_rate_on_dimension_change() {
        let mut row = area_row().with_rate(7.0);
        OverrideStateMachine::on_rate_edited(&mut row);
        assert_eq!(row.override_state, OverrideState::Manual);
        assert_eq!(row.amount, 14.0);

        row.width = Some(200.0);
        row.piece_count = 3.0;
        assert_eq!(
            OverrideStateMachine::on_input_changed(&mut row),
            InputDecision::Settled
        );
        assert_eq!(row.rate, 7.0);
        assert_eq!(row.amount, 21.0);
        assert_eq!(row.unit_measure, 1.0);
        assert_eq!(row.total_measure, 3.0);
    }

    #[test]
    fn test_lock_unlock_cycle() {
        let _guard = LOCALE_TEST_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let mut row = area_row();
        OverrideStateMachine::apply_price(&mut row, &priced(5.0, 10.0));
        assert_eq!(row.override_state, OverrideState::Auto);

        OverrideStateMachine::lock(&mut row);
        assert_eq!(row.override_state, OverrideState::Locked);
        OverrideStateMachine::lock(&mut row);
        assert_eq!(row.note.matches(LOCKED_MARKER).count(), 1);
        assert!(!row.note.contains(AUTO_MARKER));

        row.width = Some(300.0);
        OverrideStateMachine::on_input_changed(&mut row);
        assert_eq!(row.rate, 5.0);

        OverrideStateMachine::unlock(&mut row);
        assert_eq!(row.override_state, OverrideState::Auto);
        assert!(row.note.starts_with("计算过程"));
        assert!(row.note.contains(UNLOCKED_MARKER));
        assert!(!row.note.contains(LOCKED_MARKER));
    }

    #[test]
    fn test_unlock_without_computed_price_goes_unset() {
        let mut row = area_row().with_rate(3.0);
        OverrideStateMachine::lock(&mut row);
        OverrideStateMachine::unlock(&mut row);
        assert_eq!(row.override_state, OverrideState::Unset);
    }

    #[test]
    fn test_unavailable_price_stays_unset() {
        let mut row = area_row();
        let outcome = PriceOutcome {
            rate: 0.0,
            amount: 0.0,
            unit_price: None,
            tier_label: None,
            source: PriceSource::Unavailable,
            note: "none".to_string(),
        };
        OverrideStateMachine::apply_price(&mut row, &outcome);
        assert_eq!(row.override_state, OverrideState::Unset);
        assert!(!row.has_computed_price);
    }

    #[test]
    fn test_selling_mode_change_resets() {
        let mut row = area_row().with_rate(5.0);
        OverrideStateMachine::lock(&mut row);
        OverrideStateMachine::on_selling_mode_changed(&mut row, SellingMode::Length);
        assert_eq!(row.selling_mode, SellingMode::Length);
        assert_eq!(row.override_state, OverrideState::Unset);
        assert_eq!(row.width, None);
        assert_eq!(row.rate, 0.0);
        assert_eq!(row.total_measure, 0.0);
    }

    #[test]
    fn test_locked_amount_survives_cleared_dimension() {
        let mut row = area_row().with_rate(50.0);
        OverrideStateMachine::lock(&mut row);
        OverrideStateMachine::on_input_changed(&mut row);
        assert_eq!(row.amount, 100.0);

        row.height = None;
        assert_eq!(
            OverrideStateMachine::on_input_changed(&mut row),
            InputDecision::Settled
        );
        assert_eq!(row.rate, 50.0);
        assert_eq!(row.amount, 100.0);
        assert_eq!(row.total_measure, 0.0);
        assert_eq!(row.override_state, OverrideState::Locked);
    }

    #[test]
    fn test_manual_amount_survives_cleared_dimension() {
        let mut row = area_row().with_rate(12.5);
        OverrideStateMachine::on_rate_edited(&mut row);
        row.width = None;
        OverrideStateMachine::on_input_changed(&mut row);
        assert_eq!(row.amount, 25.0);

        row.piece_count = 0.0;
        OverrideStateMachine::on_input_changed(&mut row);
        assert_eq!(row.amount, 0.0);
        assert_eq!(row.rate, 12.5);
    }

    #[test]
    fn test_forced_piece_row_becomes_auto() {
        let _guard = LOCALE_TEST_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let mut row = LineItem::new(SellingMode::Piece).with_rate(4.0).with_piece_count(3.0);
        OverrideStateMachine::reset_for_force(&mut row);
        OverrideStateMachine::on_input_changed(&mut row);
        assert!(OverrideStateMachine::settle_forced_piece(&mut row));
        assert_eq!(row.override_state, OverrideState::Auto);
        assert_eq!(row.note.matches(AUTO_MARKER).count(), 1);

        let mut area = area_row();
        assert!(!OverrideStateMachine::settle_forced_piece(&mut area));
    }

    #[test]
    fn test_degraded_keeps_state() {
        let mut row = area_row().with_rate(5.0);
        row.override_state = OverrideState::Auto;
        OverrideStateMachine::apply_degraded(&mut row, "lookup failed".to_string());
        assert_eq!(row.override_state, OverrideState::Auto);
        assert_eq!(row.rate, 0.0);
        assert_eq!(row.note, "lookup failed");
    }
}
