// ==========================================
// 可变计量单位定价引擎 - 行价格计算 纯函数库
// ==========================================
// 职责: 生效计量 + 件数 + 单价 → 单件价格(rate)、行金额(amount)、计算说明
// 红线: 所有金额 2 位小数 half-up；说明必须披露完整计算过程
// ==========================================

use crate::domain::types::SellingMode;
use crate::engine::minimum::MinimumOutcome;
use crate::engine::quantity::{QuantityOutcome, RawDimensions};
use crate::engine::rounding::{round_currency, round_half_up};
use crate::engine::tier::TierMatch;
use crate::i18n::{t, t_with_args};
use serde::{Deserialize, Serialize};

/// 价格来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PriceSource {
    /// 阶梯价（含最低计量）
    Tier,
    /// 手工每单位单价兜底（不含最低计量）
    ManualUnitPrice,
    /// 按件销售，沿用已有单价
    PieceRate,
    /// 无任何价格
    Unavailable,
}

// ==========================================
// PriceInput - 价格计算输入
// ==========================================
#[derive(Debug, Clone)]
pub struct PriceInput<'a> {
    pub mode: SellingMode,
    pub dims: RawDimensions,
    pub piece_count: f64,
    pub quantity: QuantityOutcome,
    pub minimum: Option<&'a MinimumOutcome>,
    pub tier: Option<&'a TierMatch>,
    pub manual_unit_price: Option<f64>,
    /// 按件销售时沿用的当前单价
    pub current_rate: f64,
}

impl<'a> PriceInput<'a> {
    /// 生效计量（未应用最低计量时等于合计计量）
    pub fn effective_measure(&self) -> f64 {
        self.minimum
            .map_or(self.quantity.total_measure, |m| m.effective_measure)
    }

    /// 命中规则的每件固定费用，无则为 0
    pub fn fixed_cost(&self) -> f64 {
        self.minimum
            .and_then(|m| m.matched_minimum.as_ref())
            .filter(|mm| mm.has_fixed_cost())
            .map_or(0.0, |mm| mm.fixed_cost)
    }
}

// ==========================================
// PriceOutcome - 价格计算结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceOutcome {
    pub rate: f64,
    pub amount: f64,
    pub unit_price: Option<f64>,
    pub tier_label: Option<String>,
    pub source: PriceSource,
    pub note: String,
}

pub struct PriceCalculator;

impl PriceCalculator {
    /// 计算单件价格与行金额
    ///
    /// # 规则
    /// - Piece: rate 沿用已有值，amount = round(rate × 件数, 2)
    /// - Area/Length + 阶梯价 P: rate = round((生效计量 / 件数) × P + 固定费用, 2)，amount = round(rate × 件数, 2)
    ///   无固定费用时 amount 恒等于 生效计量 × P，最低计量的价格平摊到每件
    ///   固定费用取自命中的客户组规则（无论最低计量是否抬高了计量）
    /// - Area/Length + 无阶梯 + 手工单价 M: rate = round(单件计量 × M, 2)，amount = round(rate × 件数, 2)
    /// - 无任何价格: rate = amount = 0，说明缺失配置
    pub fn calculate(input: &PriceInput<'_>) -> PriceOutcome {
        let piece_count = input.piece_count;

        if input.mode == SellingMode::Piece {
            let rate = round_currency(input.current_rate);
            let amount = round_currency(rate * piece_count);
            return PriceOutcome {
                rate,
                amount,
                unit_price: None,
                tier_label: None,
                source: PriceSource::PieceRate,
                note: Self::piece_note(piece_count, rate, amount),
            };
        }

        if let Some(tier) = input.tier {
            let effective = input.effective_measure();
            let fixed_cost = input.fixed_cost();
            let rate = round_currency(effective / piece_count * tier.unit_price + fixed_cost);
            let amount = round_currency(rate * piece_count);
            let mut lines = Self::measure_lines(input);
            lines.push(Self::minimum_line(input));
            lines.push(t_with_args(
                "note.tier",
                &[
                    ("label", tier.tier_label.as_str()),
                    ("range", tier.tier.range_text().as_str()),
                    ("price", format!("{:.2}", tier.unit_price).as_str()),
                    ("unit", input.mode.unit_symbol()),
                ],
            ));
            if fixed_cost > 0.0 {
                lines.push(t_with_args(
                    "note.fixed_cost",
                    &[("cost", format!("{:.2}", fixed_cost).as_str())],
                ));
            }
            lines.push(Self::rate_line(rate));
            lines.push(Self::amount_line(amount));
            return PriceOutcome {
                rate,
                amount,
                unit_price: Some(tier.unit_price),
                tier_label: Some(tier.tier_label.clone()),
                source: PriceSource::Tier,
                note: lines.join("\n"),
            };
        }

        if let Some(manual) = input.manual_unit_price.filter(|p| p.is_finite() && *p > 0.0) {
            let rate = round_currency(input.quantity.unit_measure * manual);
            let amount = round_currency(rate * piece_count);
            let mut lines = Self::measure_lines(input);
            lines.push(t_with_args(
                "note.manual_unit_price",
                &[
                    ("price", format!("{:.2}", manual).as_str()),
                    ("unit", input.mode.unit_symbol()),
                ],
            ));
            lines.push(Self::rate_line(rate));
            lines.push(Self::amount_line(amount));
            return PriceOutcome {
                rate,
                amount,
                unit_price: Some(manual),
                tier_label: None,
                source: PriceSource::ManualUnitPrice,
                note: lines.join("\n"),
            };
        }

        let mut lines = Self::measure_lines(input);
        lines.push(t("note.no_price"));
        PriceOutcome {
            rate: 0.0,
            amount: 0.0,
            unit_price: None,
            tier_label: None,
            source: PriceSource::Unavailable,
            note: lines.join("\n"),
        }
    }

    /// 单价已确定时（手工/锁定）重算行金额
    pub fn amount_for(rate: f64, piece_count: f64) -> f64 {
        round_currency(rate * piece_count)
    }

    /// 输入不完整时的提示
    pub fn incomplete_note(mode: SellingMode, piece_count: f64) -> String {
        if !piece_count.is_finite() || piece_count <= 0.0 {
            return t("note.invalid_piece_count");
        }
        match mode {
            SellingMode::Area => t("note.missing_area"),
            SellingMode::Length => t("note.missing_length"),
            SellingMode::Piece => t("note.invalid_piece_count"),
        }
    }

    /// 计量摘要（无客户、查询失败时仍展示）
    pub fn quantity_summary(mode: SellingMode, quantity: &QuantityOutcome, piece_count: f64) -> String {
        match mode {
            SellingMode::Piece => t_with_args("note.piece_summary", &[("count", fmt_count(piece_count).as_str())]),
            _ => t_with_args(
                "note.measure_summary",
                &[
                    ("count", fmt_count(piece_count).as_str()),
                    ("total", fmt_total(mode, quantity.total_measure).as_str()),
                    ("unit", mode.unit_symbol()),
                ],
            ),
        }
    }

    fn piece_note(piece_count: f64, rate: f64, amount: f64) -> String {
        t_with_args(
            "note.piece",
            &[
                ("count", fmt_count(piece_count).as_str()),
                ("rate", format!("{:.2}", rate).as_str()),
                ("amount", format!("{:.2}", amount).as_str()),
            ],
        )
    }

    fn measure_lines(input: &PriceInput<'_>) -> Vec<String> {
        let mode = input.mode;
        let dims_line = match mode {
            SellingMode::Area => t_with_args(
                "note.dimensions_area",
                &[
                    ("width", fmt_raw(input.dims.width).as_str()),
                    ("height", fmt_raw(input.dims.height).as_str()),
                ],
            ),
            _ => {
                let mut line = t_with_args("note.dimensions_length", &[("length", fmt_raw(input.dims.length).as_str())]);
                if let Some(mw) = input.dims.material_width.filter(|w| *w > 0.0) {
                    line.push(' ');
                    line.push_str(&t_with_args("note.material_width", &[("width", format!("{}", mw).as_str())]));
                }
                line
            }
        };
        vec![
            dims_line,
            t_with_args(
                "note.unit_measure",
                &[
                    ("value", fmt_unit(mode, input.quantity.unit_measure).as_str()),
                    ("unit", mode.unit_symbol()),
                ],
            ),
            t_with_args(
                "note.total_measure",
                &[
                    ("count", fmt_count(input.piece_count).as_str()),
                    ("value", fmt_total(mode, input.quantity.total_measure).as_str()),
                    ("unit", mode.unit_symbol()),
                ],
            ),
        ]
    }

    fn minimum_line(input: &PriceInput<'_>) -> String {
        let unit = input.mode.unit_symbol();
        match input.minimum {
            Some(m) if m.minimum_applied => {
                let (group, description) = m
                    .matched_minimum
                    .as_ref()
                    .map(|mm| (mm.customer_group.as_str(), mm.description.as_str()))
                    .unwrap_or(("", ""));
                t_with_args(
                    "note.minimum_applied",
                    &[
                        ("value", fmt_total(input.mode, m.effective_measure).as_str()),
                        ("unit", unit),
                        ("group", group),
                        ("description", description),
                    ],
                )
            }
            _ => t("note.minimum_not_applied"),
        }
    }

    fn rate_line(rate: f64) -> String {
        t_with_args("note.rate", &[("rate", format!("{:.2}", rate).as_str())])
    }

    fn amount_line(amount: f64) -> String {
        t_with_args("note.amount", &[("amount", format!("{:.2}", amount).as_str())])
    }
}

fn fmt_raw(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{}", v))
}

fn fmt_count(count: f64) -> String {
    format!("{}", round_half_up(count, 3))
}

fn fmt_unit(mode: SellingMode, value: f64) -> String {
    match mode {
        SellingMode::Area => format!("{:.4}", value),
        _ => format!("{:.2}", value),
    }
}

fn fmt_total(mode: SellingMode, value: f64) -> String {
    match mode {
        SellingMode::Area => format!("{:.3}", value),
        _ => format!("{:.2}", value),
    }
}
