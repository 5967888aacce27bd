// ==========================================
// 可变计量单位定价引擎 - 数量解析 纯函数库
// ==========================================
// 职责: 原始尺寸 + 销售方式 + 件数 → 单件计量与合计计量
// 红线: 无状态、无副作用、无 I/O；不依赖客户或定价配置
// ==========================================

use crate::domain::line_item::LineItem;
use crate::domain::types::SellingMode;
use crate::engine::rounding::{
    round_half_up, AREA_TOTAL_DECIMALS, AREA_UNIT_DECIMALS, LENGTH_DECIMALS,
};
use serde::{Deserialize, Serialize};

// ==========================================
// QuantityOutcome - 数量解析结果
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuantityOutcome {
    pub unit_measure: f64,
    pub total_measure: f64,
    pub is_valid: bool,
}

impl QuantityOutcome {
    fn invalid() -> Self {
        Self {
            unit_measure: 0.0,
            total_measure: 0.0,
            is_valid: false,
        }
    }
}

/// 原始尺寸输入（厘米）
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RawDimensions {
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub length: Option<f64>,
    pub material_width: Option<f64>,
}

impl RawDimensions {
    pub fn from_line(line: &LineItem) -> Self {
        Self {
            width: line.width,
            height: line.height,
            length: line.length,
            material_width: line.material_width,
        }
    }
}

fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v > 0.0)
}

// ==========================================
// QuantityResolver - 纯函数工具类
// ==========================================
pub struct QuantityResolver;

impl QuantityResolver {
    /// 计算单件计量与合计计量
    ///
    /// # 规则
    /// - Piece: unit=1, total=件数
    /// - Area: unit = round(宽×高/10000, 4) m²，total = round(unit×件数, 3)
    /// - Length: unit = round(长/100, 2) ml，total = round(unit×件数, 2)
    /// - 尺寸缺失或 ≤0、件数 ≤0 → is_valid=false，计量均为 0
    pub fn resolve(mode: SellingMode, dims: &RawDimensions, piece_count: f64) -> QuantityOutcome {
        if !piece_count.is_finite() || piece_count <= 0.0 {
            return QuantityOutcome::invalid();
        }

        match mode {
            SellingMode::Piece => QuantityOutcome {
                unit_measure: 1.0,
                total_measure: piece_count,
                is_valid: true,
            },
            SellingMode::Area => match (positive(dims.width), positive(dims.height)) {
                (Some(width), Some(height)) => {
                    let unit = round_half_up(width * height / 10_000.0, AREA_UNIT_DECIMALS);
                    QuantityOutcome {
                        unit_measure: unit,
                        total_measure: round_half_up(unit * piece_count, AREA_TOTAL_DECIMALS),
                        is_valid: true,
                    }
                }
                _ => QuantityOutcome::invalid(),
            },
            SellingMode::Length => match positive(dims.length) {
                Some(length) => {
                    let unit = round_half_up(length / 100.0, LENGTH_DECIMALS);
                    QuantityOutcome {
                        unit_measure: unit,
                        total_measure: round_half_up(unit * piece_count, LENGTH_DECIMALS),
                        is_valid: true,
                    }
                }
                None => QuantityOutcome::invalid(),
            },
        }
    }

    /// 针对单据行解析
    pub fn resolve_line(line: &LineItem) -> QuantityOutcome {
        Self::resolve(
            line.selling_mode,
            &RawDimensions::from_line(line),
            line.piece_count,
        )
    }

    /// 将解析结果写回行的展示字段
    pub fn apply_to_line(line: &mut LineItem, outcome: &QuantityOutcome) {
        line.unit_measure = outcome.unit_measure;
        line.total_measure = outcome.total_measure;
    }
}
