// ==========================================
// 可变计量单位定价引擎 - 单据行领域模型
// ==========================================
// 单据行是 LineItem 状态的唯一所有者
// 引擎只持有按行的瞬时簿记（在途令牌、防抖代次），不持有跨行状态
// ==========================================

use crate::domain::types::{DocumentType, OverrideState, SellingMode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

// ==========================================
// RowId - 行标识
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RowId(pub Uuid);

impl RowId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RowId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ==========================================
// LineItem - 单据行
// ==========================================
// 原始输入: width/height/length/material_width（厘米）、piece_count、manual_unit_price、rate
// 计算输出: unit_measure/total_measure/unit_price/rate/amount/note
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub row_id: RowId,
    pub item_code: Option<String>,
    pub selling_mode: SellingMode,

    // ===== 原始尺寸（厘米）=====
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub length: Option<f64>,
    pub material_width: Option<f64>, // 仅用于展示，不参与公式
    pub piece_count: f64,

    /// 手工录入的每 m²/ml 单价（无阶梯时的兜底）
    pub manual_unit_price: Option<f64>,

    // ===== 计算字段 =====
    pub unit_measure: f64,
    pub total_measure: f64,
    pub unit_price: Option<f64>,
    pub tier_label: Option<String>,
    pub rate: f64,
    pub amount: f64,
    pub override_state: OverrideState,
    pub note: String,

    /// 引擎是否曾成功写入过自动计算结果（解锁时决定回到 Unset 还是 Auto）
    pub has_computed_price: bool,
}

impl LineItem {
    pub fn new(selling_mode: SellingMode) -> Self {
        Self {
            row_id: RowId::new(),
            item_code: None,
            selling_mode,
            width: None,
            height: None,
            length: None,
            material_width: None,
            piece_count: 1.0,
            manual_unit_price: None,
            unit_measure: 0.0,
            total_measure: 0.0,
            unit_price: None,
            tier_label: None,
            rate: 0.0,
            amount: 0.0,
            override_state: OverrideState::Unset,
            note: String::new(),
            has_computed_price: false,
        }
    }

    pub fn with_item(mut self, item_code: &str) -> Self {
        self.item_code = Some(item_code.to_string());
        self
    }

    pub fn with_area(mut self, width_cm: f64, height_cm: f64) -> Self {
        self.width = Some(width_cm);
        self.height = Some(height_cm);
        self
    }

    pub fn with_length(mut self, length_cm: f64) -> Self {
        self.length = Some(length_cm);
        self
    }

    pub fn with_material_width(mut self, material_width_cm: f64) -> Self {
        self.material_width = Some(material_width_cm);
        self
    }

    pub fn with_piece_count(mut self, piece_count: f64) -> Self {
        self.piece_count = piece_count;
        self
    }

    pub fn with_manual_unit_price(mut self, price: f64) -> Self {
        self.manual_unit_price = Some(price);
        self
    }

    pub fn with_rate(mut self, rate: f64) -> Self {
        self.rate = rate;
        self
    }

    /// 是否录入过任何原始尺寸
    pub fn has_raw_dimensions(&self) -> bool {
        [self.width, self.height, self.length, self.material_width]
            .iter()
            .any(|v| v.map_or(false, |x| x != 0.0))
    }

    /// 清空尺寸、计算字段、单价、金额与说明（切换销售方式时使用）
    pub fn reset_measurements(&mut self) {
        self.width = None;
        self.height = None;
        self.length = None;
        self.material_width = None;
        self.manual_unit_price = None;
        self.unit_measure = 0.0;
        self.total_measure = 0.0;
        self.unit_price = None;
        self.tier_label = None;
        self.rate = 0.0;
        self.amount = 0.0;
        self.note.clear();
        self.has_computed_price = false;
        self.override_state = OverrideState::Unset;
    }
}

// ==========================================
// SalesDocument - 销售单据
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalesDocument {
    pub doc_type: DocumentType,
    pub name: String,
    pub customer_id: Option<String>,
    pub rows: Vec<LineItem>,
}

impl SalesDocument {
    pub fn new(doc_type: DocumentType, name: &str) -> Self {
        Self {
            doc_type,
            name: name.to_string(),
            customer_id: None,
            rows: Vec::new(),
        }
    }

    pub fn with_customer(mut self, customer_id: &str) -> Self {
        self.customer_id = Some(customer_id.to_string());
        self
    }

    /// 追加一行，返回其标识
    pub fn add_row(&mut self, row: LineItem) -> RowId {
        let id = row.row_id;
        self.rows.push(row);
        id
    }

    /// 删除一行（行状态随之销毁）
    pub fn remove_row(&mut self, row_id: RowId) -> Option<LineItem> {
        let idx = self.rows.iter().position(|r| r.row_id == row_id)?;
        Some(self.rows.remove(idx))
    }

    pub fn row(&self, row_id: RowId) -> Option<&LineItem> {
        self.rows.iter().find(|r| r.row_id == row_id)
    }

    pub fn row_mut(&mut self, row_id: RowId) -> Option<&mut LineItem> {
        self.rows.iter_mut().find(|r| r.row_id == row_id)
    }

    pub fn row_ids(&self) -> Vec<RowId> {
        self.rows.iter().map(|r| r.row_id).collect()
    }

    pub fn into_shared(self) -> SharedDocument {
        Arc::new(Mutex::new(self))
    }
}

/// 宿主与引擎共享的单据句柄
///
/// 锁只在同步读写字段时短暂持有，绝不跨越 await
pub type SharedDocument = Arc<Mutex<SalesDocument>>;
