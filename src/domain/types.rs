// ==========================================
// 可变计量单位定价引擎 - 领域类型定义
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 销售方式 (Selling Mode)
// ==========================================
// 决定哪些原始尺寸字段有效、采用哪条数量公式
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SellingMode {
    Piece,  // 按件
    Area,   // 按平方米
    Length, // 按延米
}

impl SellingMode {
    /// 计量单位符号（用于计算说明）
    pub fn unit_symbol(&self) -> &'static str {
        match self {
            SellingMode::Piece => "pz",
            SellingMode::Area => "m²",
            SellingMode::Length => "ml",
        }
    }

    /// 是否参与客户组最低计量与价格阶梯
    pub fn is_measured(&self) -> bool {
        !matches!(self, SellingMode::Piece)
    }

    /// 从字符串解析（未知值返回 None）
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "PIECE" => Some(SellingMode::Piece),
            "AREA" => Some(SellingMode::Area),
            "LENGTH" => Some(SellingMode::Length),
            _ => None,
        }
    }
}

impl Default for SellingMode {
    fn default() -> Self {
        SellingMode::Piece
    }
}

impl fmt::Display for SellingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SellingMode::Piece => write!(f, "PIECE"),
            SellingMode::Area => write!(f, "AREA"),
            SellingMode::Length => write!(f, "LENGTH"),
        }
    }
}

// ==========================================
// 价格覆写状态 (Override State)
// ==========================================
// Unset: 新建行/切换销售方式后，尚未计算
// Auto: 引擎计算
// Manual: 用户直接修改单价
// Locked: 用户显式锁定价格
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OverrideState {
    Unset,
    Auto,
    Manual,
    Locked,
}

impl OverrideState {
    /// 引擎是否可以覆盖单价
    pub fn allows_repricing(&self) -> bool {
        matches!(self, OverrideState::Unset | OverrideState::Auto)
    }

    /// 工具栏状态指示文本（本地化）
    pub fn indicator(&self) -> String {
        let key = match self {
            OverrideState::Unset => "state.unset",
            OverrideState::Auto => "state.auto",
            OverrideState::Manual => "state.manual",
            OverrideState::Locked => "state.locked",
        };
        crate::i18n::t(key)
    }

    pub fn from_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "AUTO" => OverrideState::Auto,
            "MANUAL" => OverrideState::Manual,
            "LOCKED" => OverrideState::Locked,
            _ => OverrideState::Unset,
        }
    }
}

impl Default for OverrideState {
    fn default() -> Self {
        OverrideState::Unset
    }
}

impl fmt::Display for OverrideState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverrideState::Unset => write!(f, "UNSET"),
            OverrideState::Auto => write!(f, "AUTO"),
            OverrideState::Manual => write!(f, "MANUAL"),
            OverrideState::Locked => write!(f, "LOCKED"),
        }
    }
}

// ==========================================
// 行字段 (Line Field)
// ==========================================
// 宿主表单字段变更事件统一映射到此枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LineField {
    Width,
    Height,
    Length,
    MaterialWidth,
    PieceCount,
    Item,
    ManualUnitPrice,
    Rate,
    SellingMode,
}

impl LineField {
    /// 是否为触发重算的输入字段
    pub fn is_pricing_input(&self) -> bool {
        matches!(
            self,
            LineField::Width
                | LineField::Height
                | LineField::Length
                | LineField::MaterialWidth
                | LineField::PieceCount
                | LineField::Item
                | LineField::ManualUnitPrice
        )
    }
}

impl fmt::Display for LineField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LineField::Width => "width",
            LineField::Height => "height",
            LineField::Length => "length",
            LineField::MaterialWidth => "material_width",
            LineField::PieceCount => "piece_count",
            LineField::Item => "item",
            LineField::ManualUnitPrice => "manual_unit_price",
            LineField::Rate => "rate",
            LineField::SellingMode => "selling_mode",
        };
        write!(f, "{}", name)
    }
}

// ==========================================
// 单据类型 (Document Type)
// ==========================================
// 同一套事件处理适用于所有销售单据
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentType {
    Quotation,
    SalesOrder,
    SalesInvoice,
    DeliveryNote,
}

impl DocumentType {
    /// 启用可变计量定价的全部单据类型
    pub const ALL: [DocumentType; 4] = [
        DocumentType::Quotation,
        DocumentType::SalesOrder,
        DocumentType::SalesInvoice,
        DocumentType::DeliveryNote,
    ];
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentType::Quotation => write!(f, "QUOTATION"),
            DocumentType::SalesOrder => write!(f, "SALES_ORDER"),
            DocumentType::SalesInvoice => write!(f, "SALES_INVOICE"),
            DocumentType::DeliveryNote => write!(f, "DELIVERY_NOTE"),
        }
    }
}

// ==========================================
// 定价执行位置 (Pricing Mode)
// ==========================================
// Local: 本地纯函数流水线
// Remote: 交由配置源的 compute_price 端点计算
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PricingMode {
    Local,
    Remote,
}

impl PricingMode {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "LOCAL" => Some(PricingMode::Local),
            "REMOTE" => Some(PricingMode::Remote),
            _ => None,
        }
    }
}

impl Default for PricingMode {
    fn default() -> Self {
        PricingMode::Local
    }
}

impl fmt::Display for PricingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PricingMode::Local => write!(f, "LOCAL"),
            PricingMode::Remote => write!(f, "REMOTE"),
        }
    }
}
