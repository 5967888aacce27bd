// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 临时数据库、标准定价配置、单据构造
// ==========================================

#![allow(dead_code)]

use std::error::Error;
use std::sync::Arc;
use tempfile::NamedTempFile;
use variable_pricing::config::{EngineSettings, PricingConfigStore};
use variable_pricing::domain::{
    CustomerGroupMinimum, DocumentType, ItemPricingConfig, LineItem, PricingTier, RowId,
    SalesDocument, SellingMode, SharedDocument,
};
use variable_pricing::engine::PricingOrchestrator;

pub const AREA_ITEM: &str = "VINYL-MONO";
pub const LENGTH_ITEM: &str = "BANNER-ROLL";
pub const MIXED_ITEM: &str = "SIGN-MIXED";
pub const RETAIL_CUSTOMER: &str = "CUST-RETAIL";
pub const PLAIN_CUSTOMER: &str = "CUST-PLAIN";

/// 创建临时数据库文件
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file
        .path()
        .to_str()
        .ok_or("临时文件路径不是 UTF-8")?
        .to_string();
    Ok((temp_file, db_path))
}

/// 面积物料：A [0,5] 10/m²，B [5,∞) 8/m²
pub fn area_config() -> ItemPricingConfig {
    ItemPricingConfig::new(AREA_ITEM, SellingMode::Area).with_tiers(vec![
        PricingTier::new(0.0, Some(5.0), 10.0, "A"),
        PricingTier::new(5.0, None, 8.0, "B"),
    ])
}

/// 面积物料 + Retail 客户组最低 3 m²
pub fn area_config_with_minimum() -> ItemPricingConfig {
    area_config().with_minimums(vec![CustomerGroupMinimum {
        description: "min 3 m²".to_string(),
        ..CustomerGroupMinimum::new("Retail", 3.0)
    }])
}

/// 两种计量方式各有阶梯：面积 20/m²，长度 6/ml
pub fn mixed_mode_config() -> ItemPricingConfig {
    ItemPricingConfig::new(MIXED_ITEM, SellingMode::Area).with_tiers(vec![
        PricingTier::new(0.0, None, 20.0, "m²").for_mode(SellingMode::Area),
        PricingTier::new(0.0, None, 6.0, "ml").for_mode(SellingMode::Length),
    ])
}

/// 长度物料：无阶梯
pub fn length_config() -> ItemPricingConfig {
    ItemPricingConfig::new(LENGTH_ITEM, SellingMode::Length)
}

pub fn instant_settings() -> EngineSettings {
    EngineSettings::default().with_debounce_ms(0)
}

pub fn orchestrator(store: Arc<dyn PricingConfigStore>) -> PricingOrchestrator {
    PricingOrchestrator::new(store, instant_settings())
}

/// 单行报价单
pub fn single_row_document(customer: Option<&str>, row: LineItem) -> (SharedDocument, RowId) {
    let mut doc = SalesDocument::new(DocumentType::Quotation, "QTN-2026-00001");
    doc.customer_id = customer.map(str::to_string);
    let row_id = doc.add_row(row);
    (doc.into_shared(), row_id)
}

/// 面积行 100×50 cm × 2 件
pub fn area_row() -> LineItem {
    LineItem::new(SellingMode::Area)
        .with_item(AREA_ITEM)
        .with_area(100.0, 50.0)
        .with_piece_count(2.0)
}

pub fn snapshot(doc: &SharedDocument, row_id: RowId) -> LineItem {
    doc.lock()
        .unwrap()
        .row(row_id)
        .cloned()
        .expect("row should exist")
}

pub fn edit_row<F: FnOnce(&mut LineItem)>(doc: &SharedDocument, row_id: RowId, edit: F) {
    let mut d = doc.lock().unwrap();
    edit(d.row_mut(row_id).expect("row should exist"));
}
