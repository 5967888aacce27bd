// ==========================================
// 可变计量单位定价引擎 - 定价配置仓储 (SQLite)
// ==========================================
// 职责: 管理 item_pricing / pricing_tier / customer_group_minimum / customer 表
//       并作为 PricingConfigStore 的 SQLite 实现
// 说明: pricing_tier.to_quantity 为 NULL 或 0 时视为无上限
// ==========================================

use crate::config::config_store::{LookupError, PricingConfigStore};
use crate::db::{ensure_schema, open_sqlite_connection};
use crate::domain::pricing::{CustomerGroupMinimum, ItemPricingConfig, PricingTier};
use crate::domain::types::SellingMode;
use crate::engine::validation::validate_item_config;
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

pub struct SqlitePricingConfigStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqlitePricingConfigStore {
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Self::from_connection(Arc::new(Mutex::new(conn)))
    }

    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        let repo = Self { conn };
        {
            let conn = repo.get_conn()?;
            crate::db::configure_sqlite_connection(&conn)?;
            ensure_schema(&conn)?;
        }
        Ok(repo)
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 写入
    // ==========================================

    /// 保存物料定价配置（阶梯与最低计量整体替换）
    pub fn save_item_config(&self, config: &ItemPricingConfig) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        tx.execute(
            "INSERT INTO item_pricing (item_code, default_selling_mode) VALUES (?1, ?2)
             ON CONFLICT(item_code) DO UPDATE SET default_selling_mode = ?2",
            params![config.item_code, config.default_selling_mode.to_string()],
        )?;
        tx.execute(
            "DELETE FROM pricing_tier WHERE item_code = ?1",
            params![config.item_code],
        )?;
        tx.execute(
            "DELETE FROM customer_group_minimum WHERE item_code = ?1",
            params![config.item_code],
        )?;

        for (idx, tier) in config.tiers.iter().enumerate() {
            tx.execute(
                "INSERT INTO pricing_tier
                   (item_code, from_quantity, to_quantity, unit_price, label, is_default, selling_mode, sort_order)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    config.item_code,
                    tier.from_quantity,
                    tier.to_quantity,
                    tier.unit_price,
                    tier.label,
                    tier.is_default,
                    tier.selling_mode.map(|m| m.to_string()),
                    idx as i64
                ],
            )?;
        }

        for (idx, minimum) in config.minimums.iter().enumerate() {
            tx.execute(
                "INSERT INTO customer_group_minimum
                   (item_code, customer_group, selling_mode, minimum_quantity, enabled, description, fixed_cost, sort_order)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    config.item_code,
                    minimum.customer_group,
                    minimum.selling_mode.map(|m| m.to_string()),
                    minimum.minimum_quantity,
                    minimum.enabled,
                    minimum.description,
                    minimum.fixed_cost,
                    idx as i64
                ],
            )?;
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        for issue in validate_item_config(config) {
            tracing::warn!("定价配置存在可疑项: {}", issue);
        }
        Ok(())
    }

    /// 保存客户及其客户组
    pub fn save_customer(&self, customer_id: &str, customer_group: Option<&str>) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO customer (customer_id, customer_group) VALUES (?1, ?2)
             ON CONFLICT(customer_id) DO UPDATE SET customer_group = ?2",
            params![customer_id, customer_group],
        )?;
        Ok(())
    }

    // ==========================================
    // 读取
    // ==========================================

    pub fn find_item_config(&self, item_code: &str) -> RepositoryResult<Option<ItemPricingConfig>> {
        let conn = self.get_conn()?;

        let mode_raw: Option<String> = conn
            .query_row(
                "SELECT default_selling_mode FROM item_pricing WHERE item_code = ?1",
                params![item_code],
                |row| row.get(0),
            )
            .optional()?;
        let Some(mode_raw) = mode_raw else {
            return Ok(None);
        };
        let default_selling_mode = parse_mode("default_selling_mode", &mode_raw)?;

        let mut stmt = conn.prepare(
            "SELECT from_quantity, to_quantity, unit_price, label, is_default, selling_mode
             FROM pricing_tier WHERE item_code = ?1
             ORDER BY sort_order, tier_id",
        )?;
        let raw_tiers = stmt
            .query_map(params![item_code], |row| {
                let to_quantity: Option<f64> = row.get(1)?;
                let tier = PricingTier {
                    from_quantity: row.get(0)?,
                    to_quantity: to_quantity.filter(|to| *to != 0.0),
                    unit_price: row.get(2)?,
                    label: row.get(3)?,
                    is_default: row.get(4)?,
                    selling_mode: None,
                };
                Ok((tier, row.get::<_, Option<String>>(5)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut tiers = Vec::with_capacity(raw_tiers.len());
        for (mut tier, mode) in raw_tiers {
            tier.selling_mode = parse_optional_mode(mode)?;
            tiers.push(tier);
        }

        let mut stmt = conn.prepare(
            "SELECT customer_group, selling_mode, minimum_quantity, enabled, description, fixed_cost
             FROM customer_group_minimum WHERE item_code = ?1
             ORDER BY sort_order, minimum_id",
        )?;
        let raw_minimums = stmt
            .query_map(params![item_code], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, f64>(2)?,
                    row.get::<_, bool>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, f64>(5)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut minimums = Vec::with_capacity(raw_minimums.len());
        for (customer_group, mode, minimum_quantity, enabled, description, fixed_cost) in raw_minimums {
            minimums.push(CustomerGroupMinimum {
                customer_group,
                minimum_quantity,
                enabled,
                description,
                selling_mode: parse_optional_mode(mode)?,
                fixed_cost,
            });
        }

        Ok(Some(ItemPricingConfig {
            item_code: item_code.to_string(),
            default_selling_mode,
            tiers,
            minimums,
        }))
    }

    /// 查询客户组；客户不存在返回 NotFound
    pub fn find_customer_group(&self, customer_id: &str) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;
        let group: Option<Option<String>> = conn
            .query_row(
                "SELECT customer_group FROM customer WHERE customer_id = ?1",
                params![customer_id],
                |row| row.get(0),
            )
            .optional()?;
        match group {
            Some(g) => Ok(g.filter(|s| !s.trim().is_empty())),
            None => Err(RepositoryError::NotFound {
                entity: "customer".to_string(),
                id: customer_id.to_string(),
            }),
        }
    }
}

fn parse_mode(field: &str, raw: &str) -> RepositoryResult<SellingMode> {
    SellingMode::from_str(raw).ok_or_else(|| RepositoryError::FieldValueError {
        field: field.to_string(),
        message: format!("无法识别的销售方式: {}", raw),
    })
}

fn parse_optional_mode(raw: Option<String>) -> RepositoryResult<Option<SellingMode>> {
    match raw.filter(|r| !r.trim().is_empty()) {
        Some(raw) => Ok(Some(parse_mode("selling_mode", &raw)?)),
        None => Ok(None),
    }
}

// ==========================================
// PricingConfigStore 实现
// ==========================================
#[async_trait]
impl PricingConfigStore for SqlitePricingConfigStore {
    async fn get_item_pricing_config(&self, item_code: &str) -> Result<ItemPricingConfig, LookupError> {
        match self.find_item_config(item_code)? {
            Some(config) => Ok(config),
            None => Err(LookupError::ItemNotFound(item_code.to_string())),
        }
    }

    async fn get_customer_group(&self, customer_id: &str) -> Result<Option<String>, LookupError> {
        Ok(self.find_customer_group(customer_id)?)
    }
}
