// ==========================================
// 可变计量单位定价引擎 - 引擎参数管理器
// ==========================================
// 职责: 从 config_kv 表加载引擎运行参数（防抖、计价模式、全量重算范围）
// 存储: config_kv 表 (scope_id='global')
// 规则: 缺失或格式错误的值回退默认值并告警，不阻断启动
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::types::PricingMode;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ==========================================
// EngineSettings - 引擎运行参数
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSettings {
    /// 输入变更防抖窗口（毫秒），0 表示不防抖
    pub debounce_ms: u64,
    /// 本地计价 / 服务端计价
    pub pricing_mode: PricingMode,
    /// 全量重算是否把 Manual 行一并改回自动计价（Locked 行始终跳过）
    pub recalc_all_includes_manual: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            debounce_ms: 300,
            pricing_mode: PricingMode::Local,
            recalc_all_includes_manual: true,
        }
    }
}

impl EngineSettings {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn with_debounce_ms(mut self, debounce_ms: u64) -> Self {
        self.debounce_ms = debounce_ms;
        self
    }

    pub fn with_pricing_mode(mut self, pricing_mode: PricingMode) -> Self {
        self.pricing_mode = pricing_mode;
        self
    }
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;
        crate::db::ensure_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 会对传入连接再次应用统一 PRAGMA 并补建表（均幂等）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
            crate::db::ensure_schema(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 读取 global scope 的配置值
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        self.get_config_value(key)
    }

    /// 写入 global scope 的配置值（UPSERT）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    /// 加载引擎运行参数
    pub fn load_engine_settings(&self) -> Result<EngineSettings, Box<dyn Error>> {
        let defaults = EngineSettings::default();

        let debounce_ms = match self.get_config_value(config_keys::DEBOUNCE_MS)? {
            Some(raw) => raw.trim().parse::<u64>().unwrap_or_else(|_| {
                tracing::warn!(
                    config_key = config_keys::DEBOUNCE_MS,
                    raw_value = %raw,
                    "防抖窗口配置格式错误，使用默认值"
                );
                defaults.debounce_ms
            }),
            None => defaults.debounce_ms,
        };

        let pricing_mode = match self.get_config_value(config_keys::PRICING_MODE)? {
            Some(raw) => PricingMode::from_str(&raw).unwrap_or_else(|| {
                tracing::warn!(
                    config_key = config_keys::PRICING_MODE,
                    raw_value = %raw,
                    "计价模式配置无法识别，使用本地计价"
                );
                defaults.pricing_mode
            }),
            None => defaults.pricing_mode,
        };

        let recalc_all_includes_manual =
            match self.get_config_value(config_keys::RECALC_ALL_INCLUDES_MANUAL)? {
                Some(raw) => parse_flag(&raw).unwrap_or_else(|| {
                    tracing::warn!(
                        config_key = config_keys::RECALC_ALL_INCLUDES_MANUAL,
                        raw_value = %raw,
                        "全量重算范围配置格式错误，使用默认值"
                    );
                    defaults.recalc_all_includes_manual
                }),
                None => defaults.recalc_all_includes_manual,
            };

        let settings = EngineSettings {
            debounce_ms,
            pricing_mode,
            recalc_all_includes_manual,
        };
        tracing::info!(?settings, "引擎参数已加载");
        Ok(settings)
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    pub const DEBOUNCE_MS: &str = "pricing/debounce_ms";
    pub const PRICING_MODE: &str = "pricing/mode";
    pub const RECALC_ALL_INCLUDES_MANUAL: &str = "pricing/recalc_all_includes_manual";
}
