// ==========================================
// 可变计量单位定价引擎 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout，减少并发写入时的偶发 busy 错误
// - 提供定价配置表的幂等建表
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 2;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// foreign_keys 与 busy_timeout 都需要每个连接单独设置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 建表（幂等）
///
/// - pricing_tier.to_quantity 为 NULL 或 0 表示无上限
/// - pricing_tier.selling_mode / customer_group_minimum.selling_mode 为 NULL 表示面积/长度均适用
/// - 旧库（version 1）补齐 pricing_tier.selling_mode 与 customer_group_minimum.fixed_cost
pub fn ensure_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );

        CREATE TABLE IF NOT EXISTS item_pricing (
            item_code TEXT PRIMARY KEY,
            default_selling_mode TEXT NOT NULL DEFAULT 'PIECE'
        );

        CREATE TABLE IF NOT EXISTS pricing_tier (
            tier_id INTEGER PRIMARY KEY AUTOINCREMENT,
            item_code TEXT NOT NULL REFERENCES item_pricing(item_code) ON DELETE CASCADE,
            from_quantity REAL NOT NULL,
            to_quantity REAL,
            unit_price REAL NOT NULL,
            label TEXT NOT NULL DEFAULT '',
            is_default INTEGER NOT NULL DEFAULT 0,
            selling_mode TEXT,
            sort_order INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS customer_group_minimum (
            minimum_id INTEGER PRIMARY KEY AUTOINCREMENT,
            item_code TEXT NOT NULL REFERENCES item_pricing(item_code) ON DELETE CASCADE,
            customer_group TEXT NOT NULL,
            selling_mode TEXT,
            minimum_quantity REAL NOT NULL,
            enabled INTEGER NOT NULL DEFAULT 1,
            description TEXT NOT NULL DEFAULT '',
            fixed_cost REAL NOT NULL DEFAULT 0,
            sort_order INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS customer (
            customer_id TEXT PRIMARY KEY,
            customer_group TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_pricing_tier_item ON pricing_tier(item_code);
        CREATE INDEX IF NOT EXISTS idx_group_minimum_item ON customer_group_minimum(item_code);
        "#,
    )?;

    add_column_if_missing(conn, "pricing_tier", "selling_mode", "TEXT")?;
    add_column_if_missing(conn, "customer_group_minimum", "fixed_cost", "REAL NOT NULL DEFAULT 0")?;

    let version = read_schema_version(conn)?;
    if version.map_or(true, |v| v < CURRENT_SCHEMA_VERSION) {
        if let Some(from) = version {
            tracing::info!(from, to = CURRENT_SCHEMA_VERSION, "定价配置库已升级");
        }
        conn.execute(
            "INSERT INTO schema_version (version) VALUES (?1)",
            [CURRENT_SCHEMA_VERSION],
        )?;
    }
    Ok(())
}

fn add_column_if_missing(conn: &Connection, table: &str, column: &str, decl: &str) -> rusqlite::Result<()> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
    let exists = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<rusqlite::Result<Vec<_>>>()?
        .iter()
        .any(|name| name == column);
    if !exists {
        conn.execute_batch(&format!("ALTER TABLE {} ADD COLUMN {} {};", table, column, decl))?;
    }
    Ok(())
}

/// 读取 schema_version（若表不存在或为空则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_schema_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), None);

        ensure_schema(&conn).unwrap();
        ensure_schema(&conn).unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), Some(CURRENT_SCHEMA_VERSION));

        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn test_version_one_database_gains_new_columns() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE schema_version (version INTEGER NOT NULL, applied_at TEXT NOT NULL DEFAULT (datetime('now')));
            INSERT INTO schema_version (version) VALUES (1);
            CREATE TABLE item_pricing (item_code TEXT PRIMARY KEY, default_selling_mode TEXT NOT NULL DEFAULT 'PIECE');
            CREATE TABLE pricing_tier (
                tier_id INTEGER PRIMARY KEY AUTOINCREMENT, item_code TEXT NOT NULL,
                from_quantity REAL NOT NULL, to_quantity REAL, unit_price REAL NOT NULL,
                label TEXT NOT NULL DEFAULT '', is_default INTEGER NOT NULL DEFAULT 0,
                sort_order INTEGER NOT NULL DEFAULT 0
            );
            CREATE TABLE customer_group_minimum (
                minimum_id INTEGER PRIMARY KEY AUTOINCREMENT, item_code TEXT NOT NULL,
                customer_group TEXT NOT NULL, selling_mode TEXT, minimum_quantity REAL NOT NULL,
                enabled INTEGER NOT NULL DEFAULT 1, description TEXT NOT NULL DEFAULT '',
                sort_order INTEGER NOT NULL DEFAULT 0
            );
            INSERT INTO customer_group_minimum (item_code, customer_group, minimum_quantity) VALUES ('X', 'Retail', 3);
            "#,
        )
        .unwrap();

        ensure_schema(&conn).unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), Some(CURRENT_SCHEMA_VERSION));
        let fixed: f64 = conn
            .query_row("SELECT fixed_cost FROM customer_group_minimum", [], |r| r.get(0))
            .unwrap();
        assert_eq!(fixed, 0.0);
        conn.execute("UPDATE pricing_tier SET selling_mode = 'AREA'", []).unwrap();
    }
}
