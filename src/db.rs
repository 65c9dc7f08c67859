// ==========================================
// 多节点补货计划系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout，减少并发写入时的偶发 busy 错误
// - 提供建表脚本（输入快照表 + 结果表 + config_kv）
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::path::PathBuf;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 数据库路径环境变量
pub const DB_PATH_ENV: &str = "REPLENISHMENT_PLANNER_DB_PATH";

/// 获取默认数据库路径
///
/// # 规则
/// - 环境变量 REPLENISHMENT_PLANNER_DB_PATH 非空时优先
/// - 否则使用用户数据目录下的 replenishment-planner/replenishment_planner.db
/// - 无法获取数据目录时回退到当前目录
pub fn get_default_db_path() -> String {
    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./replenishment_planner.db");
    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("replenishment-planner");
        // 目录创建失败时沿用当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("replenishment_planner.db");
        }
    }
    path.to_string_lossy().to_string()
}

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
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
/// # 表
/// - 输入: stock_snapshot / consumption_rate / node_policy / item_packaging /
///   pair_rotation / item_master / factory_stock / factory_week / pending_delivery
/// - 结果: plan_run / forecast_row / order_row
/// - 配置: config_kv
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    let version = read_schema_version(conn)?;
    if version.is_none() {
        conn.execute(
            "INSERT INTO schema_version (version) VALUES (?1)",
            [CURRENT_SCHEMA_VERSION],
        )?;
    }
    Ok(())
}

/// 读取 schema_version（若表不存在则返回 None）
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

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS config_kv (
    scope_id TEXT NOT NULL,
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    PRIMARY KEY (scope_id, key)
);

-- ===== 输入快照 =====
CREATE TABLE IF NOT EXISTS stock_snapshot (
    scope_id TEXT NOT NULL,
    node TEXT NOT NULL,
    item TEXT NOT NULL,
    on_hand REAL NOT NULL,
    snapshot_date TEXT
);

CREATE TABLE IF NOT EXISTS consumption_rate (
    scope_id TEXT NOT NULL,
    node TEXT NOT NULL,
    item TEXT NOT NULL,
    daily_rate REAL NOT NULL,
    PRIMARY KEY (scope_id, node, item)
);

CREATE TABLE IF NOT EXISTS node_policy (
    node TEXT PRIMARY KEY,
    target_days INTEGER NOT NULL,
    safety_days INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS item_packaging (
    item TEXT PRIMARY KEY,
    case_size REAL,
    pallet_size REAL
);

CREATE TABLE IF NOT EXISTS pair_rotation (
    node TEXT NOT NULL,
    item TEXT NOT NULL,
    days_per_pallet REAL NOT NULL,
    PRIMARY KEY (node, item)
);

CREATE TABLE IF NOT EXISTS item_master (
    item TEXT PRIMARY KEY,
    min_batch REAL,
    unit_price REAL,
    work_center TEXT
);

CREATE TABLE IF NOT EXISTS factory_stock (
    item TEXT PRIMARY KEY,
    quantity REAL NOT NULL
);

CREATE TABLE IF NOT EXISTS factory_week (
    week_monday TEXT NOT NULL,
    week_type TEXT NOT NULL,
    PRIMARY KEY (week_monday, week_type)
);

CREATE TABLE IF NOT EXISTS pending_delivery (
    scope_id TEXT NOT NULL,
    node TEXT NOT NULL,
    item TEXT NOT NULL,
    arrival_date TEXT NOT NULL,
    quantity REAL NOT NULL
);

-- ===== 计划结果 =====
CREATE TABLE IF NOT EXISTS plan_run (
    run_id TEXT PRIMARY KEY,
    scope_id TEXT NOT NULL,
    outcome TEXT NOT NULL,
    iterations INTEGER NOT NULL,
    order_count INTEGER NOT NULL,
    warning TEXT,
    config_snapshot_json TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS forecast_row (
    run_id TEXT NOT NULL REFERENCES plan_run(run_id) ON DELETE CASCADE,
    scope_id TEXT NOT NULL,
    node TEXT NOT NULL,
    item TEXT NOT NULL,
    forecast_date TEXT NOT NULL,
    visible_stock REAL NOT NULL,
    deficit REAL NOT NULL,
    is_stockout INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS order_row (
    run_id TEXT NOT NULL REFERENCES plan_run(run_id) ON DELETE CASCADE,
    scope_id TEXT NOT NULL,
    node TEXT NOT NULL,
    item TEXT NOT NULL,
    load_date TEXT NOT NULL,
    delivery_date TEXT NOT NULL,
    quantity REAL NOT NULL,
    stockout_date TEXT NOT NULL,
    annotations TEXT NOT NULL,
    iso_year INTEGER NOT NULL,
    iso_week INTEGER NOT NULL,
    iso_week_label TEXT NOT NULL,
    baseline_rate REAL,
    adjusted_rate REAL,
    order_value REAL,
    days_of_stock_on_arrival REAL
);

CREATE INDEX IF NOT EXISTS idx_forecast_row_scope ON forecast_row(scope_id);
CREATE INDEX IF NOT EXISTS idx_order_row_scope ON order_row(scope_id);
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), Some(CURRENT_SCHEMA_VERSION));

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_default_db_path_is_sqlite_file() {
        let path = get_default_db_path();
        assert!(!path.is_empty());
        if std::env::var(DB_PATH_ENV).is_err() {
            assert!(path.ends_with(".db"));
        }
    }

    #[test]
    fn test_schema_version_absent_before_init() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), None);
    }
}
