// ==========================================
// 多节点补货计划系统 - 配置管理器
// ==========================================
// 职责: 从 config_kv 表加载计划参数覆写,生成配置快照
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::planning_config::PlanningConfig;
use crate::db::open_sqlite_connection;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use tracing::warn;

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
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_config_value(&self, key: &str) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;

        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;

        Ok(value)
    }

    /// 写入配置值（UPSERT）
    pub fn set_config_value(&self, key: &str, value: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2",
            params![key, value],
        )?;
        Ok(())
    }

    /// 读取并解析配置值,缺失或格式错误时保留默认值
    fn read_parsed<T: FromStr>(&self, key: &str, target: &mut T) -> RepositoryResult<()> {
        if let Some(raw) = self.get_config_value(key)? {
            match raw.trim().parse::<T>() {
                Ok(v) => *target = v,
                Err(_) => warn!(config_key = key, raw_value = %raw, "配置值格式错误，使用默认值"),
            }
        }
        Ok(())
    }

    /// 加载计划参数（默认值 + config_kv 覆写）
    pub fn load_planning_config(&self) -> RepositoryResult<PlanningConfig> {
        let mut config = PlanningConfig::default();

        self.read_parsed(config_keys::HORIZON_DAYS, &mut config.horizon_days)?;
        self.read_parsed(config_keys::MAX_ITERATIONS, &mut config.max_iterations)?;
        self.read_parsed(config_keys::CLAMP_TO_ZERO, &mut config.clamp_to_zero)?;
        self.read_parsed(config_keys::CUTOFF_WEEKDAY, &mut config.cutoff_weekday)?;
        self.read_parsed(config_keys::PULL_BACK_WEEKDAY, &mut config.pull_back_weekday)?;
        self.read_parsed(config_keys::FAST_ROTATION_DAYS, &mut config.fast_rotation_days)?;
        self.read_parsed(config_keys::PRODUCTION_LEAD_DAYS, &mut config.production_lead_days)?;
        self.read_parsed(config_keys::FALLBACK_NODE, &mut config.fallback_node)?;
        self.read_parsed(config_keys::HUB_NODE, &mut config.hub_node)?;
        self.read_parsed(config_keys::CONSUMPTION_BOOST, &mut config.consumption_boost)?;

        // 排除物料: 逗号分隔
        if let Some(raw) = self.get_config_value(config_keys::EXCLUDED_ITEMS)? {
            config.excluded_items = raw
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        // 运行日期: YYYY-MM-DD
        if let Some(raw) = self.get_config_value(config_keys::TODAY)? {
            match NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d") {
                Ok(d) => config.today = Some(d),
                Err(_) => warn!(config_key = config_keys::TODAY, raw_value = %raw, "运行日期格式错误，忽略"),
            }
        }

        Ok(config)
    }

    /// 获取 global scope 的全部配置快照（JSON,按键排序）
    pub fn get_config_snapshot(&self) -> RepositoryResult<String> {
        let conn = self.get_conn()?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;

        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut config_map: BTreeMap<String, String> = BTreeMap::new();
        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        serde_json::to_string(&config_map).map_err(|e| RepositoryError::InternalError(e.to_string()))
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 收敛引擎
    pub const HORIZON_DAYS: &str = "planning/horizon_days";
    pub const MAX_ITERATIONS: &str = "planning/max_iterations";
    pub const CLAMP_TO_ZERO: &str = "planning/clamp_to_zero";

    // 物流日历
    pub const CUTOFF_WEEKDAY: &str = "planning/cutoff_weekday";
    pub const PULL_BACK_WEEKDAY: &str = "planning/pull_back_weekday";

    // 包装批量
    pub const FAST_ROTATION_DAYS: &str = "planning/fast_rotation_days";

    // 制造/分配
    pub const PRODUCTION_LEAD_DAYS: &str = "planning/production_lead_days";
    pub const FALLBACK_NODE: &str = "planning/fallback_node";
    pub const HUB_NODE: &str = "planning/hub_node";

    // 数据源
    pub const CONSUMPTION_BOOST: &str = "planning/consumption_boost";
    pub const EXCLUDED_ITEMS: &str = "planning/excluded_items";

    // 运行日期
    pub const TODAY: &str = "planning/today";
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_schema;

    fn in_memory_manager() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn)))
    }

    #[test]
    fn test_load_defaults_when_table_empty() {
        let manager = in_memory_manager();
        let config = manager.load_planning_config().unwrap();
        assert_eq!(config, PlanningConfig::default());
    }

    #[test]
    fn test_overrides_and_bad_values() {
        let manager = in_memory_manager();
        manager.set_config_value(config_keys::HORIZON_DAYS, "30").unwrap();
        manager.set_config_value(config_keys::MAX_ITERATIONS, "abc").unwrap();
        manager.set_config_value(config_keys::EXCLUDED_ITEMS, "30226, 40000,").unwrap();
        manager.set_config_value(config_keys::TODAY, "2026-01-05").unwrap();

        let config = manager.load_planning_config().unwrap();
        assert_eq!(config.horizon_days, 30);
        assert_eq!(config.max_iterations, 50); // 格式错误保留默认
        assert_eq!(config.excluded_items, vec!["30226".to_string(), "40000".to_string()]);
        assert_eq!(config.today, NaiveDate::from_ymd_opt(2026, 1, 5));

        let snapshot = manager.get_config_snapshot().unwrap();
        assert!(snapshot.contains("planning/horizon_days"));
    }
}
