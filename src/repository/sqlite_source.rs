// ==========================================
// 多节点补货计划系统 - SQLite 计划数据源
// ==========================================
// 职责: 从 SQLite 输入快照表读取计划输入
// 表: stock_snapshot / consumption_rate / node_policy / item_packaging /
//     pair_rotation / item_master / factory_stock / pending_delivery / factory_week
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::manufacturing::{FactoryWeek, ItemMaster, WeekType};
use crate::domain::policy::{CoveragePolicy, PackagingSpec};
use crate::domain::stock::{ScheduledDelivery, StockPosition};
use crate::domain::types::{DeliverySource, PairKey};
use crate::repository::data_source::{ConsumptionRates, PlanningDataSource, ScopeRequest};
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use chrono::NaiveDate;
use rusqlite::{params, Connection};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::warn;

// ==========================================
// SqlitePlanningSource
// ==========================================
pub struct SqlitePlanningSource {
    conn: Arc<Mutex<Connection>>,
}

impl SqlitePlanningSource {
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }
}

/// 解析日期列（YYYY-MM-DD）
fn parse_date_column(field: &str, raw: &str) -> RepositoryResult<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| RepositoryError::FieldValueError {
        field: field.to_string(),
        message: format!("{}: {}", raw, e),
    })
}

#[async_trait]
impl PlanningDataSource for SqlitePlanningSource {
    async fn load_stock(&self, request: &ScopeRequest) -> RepositoryResult<Vec<StockPosition>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT node, item, on_hand, snapshot_date FROM stock_snapshot
             WHERE scope_id = ?1 ORDER BY node, item",
        )?;
        let rows = stmt.query_map(params![request.scope_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, f64>(2)?,
                row.get::<_, Option<String>>(3)?,
            ))
        })?;

        let excluded = request.excluded_set();
        let mut stock = Vec::new();
        for row in rows {
            let (node, item, on_hand, snapshot_date) = row?;
            if excluded.contains(item.as_str()) {
                continue;
            }
            let mut position = StockPosition::new(&node, &item, on_hand);
            position.snapshot_date = snapshot_date
                .as_deref()
                .map(|raw| parse_date_column("snapshot_date", raw))
                .transpose()?;
            stock.push(position);
        }
        Ok(stock)
    }

    async fn load_consumption(&self, request: &ScopeRequest) -> RepositoryResult<ConsumptionRates> {
        let conn = self.get_conn()?;
        let mut stmt =
            conn.prepare("SELECT node, item, daily_rate FROM consumption_rate WHERE scope_id = ?1")?;
        let rows = stmt.query_map(params![request.scope_id], |row| {
            Ok((
                PairKey::new(row.get::<_, String>(0)?, row.get::<_, String>(1)?),
                row.get::<_, f64>(2)?,
            ))
        })?;

        let mut baseline = HashMap::new();
        for row in rows {
            let (key, rate) = row?;
            baseline.insert(key, rate);
        }
        Ok(ConsumptionRates::from_baseline(baseline, request))
    }

    async fn load_node_policies(
        &self,
        _request: &ScopeRequest,
    ) -> RepositoryResult<HashMap<String, CoveragePolicy>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT node, target_days, safety_days FROM node_policy")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                CoveragePolicy::new(row.get(1)?, row.get(2)?),
            ))
        })?;

        let mut policies = HashMap::new();
        for row in rows {
            let (node, policy) = row?;
            policies.insert(node, policy);
        }
        Ok(policies)
    }

    async fn load_packaging(&self, _request: &ScopeRequest) -> RepositoryResult<HashMap<String, PackagingSpec>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT item, case_size, pallet_size FROM item_packaging")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                PackagingSpec {
                    case_size: row.get(1)?,
                    pallet_size: row.get(2)?,
                },
            ))
        })?;

        let mut packaging = HashMap::new();
        for row in rows {
            let (item, spec) = row?;
            packaging.insert(item, spec);
        }
        Ok(packaging)
    }

    async fn load_rotation(&self, _request: &ScopeRequest) -> RepositoryResult<HashMap<PairKey, f64>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT node, item, days_per_pallet FROM pair_rotation")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                PairKey::new(row.get::<_, String>(0)?, row.get::<_, String>(1)?),
                row.get::<_, f64>(2)?,
            ))
        })?;

        let mut rotation = HashMap::new();
        for row in rows {
            let (key, days) = row?;
            rotation.insert(key, days);
        }
        Ok(rotation)
    }

    async fn load_item_master(&self, _request: &ScopeRequest) -> RepositoryResult<HashMap<String, ItemMaster>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT item, min_batch, unit_price, work_center FROM item_master")?;
        let rows = stmt.query_map([], |row| {
            Ok(ItemMaster {
                item: row.get(0)?,
                min_batch: row.get(1)?,
                unit_price: row.get(2)?,
                work_center: row.get(3)?,
            })
        })?;

        let mut items = HashMap::new();
        for row in rows {
            let master = row?;
            items.insert(master.item.clone(), master);
        }
        Ok(items)
    }

    async fn load_factory_stock(&self, request: &ScopeRequest) -> RepositoryResult<HashMap<String, f64>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT item, quantity FROM factory_stock")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?)))?;

        let mut stock = HashMap::new();
        for row in rows {
            let (item, quantity) = row?;
            if !request.is_excluded(&item) {
                stock.insert(item, quantity);
            }
        }
        Ok(stock)
    }

    async fn load_pending_deliveries(
        &self,
        request: &ScopeRequest,
    ) -> RepositoryResult<Vec<ScheduledDelivery>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT node, item, arrival_date, quantity FROM pending_delivery
             WHERE scope_id = ?1 ORDER BY arrival_date, node, item",
        )?;
        let rows = stmt.query_map(params![request.scope_id], |row| {
            Ok((
                PairKey::new(row.get::<_, String>(0)?, row.get::<_, String>(1)?),
                row.get::<_, String>(2)?,
                row.get::<_, f64>(3)?,
            ))
        })?;

        let mut deliveries = Vec::new();
        for row in rows {
            let (key, arrival, quantity) = row?;
            if request.is_excluded(&key.item) {
                continue;
            }
            let arrival_date = parse_date_column("arrival_date", &arrival)?;
            deliveries.push(ScheduledDelivery::new(
                key,
                arrival_date,
                quantity,
                DeliverySource::PendingPurchase,
            ));
        }
        Ok(deliveries)
    }

    async fn load_factory_calendar(&self, _request: &ScopeRequest) -> RepositoryResult<Vec<FactoryWeek>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT week_monday, week_type FROM factory_week ORDER BY week_monday")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;

        let mut weeks = Vec::new();
        for row in rows {
            let (monday, raw_type) = row?;
            match raw_type.parse::<WeekType>() {
                Ok(week_type) => weeks.push(FactoryWeek {
                    week_monday: parse_date_column("week_monday", &monday)?,
                    week_type,
                }),
                Err(message) => warn!(week_monday = %monday, %message, "忽略未知周类型"),
            }
        }
        Ok(weeks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_schema;

    fn seeded_source() -> SqlitePlanningSource {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn.execute_batch(
            "INSERT INTO stock_snapshot VALUES ('S1','0801','100',20,'2026-03-02');
             INSERT INTO stock_snapshot VALUES ('S1','0801','999',5,NULL);
             INSERT INTO stock_snapshot VALUES ('S2','0801','100',1,NULL);
             INSERT INTO consumption_rate VALUES ('S1','0801','100',10);
             INSERT INTO node_policy VALUES ('0801',7,2);
             INSERT INTO factory_week VALUES ('2026-03-02','ULTRA');
             INSERT INTO factory_week VALUES ('2026-03-09','WEEKLY');
             INSERT INTO pending_delivery VALUES ('S1','0801','100','2026-03-05',30);",
        )
        .unwrap();
        SqlitePlanningSource::from_connection(Arc::new(Mutex::new(conn)))
    }

    #[tokio::test]
    async fn test_loads_scoped_rows_with_exclusion_and_boost() {
        let source = seeded_source();
        let request = ScopeRequest {
            scope_id: "S1".to_string(),
            consumption_boost: 0.5,
            excluded_items: vec!["999".to_string()],
        };

        let stock = source.load_stock(&request).await.unwrap();
        assert_eq!(stock.len(), 1);
        assert_eq!(stock[0].snapshot_date, NaiveDate::from_ymd_opt(2026, 3, 2));

        let rates = source.load_consumption(&request).await.unwrap();
        assert_eq!(rates.adjusted[&PairKey::new("0801", "100")], 15.0);
        assert_eq!(rates.baseline[&PairKey::new("0801", "100")], 10.0);

        let pending = source.load_pending_deliveries(&request).await.unwrap();
        assert_eq!(pending[0].quantity, 30.0);

        let weeks = source.load_factory_calendar(&request).await.unwrap();
        assert_eq!(weeks.len(), 1);
        assert_eq!(weeks[0].week_type, WeekType::Ultra);
    }
}
