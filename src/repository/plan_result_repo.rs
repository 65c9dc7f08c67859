// ==========================================
// 多节点补货计划系统 - 计划结果仓储
// ==========================================
// 职责: 持久化计划运行、预测行、补货单行
// 语义: 按范围整体替换（同一 scope 只保留最近一次运行）
// 红线: 写入在单个事务内完成
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::order::OrderReportRow;
use crate::domain::stock::ForecastRow;
use crate::domain::types::RunOutcome;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tracing::info;

// ==========================================
// PlanRunRecord - 计划运行记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanRunRecord {
    pub run_id: String,
    pub scope_id: String,
    pub outcome: RunOutcome,
    pub iterations: u32,
    pub order_count: usize,
    pub warning: Option<String>,
    pub config_snapshot_json: Option<String>,
    pub created_at: NaiveDateTime,
}

// ==========================================
// PlanResultSink Trait - 结果输出接口
// ==========================================
pub trait PlanResultSink: Send + Sync {
    /// 保存一次运行的全部结果（替换该范围已有结果）
    fn save_run(
        &self,
        run: &PlanRunRecord,
        forecast: &[ForecastRow],
        orders: &[OrderReportRow],
    ) -> RepositoryResult<()>;
}

// ==========================================
// PlanResultRepository - SQLite 实现
// ==========================================
pub struct PlanResultRepository {
    conn: Arc<Mutex<Connection>>,
}

impl PlanResultRepository {
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

    /// 查询范围内最近一次运行
    pub fn find_latest_run(&self, scope_id: &str) -> RepositoryResult<Option<PlanRunRecord>> {
        let conn = self.get_conn()?;
        let row = conn
            .query_row(
                r#"
                SELECT run_id, scope_id, outcome, iterations, order_count, warning,
                       config_snapshot_json, created_at
                FROM plan_run WHERE scope_id = ?1
                ORDER BY created_at DESC LIMIT 1
                "#,
                params![scope_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, u32>(3)?,
                        row.get::<_, i64>(4)?,
                        row.get::<_, Option<String>>(5)?,
                        row.get::<_, Option<String>>(6)?,
                        row.get::<_, String>(7)?,
                    ))
                },
            )
            .optional()?;

        let Some((run_id, scope_id, outcome, iterations, order_count, warning, snapshot, created_at)) = row else {
            return Ok(None);
        };

        let outcome = match outcome.as_str() {
            "CONVERGED" => RunOutcome::Converged,
            "ABORTED" => RunOutcome::Aborted,
            "ITERATION_CAP_REACHED" => RunOutcome::IterationCapReached,
            other => {
                return Err(RepositoryError::FieldValueError {
                    field: "outcome".to_string(),
                    message: format!("未知运行结果: {}", other),
                })
            }
        };
        let created_at = NaiveDateTime::parse_from_str(&created_at, "%Y-%m-%d %H:%M:%S").map_err(|e| {
            RepositoryError::FieldValueError {
                field: "created_at".to_string(),
                message: e.to_string(),
            }
        })?;

        Ok(Some(PlanRunRecord {
            run_id,
            scope_id,
            outcome,
            iterations,
            order_count: order_count.max(0) as usize,
            warning,
            config_snapshot_json: snapshot,
            created_at,
        }))
    }

    /// 查询范围内的补货单（装车日、节点、物料有序）
    pub fn find_orders(&self, scope_id: &str) -> RepositoryResult<Vec<OrderReportRow>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT node, item, load_date, delivery_date, quantity, stockout_date, annotations,
                   iso_year, iso_week, iso_week_label, baseline_rate, adjusted_rate,
                   order_value, days_of_stock_on_arrival
            FROM order_row WHERE scope_id = ?1
            ORDER BY load_date, node, item
            "#,
        )?;

        let rows = stmt.query_map(params![scope_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, f64>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, String>(6)?,
                row.get::<_, i32>(7)?,
                row.get::<_, u32>(8)?,
                row.get::<_, String>(9)?,
                row.get::<_, Option<f64>>(10)?,
                row.get::<_, Option<f64>>(11)?,
                row.get::<_, Option<f64>>(12)?,
                row.get::<_, Option<f64>>(13)?,
            ))
        })?;

        let mut orders = Vec::new();
        for row in rows {
            let (node, item, load, delivery, quantity, stockout, annotations, iso_year, iso_week, label, base, adj, value, days) =
                row?;
            orders.push(OrderReportRow {
                node,
                item,
                load_date: parse_date("load_date", &load)?,
                delivery_date: parse_date("delivery_date", &delivery)?,
                quantity,
                stockout_date: parse_date("stockout_date", &stockout)?,
                annotations,
                iso_year,
                iso_week,
                iso_week_label: label,
                baseline_rate: base,
                adjusted_rate: adj,
                order_value: value,
                days_of_stock_on_arrival: days,
            });
        }
        Ok(orders)
    }

    /// 统计范围内的预测行数
    pub fn count_forecast_rows(&self, scope_id: &str) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM forecast_row WHERE scope_id = ?1",
            params![scope_id],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as usize)
    }
}

fn parse_date(field: &str, raw: &str) -> RepositoryResult<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| RepositoryError::FieldValueError {
        field: field.to_string(),
        message: format!("{}: {}", raw, e),
    })
}

impl PlanResultSink for PlanResultRepository {
    fn save_run(
        &self,
        run: &PlanRunRecord,
        forecast: &[ForecastRow],
        orders: &[OrderReportRow],
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;

        // 1. 替换语义: 删除该范围旧结果
        tx.execute("DELETE FROM forecast_row WHERE scope_id = ?1", params![run.scope_id])?;
        tx.execute("DELETE FROM order_row WHERE scope_id = ?1", params![run.scope_id])?;
        tx.execute("DELETE FROM plan_run WHERE scope_id = ?1", params![run.scope_id])?;

        // 2. 运行记录
        tx.execute(
            r#"
            INSERT INTO plan_run (
                run_id, scope_id, outcome, iterations, order_count, warning,
                config_snapshot_json, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                run.run_id,
                run.scope_id,
                run.outcome.as_str(),
                run.iterations,
                run.order_count as i64,
                run.warning,
                run.config_snapshot_json,
                run.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            ],
        )?;

        // 3. 预测行
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO forecast_row (
                    run_id, scope_id, node, item, forecast_date, visible_stock, deficit, is_stockout
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
            )?;
            for row in forecast {
                stmt.execute(params![
                    run.run_id,
                    run.scope_id,
                    row.node,
                    row.item,
                    row.date.to_string(),
                    row.visible_stock,
                    row.deficit,
                    row.is_stockout,
                ])?;
            }
        }

        // 4. 补货单行
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO order_row (
                    run_id, scope_id, node, item, load_date, delivery_date, quantity,
                    stockout_date, annotations, iso_year, iso_week, iso_week_label,
                    baseline_rate, adjusted_rate, order_value, days_of_stock_on_arrival
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
                "#,
            )?;
            for row in orders {
                stmt.execute(params![
                    run.run_id,
                    run.scope_id,
                    row.node,
                    row.item,
                    row.load_date.to_string(),
                    row.delivery_date.to_string(),
                    row.quantity,
                    row.stockout_date.to_string(),
                    row.annotations,
                    row.iso_year,
                    row.iso_week,
                    row.iso_week_label,
                    row.baseline_rate,
                    row.adjusted_rate,
                    row.order_value,
                    row.days_of_stock_on_arrival,
                ])?;
            }
        }

        tx.commit()?;

        info!(
            run_id = %run.run_id,
            scope_id = %run.scope_id,
            forecast_rows = forecast.len(),
            order_rows = orders.len(),
            "计划结果已保存"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_schema;
    use chrono::NaiveDate;

    fn repo() -> PlanResultRepository {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        PlanResultRepository::from_connection(Arc::new(Mutex::new(conn)))
    }

    fn run(run_id: &str) -> PlanRunRecord {
        PlanRunRecord {
            run_id: run_id.to_string(),
            scope_id: "S1".to_string(),
            outcome: RunOutcome::IterationCapReached,
            iterations: 50,
            order_count: 1,
            warning: Some("cap".to_string()),
            config_snapshot_json: None,
            created_at: NaiveDate::from_ymd_opt(2026, 3, 2)
                .unwrap()
                .and_hms_opt(8, 0, 0)
                .unwrap(),
        }
    }

    fn order_row() -> OrderReportRow {
        let d = NaiveDate::from_ymd_opt(2026, 3, 4).unwrap();
        OrderReportRow {
            node: "0801".to_string(),
            item: "100".to_string(),
            load_date: d,
            delivery_date: d,
            quantity: 48.0,
            stockout_date: d,
            annotations: String::new(),
            iso_year: 2026,
            iso_week: 10,
            iso_week_label: "2026-W10".to_string(),
            baseline_rate: Some(10.0),
            adjusted_rate: Some(10.0),
            order_value: None,
            days_of_stock_on_arrival: None,
        }
    }

    #[test]
    fn test_save_replaces_previous_scope_results() {
        let repo = repo();
        let forecast = vec![ForecastRow {
            node: "0801".to_string(),
            item: "100".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            visible_stock: 5.0,
            deficit: 0.0,
            is_stockout: false,
        }];

        repo.save_run(&run("r1"), &forecast, &[order_row()]).unwrap();
        repo.save_run(&run("r2"), &forecast, &[order_row()]).unwrap();

        let latest = repo.find_latest_run("S1").unwrap().unwrap();
        assert_eq!(latest.run_id, "r2");
        assert_eq!(latest.outcome, RunOutcome::IterationCapReached);
        assert_eq!(repo.find_orders("S1").unwrap(), vec![order_row()]);
        assert_eq!(repo.count_forecast_rows("S1").unwrap(), 1);
        assert!(repo.find_latest_run("S2").unwrap().is_none());
    }
}
