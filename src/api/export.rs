// ==========================================
// 多节点补货计划系统 - CSV 导出
// ==========================================
// 职责: 将计划报告写出为 CSV 文件
// 文件: forecast.csv / orders.csv / manufacturing_orders.csv / allocations.csv
// ==========================================

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use csv::Writer;
use tracing::info;

use crate::api::error::PlanningResult;
use crate::api::planning_api::PlanningRunReport;
use crate::domain::manufacturing::{AllocatedDelivery, ManufacturingOrder};
use crate::domain::order::OrderReportRow;
use crate::domain::stock::ForecastRow;

pub const FORECAST_FILE: &str = "forecast.csv";
pub const ORDERS_FILE: &str = "orders.csv";
pub const MANUFACTURING_FILE: &str = "manufacturing_orders.csv";
pub const ALLOCATIONS_FILE: &str = "allocations.csv";

/// 写出预测表
pub fn write_forecast<W: Write>(writer: W, rows: &[ForecastRow]) -> PlanningResult<()> {
    let mut wtr = Writer::from_writer(writer);
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// 写出补货单表
pub fn write_orders<W: Write>(writer: W, rows: &[OrderReportRow]) -> PlanningResult<()> {
    let mut wtr = Writer::from_writer(writer);
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// 写出制造批次（备注以 "; " 拼接）
pub fn write_manufacturing_orders<W: Write>(writer: W, orders: &[ManufacturingOrder]) -> PlanningResult<()> {
    let mut wtr = Writer::from_writer(writer);
    wtr.write_record(["order_id", "item", "order_date", "load_date", "quantity", "annotations"])?;
    for mo in orders {
        wtr.write_record([
            mo.order_id.clone(),
            mo.item.clone(),
            mo.order_date.to_string(),
            mo.load_date.to_string(),
            mo.quantity.to_string(),
            mo.annotations.join("; "),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// 写出分配/调拨结果
pub fn write_allocations<W: Write>(writer: W, deliveries: &[AllocatedDelivery]) -> PlanningResult<()> {
    let mut wtr = Writer::from_writer(writer);
    wtr.write_record([
        "source_ref",
        "node",
        "item",
        "load_date",
        "delivery_date",
        "quantity",
        "kind",
    ])?;
    for d in deliveries {
        wtr.write_record([
            d.source_ref.clone(),
            d.key.node.clone(),
            d.key.item.clone(),
            d.load_date.to_string(),
            d.delivery_date.to_string(),
            d.quantity.to_string(),
            d.kind.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// 将整份报告写入目录
///
/// # 返回
/// 写出的文件路径
pub fn export_report(report: &PlanningRunReport, out_dir: &Path) -> PlanningResult<Vec<PathBuf>> {
    fs::create_dir_all(out_dir)?;
    let mut written = Vec::new();

    let path = out_dir.join(FORECAST_FILE);
    write_forecast(fs::File::create(&path)?, &report.forecast)?;
    written.push(path);

    let path = out_dir.join(ORDERS_FILE);
    write_orders(fs::File::create(&path)?, &report.orders)?;
    written.push(path);

    if let Some(plan) = &report.manufacturing {
        let path = out_dir.join(MANUFACTURING_FILE);
        write_manufacturing_orders(fs::File::create(&path)?, &plan.manufacturing_orders)?;
        written.push(path);

        let path = out_dir.join(ALLOCATIONS_FILE);
        write_allocations(fs::File::create(&path)?, &plan.all_deliveries())?;
        written.push(path);
    }

    info!(run_id = %report.run_id, out_dir = %out_dir.display(), files = written.len(), "计划结果已导出");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_forecast_csv_has_header_and_rows() {
        let rows = vec![ForecastRow {
            node: "0801".to_string(),
            item: "100".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            visible_stock: 0.0,
            deficit: 5.0,
            is_stockout: true,
        }];
        let mut buf = Vec::new();
        write_forecast(&mut buf, &rows).unwrap();

        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("node,item,date,visible_stock,deficit,is_stockout")
        );
        assert_eq!(lines.next(), Some("0801,100,2026-03-02,0.0,5.0,true"));
    }
}
