// ==========================================
// 多节点补货计划系统 - 补货单富化
// ==========================================
// 职责: 为输出补货单补充 ISO 周、日均消耗、金额、到货日库存天数
// 规则: 到货日库存天数 = 最终推演中到货日可见库存 ÷ 加成后日均消耗
//       日均消耗为 0 或无推演记录 → None
// ==========================================

use crate::domain::input::PlanningInput;
use crate::domain::order::{OrderReportRow, ReplenishmentOrder};
use crate::domain::stock::StockForecast;
use chrono::Datelike;

// ==========================================
// OrderEnricher - 补货单富化器
// ==========================================
pub struct OrderEnricher<'a> {
    input: &'a PlanningInput,
    forecast: &'a StockForecast,
}

impl<'a> OrderEnricher<'a> {
    pub fn new(input: &'a PlanningInput, forecast: &'a StockForecast) -> Self {
        Self { input, forecast }
    }

    /// ISO 周标签（YYYY-Www）
    pub fn iso_week_label(iso_year: i32, iso_week: u32) -> String {
        format!("{}-W{:02}", iso_year, iso_week)
    }

    pub fn enrich(&self, order: &ReplenishmentOrder) -> OrderReportRow {
        let iso = order.load_date.iso_week();
        let baseline_rate = self.input.baseline_consumption.get(&order.key).copied();
        let adjusted_rate = self.input.consumption.get(&order.key).copied();

        let days_of_stock_on_arrival = match adjusted_rate {
            Some(rate) if rate > 0.0 => self
                .forecast
                .visible_stock_on(&order.key, order.delivery_date)
                .map(|stock| stock / rate),
            _ => None,
        };

        OrderReportRow {
            node: order.key.node.clone(),
            item: order.key.item.clone(),
            load_date: order.load_date,
            delivery_date: order.delivery_date,
            quantity: order.quantity,
            stockout_date: order.stockout_date,
            annotations: order.annotation_text(),
            iso_year: iso.year(),
            iso_week: iso.week(),
            iso_week_label: Self::iso_week_label(iso.year(), iso.week()),
            baseline_rate,
            adjusted_rate,
            order_value: self
                .input
                .unit_price_for(&order.key.item)
                .map(|price| price * order.quantity),
            days_of_stock_on_arrival,
        }
    }

    pub fn enrich_all(&self, orders: &[ReplenishmentOrder]) -> Vec<OrderReportRow> {
        orders.iter().map(|o| self.enrich(o)).collect()
    }
}
