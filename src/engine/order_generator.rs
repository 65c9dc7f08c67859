// ==========================================
// 多节点补货计划系统 - 补货单生成引擎
// ==========================================
// 职责: 针对每对的最早断货日生成一张覆盖补货单
// 规则: 覆盖天数 = max(0, 目标 - 安全); 数量 = ceil(日均消耗 × 覆盖天数)
//       到货日 = max(断货日 - 安全天数, 推演首日); 装车日 = 到货日
// 红线: 每对每轮最多一张单; 结果确定
// ==========================================

use crate::domain::order::ReplenishmentOrder;
use crate::domain::policy::PlanningPolicy;
use crate::domain::stock::StockForecast;
use crate::domain::types::PairKey;
use chrono::Duration;
use std::collections::HashMap;
use tracing::debug;

// ==========================================
// OrderGenerator - 补货单生成引擎
// ==========================================
#[derive(Debug, Default, Clone, Copy)]
pub struct OrderGenerator;

impl OrderGenerator {
    pub fn new() -> Self {
        Self
    }

    /// 覆盖数量 = ceil(rate × covering_days)
    pub fn covering_quantity(rate: f64, covering_days: i32) -> f64 {
        (rate * covering_days as f64).ceil()
    }

    /// 生成本轮补货单
    ///
    /// # 参数
    /// - forecast: 本轮推演结果
    /// - consumption: 日均消耗
    /// - policy: 覆盖策略
    /// - iteration: 当前轮次（写入补货单,便于追溯）
    ///
    /// # 返回
    /// 按 (节点, 物料) 有序的补货单列表
    pub fn generate(
        &self,
        forecast: &StockForecast,
        consumption: &HashMap<PairKey, f64>,
        policy: &PlanningPolicy,
        iteration: u32,
    ) -> Vec<ReplenishmentOrder> {
        let Some(horizon_start) = forecast.start_date else {
            return Vec::new();
        };

        let mut orders = Vec::new();
        for (key, days) in &forecast.series {
            let Some(stockout) = days.iter().find(|d| d.is_stockout) else {
                continue;
            };

            let coverage = policy.coverage_for(key);
            let rate = consumption.get(key).copied().unwrap_or(0.0);
            let quantity = Self::covering_quantity(rate, coverage.covering_days());
            if quantity <= 0.0 {
                debug!(pair = %key, rate, covering_days = coverage.covering_days(), "覆盖数量为 0，跳过");
                continue;
            }

            let delivery_date =
                (stockout.date - Duration::days(coverage.safety_days as i64)).max(horizon_start);

            orders.push(ReplenishmentOrder {
                key: key.clone(),
                load_date: delivery_date,
                delivery_date,
                quantity,
                stockout_date: stockout.date,
                annotations: Vec::new(),
                iteration,
            });
        }

        orders
    }
}
