// ==========================================
// 多节点补货计划系统 - 枢纽调拨
// ==========================================
// 职责: 非枢纽节点的补货单,若枢纽库存充足则改为从枢纽调拨
// 规则: 枢纽装车日可见库存 - 已预留 - 单量 >= 枢纽目标库存
//       目标库存 = 枢纽日均消耗 × 枢纽目标天数
// 输出: 目的节点调入 + 枢纽调出（负数）,其余补货单原样保留
// ==========================================

use crate::domain::manufacturing::{AllocatedDelivery, AllocationKind};
use crate::domain::order::ReplenishmentOrder;
use crate::domain::policy::PlanningPolicy;
use crate::domain::stock::StockForecast;
use crate::domain::types::PairKey;
use std::collections::HashMap;
use tracing::debug;

// ==========================================
// ReallocationResult - 调拨结果
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct ReallocationResult {
    pub transfers: Vec<AllocatedDelivery>,
    pub remaining: Vec<ReplenishmentOrder>,
}

impl ReallocationResult {
    /// 被调拨满足的补货单数
    pub fn transferred_count(&self) -> usize {
        self.transfers
            .iter()
            .filter(|t| t.kind == AllocationKind::TransferIn)
            .count()
    }
}

// ==========================================
// StockReallocator - 枢纽调拨器
// ==========================================
pub struct StockReallocator {
    hub_node: String,
}

impl StockReallocator {
    pub fn new(hub_node: impl Into<String>) -> Self {
        Self {
            hub_node: hub_node.into(),
        }
    }

    /// 执行调拨判定
    ///
    /// # 参数
    /// - orders: 累积补货单
    /// - forecast: 最终推演（读取枢纽可见库存）
    /// - consumption / policy: 计算枢纽目标库存
    pub fn reallocate(
        &self,
        orders: &[ReplenishmentOrder],
        forecast: &StockForecast,
        consumption: &HashMap<PairKey, f64>,
        policy: &PlanningPolicy,
    ) -> ReallocationResult {
        let mut result = ReallocationResult::default();
        // 同一物料已调出的数量（后续判定需扣除）
        let mut reserved: HashMap<&str, f64> = HashMap::new();

        let mut sorted: Vec<&ReplenishmentOrder> = orders.iter().collect();
        sorted.sort_by(|a, b| (a.load_date, &a.key).cmp(&(b.load_date, &b.key)));

        for order in sorted {
            if order.key.node == self.hub_node || order.quantity <= 0.0 {
                result.remaining.push(order.clone());
                continue;
            }

            let hub_key = PairKey::new(self.hub_node.clone(), order.key.item.clone());
            let Some(visible) = forecast.visible_stock_on(&hub_key, order.load_date) else {
                result.remaining.push(order.clone());
                continue;
            };

            let hub_target = consumption.get(&hub_key).copied().unwrap_or(0.0)
                * policy.coverage_for(&hub_key).target_days as f64;
            let already = reserved.get(order.key.item.as_str()).copied().unwrap_or(0.0);

            if visible - already - order.quantity < hub_target {
                result.remaining.push(order.clone());
                continue;
            }

            let source_ref = format!("TRANSFER-{}", self.hub_node);
            result.transfers.push(AllocatedDelivery {
                source_ref: source_ref.clone(),
                key: order.key.clone(),
                load_date: order.load_date,
                delivery_date: order.delivery_date,
                quantity: order.quantity,
                kind: AllocationKind::TransferIn,
            });
            result.transfers.push(AllocatedDelivery {
                source_ref,
                key: hub_key,
                load_date: order.load_date,
                delivery_date: order.delivery_date,
                quantity: -order.quantity,
                kind: AllocationKind::TransferOut,
            });
            *reserved.entry(order.key.item.as_str()).or_insert(0.0) += order.quantity;

            debug!(pair = %order.key, quantity = order.quantity, hub = %self.hub_node, "补货单改为枢纽调拨");
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::stock::ForecastDay;
    use chrono::{Duration, NaiveDate};
    use std::collections::BTreeMap;

    fn flat_forecast(key: &PairKey, start: NaiveDate, visible: f64) -> StockForecast {
        let days = (0..10)
            .map(|i| ForecastDay {
                date: start + Duration::days(i),
                visible_stock: visible,
                deficit: 0.0,
                is_stockout: false,
            })
            .collect();
        StockForecast {
            start_date: Some(start),
            horizon_days: 10,
            series: BTreeMap::from([(key.clone(), days)]),
        }
    }

    fn order(node: &str, load: NaiveDate, quantity: f64) -> ReplenishmentOrder {
        ReplenishmentOrder {
            key: PairKey::new(node, "100"),
            load_date: load,
            delivery_date: load,
            quantity,
            stockout_date: load,
            annotations: Vec::new(),
            iteration: 1,
        }
    }

    #[test]
    fn test_transfer_when_hub_keeps_target() {
        let start = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let hub = PairKey::new("0801", "100");
        let forecast = flat_forecast(&hub, start, 200.0);
        let consumption = HashMap::from([(hub.clone(), 10.0)]);
        let policy = PlanningPolicy::default().with_coverage("0801", 10, 0);

        let orders = vec![
            order("2801", start, 80.0),
            order("3801", start + Duration::days(1), 80.0),
            order("0801", start, 50.0),
        ];
        let result = StockReallocator::new("0801").reallocate(&orders, &forecast, &consumption, &policy);

        // 200-80 >= 100 → 调拨; 200-80-80 < 100 → 保留
        assert_eq!(result.transferred_count(), 1);
        assert_eq!(result.transfers.len(), 2);
        assert_eq!(result.transfers[1].quantity, -80.0);
        assert_eq!(result.transfers[1].key, hub);
        assert_eq!(result.transfers[0].source_ref, "TRANSFER-0801");
        assert_eq!(result.remaining.len(), 2);
    }

    #[test]
    fn test_no_hub_forecast_keeps_order() {
        let start = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let forecast = StockForecast::default();
        let orders = vec![order("2801", start, 10.0)];
        let result = StockReallocator::new("0801").reallocate(
            &orders,
            &forecast,
            &HashMap::new(),
            &PlanningPolicy::default(),
        );
        assert!(result.transfers.is_empty());
        assert_eq!(result.remaining.len(), 1);
    }
}
