// ==========================================
// 多节点补货计划系统 - 库存推演引擎
// ==========================================
// 职责: 逐日推演每个 (节点, 物料) 的可见库存与缺口
// 输入: 期初库存 + 日均消耗 + 计划到货 + 推演天数
// 输出: StockForecast（每对恰好 horizon_days 条记录）
// 红线: 纯计算、无 I/O、输出与对的遍历顺序无关
// ==========================================

use crate::domain::stock::{ForecastDay, ScheduledDelivery, StockForecast, StockPosition};
use crate::domain::types::PairKey;
use chrono::{Duration, NaiveDate};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

// ==========================================
// SimulationParams - 推演参数
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationParams {
    pub horizon_days: u32,
    pub clamp_to_zero: bool,
    pub today: NaiveDate,
}

// ==========================================
// StockSimulator - 库存推演引擎
// ==========================================
pub struct StockSimulator {
    params: SimulationParams,
}

impl StockSimulator {
    pub fn new(params: SimulationParams) -> Self {
        Self { params }
    }

    /// 推演起始日
    ///
    /// # 规则
    /// - start = max(最早的快照日期/到货日期, today)
    /// - 无任何日期时取 today
    pub fn start_date(&self, stock: &[StockPosition], deliveries: &[ScheduledDelivery]) -> NaiveDate {
        let earliest = stock
            .iter()
            .filter_map(|s| s.snapshot_date)
            .chain(deliveries.iter().map(|d| d.arrival_date))
            .min();

        match earliest {
            Some(d) => d.max(self.params.today),
            None => self.params.today,
        }
    }

    /// 执行推演
    ///
    /// # 参数
    /// - stock: 期初库存（同一对出现多次时求和）
    /// - consumption: 日均消耗（缺失视为 0）
    /// - deliveries: 计划到货（超出推演窗口的忽略,同日多笔求和）
    ///
    /// # 返回
    /// 每对 horizon_days 条逐日记录
    pub fn simulate(
        &self,
        stock: &[StockPosition],
        consumption: &HashMap<PairKey, f64>,
        deliveries: &[ScheduledDelivery],
    ) -> StockForecast {
        let start = self.start_date(stock, deliveries);
        self.simulate_from(start, stock, consumption, deliveries)
    }

    /// 以指定起始日推演（收敛循环内固定窗口,避免累积补货单移动起始日）
    pub fn simulate_from(
        &self,
        start: NaiveDate,
        stock: &[StockPosition],
        consumption: &HashMap<PairKey, f64>,
        deliveries: &[ScheduledDelivery],
    ) -> StockForecast {
        let horizon = self.params.horizon_days as usize;

        // 1. 期初库存按对汇总
        let mut opening: BTreeMap<PairKey, f64> = BTreeMap::new();
        for position in stock {
            *opening.entry(position.key.clone()).or_insert(0.0) += position.on_hand;
        }

        // 2. 到货按 (对, 日序号) 汇总
        let mut arrivals: HashMap<(&PairKey, usize), f64> = HashMap::new();
        for delivery in deliveries {
            let offset = (delivery.arrival_date - start).num_days();
            if offset < 0 || offset >= horizon as i64 {
                continue;
            }
            *arrivals.entry((&delivery.key, offset as usize)).or_insert(0.0) += delivery.quantity;
        }

        // 3. 逐对逐日推演
        let mut series = BTreeMap::new();
        for (key, on_hand) in opening {
            let rate = consumption.get(&key).copied().unwrap_or(0.0);
            let mut carried = on_hand;
            let mut days = Vec::with_capacity(horizon);

            for offset in 0..horizon {
                let date = start + Duration::days(offset as i64);
                let raw = carried + arrivals.get(&(&key, offset)).copied().unwrap_or(0.0) - rate;

                let deficit = (-raw).max(0.0);
                let visible = if self.params.clamp_to_zero { raw.max(0.0) } else { raw };

                days.push(ForecastDay {
                    date,
                    visible_stock: visible,
                    deficit,
                    is_stockout: deficit > 0.0,
                });

                // 截断模式下次日以截断值续推
                carried = visible;
            }

            series.insert(key, days);
        }

        debug!(
            start_date = %start,
            pair_count = series.len(),
            horizon_days = self.params.horizon_days,
            "库存推演完成"
        );

        StockForecast {
            start_date: Some(start),
            horizon_days: self.params.horizon_days,
            series,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::DeliverySource;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn simulator(horizon_days: u32, clamp_to_zero: bool) -> StockSimulator {
        StockSimulator::new(SimulationParams {
            horizon_days,
            clamp_to_zero,
            today: date(2026, 3, 2),
        })
    }

    fn rates(entries: &[(&str, &str, f64)]) -> HashMap<PairKey, f64> {
        entries
            .iter()
            .map(|(n, i, r)| (PairKey::new(*n, *i), *r))
            .collect()
    }

    #[test]
    fn test_draw_down_without_stockout_inside_horizon() {
        let sim = simulator(10, true);
        let forecast = sim.simulate(
            &[StockPosition::new("0801", "100", 100.0)],
            &rates(&[("0801", "100", 10.0)]),
            &[],
        );

        let days = &forecast.series[&PairKey::new("0801", "100")];
        assert_eq!(days.len(), 10);
        assert_eq!(days[8].visible_stock, 10.0);
        assert_eq!(days[9].visible_stock, 0.0);
        assert!(!forecast.has_stockout());
    }

    #[test]
    fn test_clamped_stock_carries_forward() {
        let sim = simulator(4, true);
        let key = PairKey::new("0801", "100");
        let mut position = StockPosition::new("0801", "100", 5.0);
        position.snapshot_date = Some(date(2026, 3, 2));
        let forecast = sim.simulate(
            &[position],
            &rates(&[("0801", "100", 10.0)]),
            &[ScheduledDelivery::new(
                key.clone(),
                date(2026, 3, 4),
                25.0,
                DeliverySource::PendingPurchase,
            )],
        );

        let days = &forecast.series[&key];
        // 第1天: 5-10=-5 → 缺口5,可见0
        assert_eq!(days[0].deficit, 5.0);
        assert_eq!(days[0].visible_stock, 0.0);
        // 第2天: 0-10 → 缺口10
        assert_eq!(days[1].deficit, 10.0);
        // 第3天: 0+25-10=15
        assert_eq!(days[2].visible_stock, 15.0);
        assert!(!days[2].is_stockout);
        assert_eq!(days[3].visible_stock, 5.0);
    }

    #[test]
    fn test_unclamped_stock_goes_negative() {
        let sim = simulator(3, false);
        let forecast = sim.simulate(
            &[StockPosition::new("0801", "100", 5.0)],
            &rates(&[("0801", "100", 10.0)]),
            &[],
        );
        let days = &forecast.series[&PairKey::new("0801", "100")];
        assert_eq!(days[2].visible_stock, -25.0);
        assert_eq!(days[2].deficit, 25.0);
    }

    #[test]
    fn test_missing_rate_and_out_of_horizon_delivery() {
        let sim = simulator(5, true);
        let key = PairKey::new("2801", "200");
        let mut position = StockPosition::new("2801", "200", 7.0);
        position.snapshot_date = Some(date(2026, 3, 2));
        let forecast = sim.simulate(
            &[position],
            &HashMap::new(),
            &[ScheduledDelivery::new(
                key.clone(),
                date(2026, 4, 30),
                100.0,
                DeliverySource::PendingPurchase,
            )],
        );
        assert_eq!(forecast.start_date, Some(date(2026, 3, 2)));
        let days = &forecast.series[&key];
        assert_eq!(days.len(), 5);
        assert!(days.iter().all(|d| d.visible_stock == 7.0 && !d.is_stockout));
    }

    #[test]
    fn test_start_date_never_before_today() {
        let sim = simulator(5, true);
        let mut position = StockPosition::new("0801", "100", 1.0);
        position.snapshot_date = Some(date(2026, 2, 20));
        assert_eq!(sim.start_date(&[position], &[]), date(2026, 3, 2));
        assert_eq!(sim.start_date(&[], &[]), date(2026, 3, 2));
    }

    #[test]
    fn test_simulate_from_keeps_fixed_window() {
        let sim = simulator(3, true);
        let key = PairKey::new("0801", "100");
        let forecast = sim.simulate_from(
            date(2026, 3, 2),
            &[StockPosition::new("0801", "100", 0.0)],
            &rates(&[("0801", "100", 1.0)]),
            &[ScheduledDelivery::new(key.clone(), date(2026, 3, 3), 5.0, DeliverySource::PlannedOrder)],
        );
        assert_eq!(forecast.start_date, Some(date(2026, 3, 2)));
        assert!(forecast.series[&key][0].is_stockout);
        assert_eq!(forecast.series[&key][1].visible_stock, 4.0);
    }

    #[test]
    fn test_duplicate_positions_are_summed() {
        let sim = simulator(2, true);
        let forecast = sim.simulate(
            &[
                StockPosition::new("0801", "100", 10.0),
                StockPosition::new("0801", "100", 15.0),
            ],
            &rates(&[("0801", "100", 5.0)]),
            &[],
        );
        assert_eq!(forecast.pair_count(), 1);
        assert_eq!(forecast.series[&PairKey::new("0801", "100")][0].visible_stock, 20.0);
    }
}
