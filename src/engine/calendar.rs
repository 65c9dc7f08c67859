// ==========================================
// 多节点补货计划系统 - 物流日历调整
// ==========================================
// 职责: 断货日落在每周截止日之前的补货单,提前到上一周的固定发运日
// 规则:
// - 星期取自断货日（0=周一）
// - 星期 < 截止日 → 新日期 = 断货日 - (星期 + 7 - 目标星期),不早于下限日期
// - 下限日期 = max(今天, 推演首日)
// - 提前天数 = 原装车日 - 新日期; 提前天数 <= 0 的单保持不变
// - 调整天数 = max(1, 目标天数 - 提前天数); 数量 = 日均消耗 × 调整天数（包装取整由批量调整完成）
// - 提前天数 <= 安全天数时,重算数量不低于原覆盖量
// 红线: 只提前不延后; 备注只追加
// ==========================================

use crate::domain::order::ReplenishmentOrder;
use crate::domain::policy::PlanningPolicy;
use crate::domain::types::PairKey;
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use std::collections::HashMap;
use tracing::debug;

// ==========================================
// LogisticsCalendarAdjuster - 物流日历调整器
// ==========================================
#[derive(Debug, Clone, Copy)]
pub struct LogisticsCalendarAdjuster {
    cutoff: Weekday,
    pull_back_to: Weekday,
    earliest: NaiveDate,
}

impl LogisticsCalendarAdjuster {
    /// # 参数
    /// - cutoff: 截止星期（默认周三）
    /// - pull_back_to: 提前到上一周的星期几（默认周三）
    /// - today: 当前日期（新日期下限）
    pub fn new(cutoff: Weekday, pull_back_to: Weekday, today: NaiveDate) -> Self {
        Self {
            cutoff,
            pull_back_to,
            earliest: today,
        }
    }

    /// 抬高新日期下限（推演首日晚于今天时,提前后的单不能落在窗口之前）
    pub fn not_before(self, date: NaiveDate) -> Self {
        Self {
            earliest: self.earliest.max(date),
            ..self
        }
    }

    /// 计算提前后的日期
    ///
    /// # 返回
    /// - Some(date): 断货日在截止日之前,返回上一周目标星期（不早于下限日期）
    /// - None: 无需调整
    pub fn pull_back_date(&self, stockout_date: NaiveDate) -> Option<NaiveDate> {
        let weekday = stockout_date.weekday().num_days_from_monday();
        if weekday >= self.cutoff.num_days_from_monday() {
            return None;
        }

        let back_days = weekday as i64 + 7 - self.pull_back_to.num_days_from_monday() as i64;
        Some((stockout_date - Duration::days(back_days)).max(self.earliest))
    }

    /// 调整补货单（原地修改）
    ///
    /// # 参数
    /// - orders: 本轮补货单
    /// - consumption: 日均消耗（用于重算数量）
    /// - policy: 覆盖策略（用于读取目标天数）
    ///
    /// # 返回
    /// 被提前的补货单数量
    pub fn adjust(
        &self,
        orders: &mut [ReplenishmentOrder],
        consumption: &HashMap<PairKey, f64>,
        policy: &PlanningPolicy,
    ) -> usize {
        let mut adjusted = 0;

        for order in orders.iter_mut() {
            let Some(new_date) = self.pull_back_date(order.stockout_date) else {
                continue;
            };

            // 新日期不早于原装车日: 不延后,也不重算
            let days_advanced = (order.load_date - new_date).num_days();
            if days_advanced <= 0 {
                continue;
            }

            // 缺少日均消耗或目标天数时不重算
            let rate = consumption.get(&order.key).copied().unwrap_or(0.0);
            let Some(target_days) = policy.target_days(&order.key) else {
                debug!(pair = %order.key, "未配置目标天数，跳过日历调整");
                continue;
            };
            if rate <= 0.0 {
                continue;
            }

            let adjusted_days = (target_days as i64 - days_advanced).max(1);
            let old_quantity = order.quantity;
            let old_load = order.load_date;
            let new_quantity = rate * adjusted_days as f64;

            order.load_date = new_date;
            order.delivery_date = new_date;
            order.quantity = new_quantity;
            order.annotate(format!(
                "calendar: pulled back {} days from {} to {} (stockout {} {}), quantity {} -> {}",
                days_advanced,
                old_load,
                new_date,
                order.stockout_date,
                order.stockout_date.weekday(),
                old_quantity,
                new_quantity
            ));

            debug!(
                pair = %order.key,
                days_advanced,
                old_quantity,
                new_quantity,
                "补货单已按物流日历提前"
            );
            adjusted += 1;
        }

        adjusted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn order(load: NaiveDate, stockout: NaiveDate, quantity: f64) -> ReplenishmentOrder {
        ReplenishmentOrder {
            key: PairKey::new("0801", "100"),
            load_date: load,
            delivery_date: load,
            quantity,
            stockout_date: stockout,
            annotations: Vec::new(),
            iteration: 1,
        }
    }

    #[test]
    fn test_pull_back_date_targets_previous_wednesday() {
        // 2026-03-02 周一
        let adjuster = LogisticsCalendarAdjuster::new(Weekday::Wed, Weekday::Wed, date(2026, 1, 1));
        // 周二 03-10 → 上周三 03-04
        assert_eq!(adjuster.pull_back_date(date(2026, 3, 10)), Some(date(2026, 3, 4)));
        // 周一 03-09 → 03-04
        assert_eq!(adjuster.pull_back_date(date(2026, 3, 9)), Some(date(2026, 3, 4)));
        // 周三及之后不调整
        assert_eq!(adjuster.pull_back_date(date(2026, 3, 11)), None);
        assert_eq!(adjuster.pull_back_date(date(2026, 3, 14)), None);
    }

    #[test]
    fn test_pull_back_date_not_before_today() {
        let adjuster = LogisticsCalendarAdjuster::new(Weekday::Wed, Weekday::Wed, date(2026, 3, 6));
        assert_eq!(adjuster.pull_back_date(date(2026, 3, 10)), Some(date(2026, 3, 6)));
    }

    #[test]
    fn test_adjust_rescales_quantity_and_annotates() {
        let adjuster = LogisticsCalendarAdjuster::new(Weekday::Wed, Weekday::Wed, date(2026, 3, 2));
        let key = PairKey::new("0801", "100");
        let consumption = HashMap::from([(key, 10.0)]);
        let policy = PlanningPolicy::default().with_coverage("0801", 7, 0);

        // 断货日周二 03-10,装车日 03-10,提前到 03-04（6 天）
        let mut orders = vec![order(date(2026, 3, 10), date(2026, 3, 10), 70.0)];
        let count = adjuster.adjust(&mut orders, &consumption, &policy);

        assert_eq!(count, 1);
        assert_eq!(orders[0].load_date, date(2026, 3, 4));
        assert_eq!(orders[0].delivery_date, date(2026, 3, 4));
        assert_eq!(orders[0].quantity, 10.0); // max(1, 7-6) × 10
        assert_eq!(orders[0].annotations.len(), 1);
        assert!(orders[0].annotations[0].starts_with("calendar:"));
    }

    #[test]
    fn test_adjust_leaves_late_week_stockout_untouched() {
        let adjuster = LogisticsCalendarAdjuster::new(Weekday::Wed, Weekday::Wed, date(2026, 3, 2));
        let key = PairKey::new("0801", "100");
        let consumption = HashMap::from([(key, 10.0)]);
        let policy = PlanningPolicy::default().with_coverage("0801", 7, 0);

        let mut orders = vec![order(date(2026, 3, 12), date(2026, 3, 12), 70.0)];
        assert_eq!(adjuster.adjust(&mut orders, &consumption, &policy), 0);
        assert_eq!(orders[0].quantity, 70.0);
        assert!(orders[0].annotations.is_empty());
    }

    #[test]
    fn test_adjust_skips_when_target_missing() {
        let adjuster = LogisticsCalendarAdjuster::new(Weekday::Wed, Weekday::Wed, date(2026, 3, 2));
        let key = PairKey::new("0801", "100");
        let consumption = HashMap::from([(key, 10.0)]);

        let mut orders = vec![order(date(2026, 3, 10), date(2026, 3, 10), 70.0)];
        assert_eq!(adjuster.adjust(&mut orders, &consumption, &PlanningPolicy::default()), 0);
        assert_eq!(orders[0].load_date, date(2026, 3, 10));
    }

    #[test]
    fn test_adjust_keeps_fractional_quantity() {
        // 日耗 0.1、目标 7: 装车 03-08 提前到 03-04（4 天） → 0.1 × 3
        let adjuster = LogisticsCalendarAdjuster::new(Weekday::Wed, Weekday::Wed, date(2026, 3, 2));
        let key = PairKey::new("0801", "100");
        let consumption = HashMap::from([(key, 0.1)]);
        let policy = PlanningPolicy::default().with_coverage("0801", 7, 2);

        let mut orders = vec![order(date(2026, 3, 8), date(2026, 3, 10), 1.0)];
        assert_eq!(adjuster.adjust(&mut orders, &consumption, &policy), 1);
        assert_eq!(orders[0].load_date, date(2026, 3, 4));
        assert!((orders[0].quantity - 0.3).abs() < 1e-9);
        assert!(orders[0].quantity < 1.0);
    }

    #[test]
    fn test_adjust_skips_when_new_date_not_earlier() {
        let adjuster = LogisticsCalendarAdjuster::new(Weekday::Wed, Weekday::Wed, date(2026, 3, 2));
        let key = PairKey::new("0801", "100");
        let consumption = HashMap::from([(key, 10.0)]);
        let policy = PlanningPolicy::default().with_coverage("0801", 7, 6);

        // 装车日等于提前日期 03-04,以及早于提前日期的 03-03
        let mut orders = vec![
            order(date(2026, 3, 4), date(2026, 3, 10), 10.0),
            order(date(2026, 3, 3), date(2026, 3, 9), 10.0),
        ];
        assert_eq!(adjuster.adjust(&mut orders, &consumption, &policy), 0);
        assert_eq!(orders[0].load_date, date(2026, 3, 4));
        assert_eq!(orders[1].load_date, date(2026, 3, 3));
        assert!(orders.iter().all(|o| o.quantity == 10.0));
        assert!(orders.iter().all(|o| o.annotations.is_empty()));
    }

    #[test]
    fn test_not_before_raises_floor() {
        let adjuster = LogisticsCalendarAdjuster::new(Weekday::Wed, Weekday::Wed, date(2026, 3, 2));
        // 推演首日晚于今天
        let floored = adjuster.not_before(date(2026, 3, 6));
        assert_eq!(floored.pull_back_date(date(2026, 3, 10)), Some(date(2026, 3, 6)));
        // 早于今天的下限不生效
        let unchanged = adjuster.not_before(date(2026, 2, 1));
        assert_eq!(unchanged.pull_back_date(date(2026, 3, 10)), Some(date(2026, 3, 4)));
    }

    #[test]
    fn test_pull_back_quantity_rule_over_policy_grid() {
        // 补货单按生成规则构造: 装车日 = 断货日 - 安全天数, 数量 = ceil(日耗 × (目标 - 安全))
        let adjuster = LogisticsCalendarAdjuster::new(Weekday::Wed, Weekday::Wed, date(2026, 2, 23));
        let key = PairKey::new("0801", "100");

        for rate in [0.1, 2.5, 10.0] {
            let consumption = HashMap::from([(key.clone(), rate)]);
            for target in 1..=14_i64 {
                for safety in 0..target {
                    let policy = PlanningPolicy::default().with_coverage("0801", target as i32, safety as i32);
                    // 周一 03-09 至周日 03-15
                    for offset in 0..7 {
                        let stockout = date(2026, 3, 9) + Duration::days(offset);
                        let load = stockout - Duration::days(safety);
                        let quantity = (rate * (target - safety) as f64).ceil();
                        let mut orders = vec![order(load, stockout, quantity)];
                        adjuster.adjust(&mut orders, &consumption, &policy);
                        let adjusted = &orders[0];

                        let case = format!("rate {} target {} safety {} stockout {}", rate, target, safety, stockout);
                        let Some(new_date) = adjuster.pull_back_date(stockout) else {
                            assert_eq!(adjusted.load_date, load, "{}", case);
                            assert_eq!(adjusted.quantity, quantity, "{}", case);
                            continue;
                        };
                        let advanced = (load - new_date).num_days();
                        if advanced <= 0 {
                            assert_eq!(adjusted.load_date, load, "{}", case);
                            assert_eq!(adjusted.quantity, quantity, "{}", case);
                            continue;
                        }

                        let covered = (target - advanced).max(1);
                        assert_eq!(adjusted.load_date, new_date, "{}", case);
                        assert!(adjusted.load_date < load, "{}", case);
                        assert!((adjusted.quantity - rate * covered as f64).abs() < 1e-9, "{}", case);
                        // 重算天数少于原覆盖天数时数量严格下降
                        if covered < target - safety {
                            assert!(adjusted.quantity < quantity, "{}", case);
                        }
                        // 提前天数不超过安全天数时不会下降
                        if advanced <= safety {
                            assert!(adjusted.quantity >= rate * (target - safety) as f64 - 1e-9, "{}", case);
                        }
                    }
                }
            }
        }
    }
}
