// ==========================================
// 引擎集成测试
// ==========================================
// 职责: 验证推演 → 生成 → 日历 → 批量 → 收敛的协作
// 场景: 数值场景 + 不变式（非负、缺口、终止、单调、幂等、日历联动）
// ==========================================

mod helpers;

use chrono::{Datelike, Weekday};
use helpers::{date, test_config, PlanningInputBuilder};
use replenishment_planner::domain::types::{PairKey, RunOutcome};
use replenishment_planner::domain::ReplenishmentOrder;
use replenishment_planner::engine::{
    ConvergenceOrchestrator, LotSizeAdjuster, OrderGenerator, SimulationParams, StockSimulator,
    PALLET_ANNOTATION,
};

fn order(quantity: f64) -> ReplenishmentOrder {
    let d = date(2026, 3, 2);
    ReplenishmentOrder {
        key: PairKey::new("0801", "100"),
        load_date: d,
        delivery_date: d,
        quantity,
        stockout_date: d,
        annotations: Vec::new(),
        iteration: 1,
    }
}

// ==========================================
// 数值场景
// ==========================================

#[test]
fn test_sufficient_stock_produces_no_orders() {
    let input = PlanningInputBuilder::new("S1")
        .pair("0801", "100", 100.0, 10.0)
        .coverage("0801", 7, 2)
        .build();

    let result = ConvergenceOrchestrator::new(&test_config(10)).run(&input);

    assert_eq!(result.outcome, RunOutcome::Converged);
    assert!(result.orders.is_empty());
    let days = &result.final_forecast.series[&PairKey::new("0801", "100")];
    assert_eq!(days.len(), 10);
    assert_eq!(days.last().unwrap().visible_stock, 0.0);
    assert!(days.iter().all(|d| !d.is_stockout));
}

#[test]
fn test_first_order_lands_on_day_one_with_covering_quantity() {
    // 库存 20、日耗 10: 第 3 天（周三）断货,提前安全天数 2 → 第 1 天
    let input = PlanningInputBuilder::new("S1")
        .pair("0801", "100", 20.0, 10.0)
        .coverage("0801", 7, 2)
        .build();

    let result = ConvergenceOrchestrator::new(&test_config(30)).run(&input);

    let first = &result.orders[0];
    assert_eq!(first.iteration, 1);
    assert_eq!(first.stockout_date, date(2026, 3, 4));
    assert_eq!(first.load_date, date(2026, 3, 2));
    assert_eq!(first.delivery_date, date(2026, 3, 2));
    assert_eq!(first.quantity, 50.0);
    assert_eq!(result.outcome, RunOutcome::Converged);
}

#[test]
fn test_slow_rotation_rounds_to_case() {
    let input = PlanningInputBuilder::new("S1")
        .packaging("100", Some(12.0), Some(120.0))
        .rotation("0801", "100", 15.0)
        .build();
    let mut orders = vec![order(37.0)];

    let summary = LotSizeAdjuster::new(11.0).adjust(&mut orders, &input.policy);

    assert_eq!(orders[0].quantity, 48.0);
    assert_eq!(summary.case_rounded, 1);
    assert!(orders[0].annotations.is_empty());
}

#[test]
fn test_fast_rotation_rounds_to_pallet() {
    let input = PlanningInputBuilder::new("S1")
        .packaging("100", Some(12.0), Some(120.0))
        .rotation("0801", "100", 5.0)
        .build();
    let mut orders = vec![order(37.0)];

    LotSizeAdjuster::new(11.0).adjust(&mut orders, &input.policy);

    assert_eq!(orders[0].quantity, 120.0);
    assert_eq!(orders[0].annotations, vec![PALLET_ANNOTATION.to_string()]);
}

// ==========================================
// 不变式
// ==========================================

#[test]
fn test_clamped_forecast_is_never_negative() {
    let input = PlanningInputBuilder::new("S1")
        .pair("0801", "100", 5.0, 10.0)
        .pair("2801", "200", 0.0, 4.0)
        .build();

    // 目标天数为 0: 无单可生成,断货保留在推演中
    let result = ConvergenceOrchestrator::new(&test_config(20)).run(&input);

    assert_eq!(result.outcome, RunOutcome::Aborted);
    for days in result.final_forecast.series.values() {
        assert!(days.iter().all(|d| d.visible_stock >= 0.0));
    }
}

#[test]
fn test_unclamped_deficit_matches_negative_stock() {
    let simulator = StockSimulator::new(SimulationParams {
        horizon_days: 15,
        clamp_to_zero: false,
        today: date(2026, 3, 2),
    });
    let input = PlanningInputBuilder::new("S1").pair("0801", "100", 25.0, 7.0).build();

    let forecast = simulator.simulate(&input.stock, &input.consumption, &[]);

    for day in &forecast.series[&PairKey::new("0801", "100")] {
        assert!((day.deficit - (-day.visible_stock).max(0.0)).abs() < 1e-9);
        assert_eq!(day.is_stockout, day.deficit > 0.0);
    }
}

#[test]
fn test_loop_stops_at_iteration_cap() {
    let input = PlanningInputBuilder::new("S1")
        .pair("0801", "100", 0.0, 10.0)
        .coverage("0801", 1, 0)
        .build();
    let mut config = test_config(30);
    config.max_iterations = 3;

    let result = ConvergenceOrchestrator::new(&config).run(&input);

    assert_eq!(result.outcome, RunOutcome::IterationCapReached);
    assert_eq!(result.iterations, 3);
    assert_eq!(result.orders.len(), 3);
    assert!(result.warning.is_some());
    assert!(result.final_forecast.has_stockout());
}

#[test]
fn test_order_quantity_is_monotone_in_target_days() {
    let simulator = StockSimulator::new(SimulationParams {
        horizon_days: 30,
        clamp_to_zero: true,
        today: date(2026, 3, 2),
    });

    let mut previous = 0.0;
    for target in [2, 3, 5, 7, 10, 14] {
        let input = PlanningInputBuilder::new("S1")
            .pair("0801", "100", 20.0, 6.5)
            .coverage("0801", target, 1)
            .build();
        let forecast = simulator.simulate(&input.stock, &input.consumption, &[]);
        let orders = OrderGenerator::new().generate(&forecast, &input.consumption, &input.policy, 1);

        assert_eq!(orders.len(), 1);
        assert!(orders[0].quantity >= previous, "target {}", target);
        previous = orders[0].quantity;
    }
}

#[test]
fn test_lot_size_adjustment_is_idempotent() {
    let input = PlanningInputBuilder::new("S1")
        .packaging("100", Some(12.0), Some(120.0))
        .rotation("0801", "100", 15.0)
        .build();
    let adjuster = LotSizeAdjuster::new(11.0);

    for quantity in [1.0, 37.0, 48.0, 119.0, 250.0] {
        let mut orders = vec![order(quantity)];
        adjuster.adjust(&mut orders, &input.policy);
        let once = orders[0].quantity;
        adjuster.adjust(&mut orders, &input.policy);
        assert_eq!(orders[0].quantity, once, "quantity {}", quantity);
    }
}

#[test]
fn test_calendar_pull_back_recomputes_quantity() {
    // 库存 70、日耗 10: 2026-03-09（周一）断货; 安全天数 0
    // 提前到上周三 2026-03-04,提前 5 天 → 调整天数 max(1, 7 - 5) = 2
    let input = PlanningInputBuilder::new("S1")
        .pair("0801", "100", 70.0, 10.0)
        .coverage("0801", 7, 0)
        .build();

    let result = ConvergenceOrchestrator::new(&test_config(30)).run(&input);

    let first = &result.orders[0];
    assert_eq!(first.stockout_date, date(2026, 3, 9));
    assert_eq!(first.load_date, date(2026, 3, 4));
    assert_eq!(first.load_date.weekday(), Weekday::Wed);
    assert_eq!(first.delivery_date, first.load_date);
    assert_eq!(first.quantity, 20.0);
    assert!(first.annotations[0].starts_with("calendar:"));
}

#[test]
fn test_pending_delivery_postpones_stockout() {
    use replenishment_planner::domain::types::DeliverySource;
    use replenishment_planner::domain::ScheduledDelivery;

    let mut input = PlanningInputBuilder::new("S1")
        .pair("0801", "100", 20.0, 10.0)
        .coverage("0801", 7, 2)
        .build();
    input.pending_deliveries.push(ScheduledDelivery::new(
        PairKey::new("0801", "100"),
        date(2026, 3, 3),
        100.0,
        DeliverySource::PendingPurchase,
    ));

    let result = ConvergenceOrchestrator::new(&test_config(10)).run(&input);

    assert_eq!(result.outcome, RunOutcome::Converged);
    assert!(result.orders.is_empty());
}
