// ==========================================
// 测试数据构建器 - 用于集成测试
// ==========================================

use chrono::NaiveDate;
use replenishment_planner::config::PlanningConfig;
use replenishment_planner::domain::policy::PlanningPolicy;
use replenishment_planner::domain::types::PairKey;
use replenishment_planner::domain::PlanningInput;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// 固定运行日期的计划参数（2026-03-02 为周一）
pub fn test_config(horizon_days: u32) -> PlanningConfig {
    PlanningConfig {
        horizon_days,
        today: Some(date(2026, 3, 2)),
        ..PlanningConfig::default()
    }
}

// ==========================================
// PlanningInput 构建器
// ==========================================

pub struct PlanningInputBuilder {
    input: PlanningInput,
    policy: PlanningPolicy,
}

impl PlanningInputBuilder {
    pub fn new(scope_id: &str) -> Self {
        Self {
            input: PlanningInput::new(scope_id),
            policy: PlanningPolicy::default(),
        }
    }

    /// 添加 (节点, 物料) 组合: 期初库存 + 日均消耗
    pub fn pair(mut self, node: &str, item: &str, on_hand: f64, rate: f64) -> Self {
        self.input = self.input.with_stock(node, item, on_hand).with_rate(node, item, rate);
        self.input
            .baseline_consumption
            .insert(PairKey::new(node, item), rate);
        self
    }

    pub fn coverage(mut self, node: &str, target_days: i32, safety_days: i32) -> Self {
        self.policy = self.policy.with_coverage(node, target_days, safety_days);
        self
    }

    pub fn packaging(mut self, item: &str, case_size: Option<f64>, pallet_size: Option<f64>) -> Self {
        self.policy = self.policy.with_packaging(item, case_size, pallet_size);
        self
    }

    pub fn rotation(mut self, node: &str, item: &str, days_per_pallet: f64) -> Self {
        self.policy = self.policy.with_rotation(PairKey::new(node, item), days_per_pallet);
        self
    }

    pub fn build(self) -> PlanningInput {
        self.input.with_policy(self.policy)
    }
}
