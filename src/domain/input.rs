// ==========================================
// 多节点补货计划系统 - 计划输入
// ==========================================
// 职责: 一次计划运行的全部外部输入（由数据源装配）
// 红线: 运行期间只读
// ==========================================

use crate::domain::manufacturing::{FactoryWeek, ItemMaster};
use crate::domain::policy::PlanningPolicy;
use crate::domain::stock::{ScheduledDelivery, StockPosition};
use crate::domain::types::PairKey;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

// ==========================================
// PlanningInput - 计划输入
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanningInput {
    pub scope_id: String,

    // ===== 核心输入 =====
    pub stock: Vec<StockPosition>,
    pub consumption: HashMap<PairKey, f64>,          // 已加成的日均消耗
    pub baseline_consumption: HashMap<PairKey, f64>, // 未加成的日均消耗
    pub pending_deliveries: Vec<ScheduledDelivery>,  // 外部在途
    pub policy: PlanningPolicy,

    // ===== 制造相关 =====
    pub items: HashMap<String, ItemMaster>,
    pub factory_stock: HashMap<String, f64>,
    pub factory_weeks: Vec<FactoryWeek>,
}

impl PlanningInput {
    pub fn new(scope_id: impl Into<String>) -> Self {
        Self {
            scope_id: scope_id.into(),
            ..Default::default()
        }
    }

    /// 参与计划的 (节点, 物料) 全集（以期初库存为准）
    pub fn pair_universe(&self) -> BTreeSet<PairKey> {
        self.stock.iter().map(|s| s.key.clone()).collect()
    }

    pub fn unit_price_for(&self, item: &str) -> Option<f64> {
        self.items.get(item).and_then(|m| m.unit_price)
    }

    // ===== 构建辅助 =====

    pub fn with_stock(mut self, node: &str, item: &str, on_hand: f64) -> Self {
        self.stock.push(StockPosition::new(node, item, on_hand));
        self
    }

    pub fn with_rate(mut self, node: &str, item: &str, rate: f64) -> Self {
        self.consumption.insert(PairKey::new(node, item), rate);
        self
    }

    pub fn with_policy(mut self, policy: PlanningPolicy) -> Self {
        self.policy = policy;
        self
    }
}
