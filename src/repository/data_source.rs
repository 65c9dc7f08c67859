// ==========================================
// 多节点补货计划系统 - 计划数据源接口
// ==========================================
// 职责: 定义一次计划运行所需的全部外部输入的读取接口
// 红线: 消耗加成、物料排除、原始库存口径均由数据源负责,引擎不感知
// 并发: 各读取互不依赖,由 load_planning_input 并发等待
// ==========================================

use crate::domain::input::PlanningInput;
use crate::domain::manufacturing::{FactoryWeek, ItemMaster};
use crate::domain::policy::{CoveragePolicy, PackagingSpec, PlanningPolicy};
use crate::domain::stock::{ScheduledDelivery, StockPosition};
use crate::domain::types::PairKey;
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{info, instrument};

// ==========================================
// ScopeRequest - 数据范围请求
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScopeRequest {
    pub scope_id: String,            // 范围（供应商/计划组）
    pub consumption_boost: f64,      // 消耗加成（0.15 = +15%）
    pub excluded_items: Vec<String>, // 排除物料
}

impl ScopeRequest {
    pub fn new(scope_id: impl Into<String>) -> Self {
        Self {
            scope_id: scope_id.into(),
            ..Default::default()
        }
    }

    /// 加成后的日均消耗
    pub fn boosted(&self, rate: f64) -> f64 {
        rate * (1.0 + self.consumption_boost)
    }

    pub fn excluded_set(&self) -> HashSet<&str> {
        self.excluded_items.iter().map(String::as_str).collect()
    }

    pub fn is_excluded(&self, item: &str) -> bool {
        self.excluded_items.iter().any(|x| x == item)
    }
}

// ==========================================
// ConsumptionRates - 日均消耗（加成前后）
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct ConsumptionRates {
    pub adjusted: HashMap<PairKey, f64>,
    pub baseline: HashMap<PairKey, f64>,
}

impl ConsumptionRates {
    /// 由未加成消耗构建（负数视为 0）
    pub fn from_baseline(baseline: HashMap<PairKey, f64>, request: &ScopeRequest) -> Self {
        let baseline: HashMap<PairKey, f64> = baseline
            .into_iter()
            .filter(|(k, _)| !request.is_excluded(&k.item))
            .map(|(k, v)| (k, v.max(0.0)))
            .collect();
        let adjusted = baseline
            .iter()
            .map(|(k, v)| (k.clone(), request.boosted(*v)))
            .collect();
        Self { adjusted, baseline }
    }
}

// ==========================================
// PlanningDataSource Trait
// ==========================================
#[async_trait]
pub trait PlanningDataSource: Send + Sync {
    /// 期初库存（已按排除清单过滤）
    async fn load_stock(&self, request: &ScopeRequest) -> RepositoryResult<Vec<StockPosition>>;

    /// 日均消耗（已加成）
    async fn load_consumption(&self, request: &ScopeRequest) -> RepositoryResult<ConsumptionRates>;

    /// 节点覆盖策略（目标天数/安全天数）
    async fn load_node_policies(
        &self,
        request: &ScopeRequest,
    ) -> RepositoryResult<HashMap<String, CoveragePolicy>>;

    /// 物料包装规格
    async fn load_packaging(&self, request: &ScopeRequest) -> RepositoryResult<HashMap<String, PackagingSpec>>;

    /// 周转指标（一托对应库存天数）
    async fn load_rotation(&self, request: &ScopeRequest) -> RepositoryResult<HashMap<PairKey, f64>>;

    /// 物料主数据（最小批量/单价/工作中心）
    async fn load_item_master(&self, request: &ScopeRequest) -> RepositoryResult<HashMap<String, ItemMaster>>;

    /// 工厂库存
    async fn load_factory_stock(&self, request: &ScopeRequest) -> RepositoryResult<HashMap<String, f64>>;

    /// 外部在途
    async fn load_pending_deliveries(&self, request: &ScopeRequest)
        -> RepositoryResult<Vec<ScheduledDelivery>>;

    /// 工厂生产周日历
    async fn load_factory_calendar(&self, request: &ScopeRequest) -> RepositoryResult<Vec<FactoryWeek>>;
}

/// 装配计划输入（并发读取全部数据）
#[instrument(skip(source, request), fields(scope_id = %request.scope_id))]
pub async fn load_planning_input<S>(source: &S, request: &ScopeRequest) -> RepositoryResult<PlanningInput>
where
    S: PlanningDataSource + ?Sized,
{
    let (stock, rates, node_coverage, packaging, rotation_days, items, factory_stock, pending, weeks) =
        futures::try_join!(
            source.load_stock(request),
            source.load_consumption(request),
            source.load_node_policies(request),
            source.load_packaging(request),
            source.load_rotation(request),
            source.load_item_master(request),
            source.load_factory_stock(request),
            source.load_pending_deliveries(request),
            source.load_factory_calendar(request),
        )?;

    info!(
        stock_rows = stock.len(),
        consumption_rows = rates.adjusted.len(),
        node_policies = node_coverage.len(),
        pending_deliveries = pending.len(),
        "计划输入已装配"
    );

    Ok(PlanningInput {
        scope_id: request.scope_id.clone(),
        stock,
        consumption: rates.adjusted,
        baseline_consumption: rates.baseline,
        pending_deliveries: pending,
        policy: PlanningPolicy {
            node_coverage,
            packaging,
            rotation_days,
        },
        items,
        factory_stock,
        factory_weeks: weeks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boost_and_exclusion() {
        let request = ScopeRequest {
            scope_id: "S1".to_string(),
            consumption_boost: 0.15,
            excluded_items: vec!["999".to_string()],
        };
        let baseline = HashMap::from([
            (PairKey::new("0801", "100"), 20.0),
            (PairKey::new("0801", "999"), 5.0),
            (PairKey::new("2801", "100"), -3.0),
        ]);

        let rates = ConsumptionRates::from_baseline(baseline, &request);
        assert_eq!(rates.baseline.len(), 2);
        assert!((rates.adjusted[&PairKey::new("0801", "100")] - 23.0).abs() < 1e-9);
        assert_eq!(rates.adjusted[&PairKey::new("2801", "100")], 0.0);
        assert!(request.is_excluded("999"));
    }
}
