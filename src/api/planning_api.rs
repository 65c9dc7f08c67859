// ==========================================
// 多节点补货计划系统 - 计划服务 API
// ==========================================
// 职责: 读取输入 → 收敛引擎 → 富化 → (制造/分配) → 持久化
// 红线: 输入错误（空范围、库存/消耗缺失）直接失败,不产出部分计划
// 红线: 上限/中止为告警结果,不是失败
// ==========================================

use std::sync::Arc;

use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::api::error::{PlanningError, PlanningResult};
use crate::config::PlanningConfig;
use crate::domain::input::PlanningInput;
use crate::domain::manufacturing::{AllocatedDelivery, ManufacturingOrder};
use crate::domain::order::OrderReportRow;
use crate::domain::stock::ForecastRow;
use crate::domain::types::RunOutcome;
use crate::engine::enrichment::OrderEnricher;
use crate::engine::manufacturing::{cover_from_factory_stock, FactoryCalendar, ManufacturingPlanner};
use crate::engine::orchestrator::{ConvergenceOrchestrator, ConvergenceResult};
use crate::engine::reallocation::StockReallocator;
use crate::repository::data_source::{load_planning_input, PlanningDataSource, ScopeRequest};
use crate::repository::plan_result_repo::{PlanResultSink, PlanRunRecord};

// ==========================================
// 请求 / 结果
// ==========================================

/// 一次计划运行请求
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanningRequest {
    pub scope_id: String,
    pub config: PlanningConfig,
    pub with_manufacturing: bool, // 是否执行调拨/工厂直供/制造/分配
}

impl PlanningRequest {
    pub fn new(scope_id: impl Into<String>, config: PlanningConfig) -> Self {
        Self {
            scope_id: scope_id.into(),
            config,
            with_manufacturing: false,
        }
    }

    fn scope_request(&self) -> ScopeRequest {
        ScopeRequest {
            scope_id: self.scope_id.clone(),
            consumption_boost: self.config.consumption_boost,
            excluded_items: self.config.excluded_items.clone(),
        }
    }
}

/// 制造与分配结果
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManufacturingPlan {
    pub transfers: Vec<AllocatedDelivery>,               // 枢纽调拨（调入 + 调出）
    pub factory_stock_deliveries: Vec<AllocatedDelivery>, // 工厂库存直供
    pub manufacturing_orders: Vec<ManufacturingOrder>,
    pub allocations: Vec<AllocatedDelivery>, // 剩余库存 + 制造批次分配
    pub calendar_moved: usize,               // 被工厂日历移动的批次数
}

impl ManufacturingPlan {
    /// 全部分配结果（调拨 → 直供 → 批次分配）
    pub fn all_deliveries(&self) -> Vec<AllocatedDelivery> {
        self.transfers
            .iter()
            .chain(self.factory_stock_deliveries.iter())
            .chain(self.allocations.iter())
            .cloned()
            .collect()
    }
}

/// 计划运行报告
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanningRunReport {
    pub run_id: String,
    pub scope_id: String,
    pub outcome: RunOutcome,
    pub iterations: u32,
    pub warning: Option<String>,
    pub forecast: Vec<ForecastRow>,
    pub orders: Vec<OrderReportRow>,
    pub manufacturing: Option<ManufacturingPlan>,
}

impl PlanningRunReport {
    pub fn order_count(&self) -> usize {
        self.orders.len()
    }
}

// ==========================================
// PlanningService - 计划服务
// ==========================================
pub struct PlanningService {
    source: Arc<dyn PlanningDataSource>,
    sink: Option<Arc<dyn PlanResultSink>>,
}

impl PlanningService {
    /// # 参数
    /// - source: 计划数据源
    /// - sink: 结果输出（None 时不持久化）
    pub fn new(source: Arc<dyn PlanningDataSource>, sink: Option<Arc<dyn PlanResultSink>>) -> Self {
        Self { source, sink }
    }

    /// 执行一次计划运行
    ///
    /// # 返回
    /// - `Ok(report)`: 计划完成（可能带告警）
    /// - `Err(PlanningError)`: 参数无效、输入缺失或读写失败
    #[instrument(skip(self, request), fields(
        scope_id = %request.scope_id,
        boost = request.config.consumption_boost,
        with_manufacturing = request.with_manufacturing
    ))]
    pub async fn run(&self, request: &PlanningRequest) -> PlanningResult<PlanningRunReport> {
        if request.scope_id.trim().is_empty() {
            return Err(PlanningError::InvalidParameter("scope_id 不能为空".to_string()));
        }
        request.config.validate().map_err(PlanningError::InvalidParameter)?;

        let input = load_planning_input(self.source.as_ref(), &request.scope_request()).await?;
        let report = Self::plan(&request.config, &input, request.with_manufacturing)?;

        if let Some(sink) = &self.sink {
            let record = PlanRunRecord {
                run_id: report.run_id.clone(),
                scope_id: report.scope_id.clone(),
                outcome: report.outcome,
                iterations: report.iterations,
                order_count: report.order_count(),
                warning: report.warning.clone(),
                config_snapshot_json: Self::config_snapshot(&request.config),
                created_at: Local::now().naive_local(),
            };
            sink.save_run(&record, &report.forecast, &report.orders)?;
        }

        Ok(report)
    }

    /// 对已装配的输入执行计划（不涉及读写）
    pub fn plan(
        config: &PlanningConfig,
        input: &PlanningInput,
        with_manufacturing: bool,
    ) -> PlanningResult<PlanningRunReport> {
        Self::check_input(input)?;

        let convergence = ConvergenceOrchestrator::new(config).run(input);
        if let Some(message) = &convergence.warning {
            warn!(outcome = %convergence.outcome, %message, "计划结果带告警");
        }

        let enricher = OrderEnricher::new(input, &convergence.final_forecast);
        let orders = enricher.enrich_all(&convergence.orders);

        let manufacturing = if with_manufacturing {
            Some(Self::plan_manufacturing(config, input, &convergence))
        } else {
            None
        };

        let report = PlanningRunReport {
            run_id: Uuid::new_v4().to_string(),
            scope_id: input.scope_id.clone(),
            outcome: convergence.outcome,
            iterations: convergence.iterations,
            warning: convergence.warning.clone(),
            forecast: convergence.final_forecast.to_rows(),
            orders,
            manufacturing,
        };

        info!(
            run_id = %report.run_id,
            outcome = %report.outcome,
            iterations = report.iterations,
            order_count = report.order_count(),
            forecast_rows = report.forecast.len(),
            "计划运行完成"
        );
        Ok(report)
    }

    /// 运行参数快照（序列化失败时记录告警,运行照常保存）
    fn config_snapshot(config: &PlanningConfig) -> Option<String> {
        match serde_json::to_string(config) {
            Ok(json) => Some(json),
            Err(e) => {
                warn!(error = %e, "运行参数快照序列化失败");
                None
            }
        }
    }

    /// 输入校验: 空范围或库存/消耗完全缺失 → 致命错误
    fn check_input(input: &PlanningInput) -> PlanningResult<()> {
        if input.stock.is_empty() && input.consumption.is_empty() {
            return Err(PlanningError::EmptyScope(input.scope_id.clone()));
        }
        if input.stock.is_empty() {
            return Err(PlanningError::MissingReferenceData {
                scope_id: input.scope_id.clone(),
                missing: "stock".to_string(),
            });
        }
        if input.consumption.is_empty() {
            return Err(PlanningError::MissingReferenceData {
                scope_id: input.scope_id.clone(),
                missing: "consumption".to_string(),
            });
        }
        if input.pair_universe().is_empty() {
            return Err(PlanningError::EmptyScope(input.scope_id.clone()));
        }
        Ok(())
    }

    /// 制造流程: 枢纽调拨 → 工厂库存直供 → 生成批次 → 工厂日历校验 → 分配
    fn plan_manufacturing(
        config: &PlanningConfig,
        input: &PlanningInput,
        convergence: &ConvergenceResult,
    ) -> ManufacturingPlan {
        let reallocation = StockReallocator::new(config.hub_node.clone()).reallocate(
            &convergence.orders,
            &convergence.final_forecast,
            &input.consumption,
            &input.policy,
        );

        let cover = cover_from_factory_stock(&reallocation.remaining, &input.factory_stock);

        let planner = ManufacturingPlanner::new(config.production_lead_days, config.fallback_node.clone());
        let mut manufacturing_orders =
            planner.generate_orders(&cover.pending, &cover.remaining_stock, &input.items);

        let calendar_moved = FactoryCalendar::new(&input.factory_weeks, config.current_date())
            .validate(&mut manufacturing_orders, &input.items);

        let allocations = planner.allocate(&cover.pending, &cover.remaining_stock, &manufacturing_orders);

        info!(
            transfers = reallocation.transferred_count(),
            factory_stock_deliveries = cover.deliveries.len(),
            manufacturing_orders = manufacturing_orders.len(),
            calendar_moved,
            allocations = allocations.len(),
            "制造与分配完成"
        );

        ManufacturingPlan {
            transfers: reallocation.transfers,
            factory_stock_deliveries: cover.deliveries,
            manufacturing_orders,
            allocations,
            calendar_moved,
        }
    }
}
