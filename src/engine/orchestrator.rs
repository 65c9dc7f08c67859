// ==========================================
// 多节点补货计划系统 - 收敛编排器
// ==========================================
// 职责: 推演 → 检测断货 → 生成补货单 → 日历/批量调整 → 并入到货 → 再推演
// 状态机: Simulating → Detecting → Generating → Adjusting → Simulating ...
// 终止: 无断货(Converged) / 有断货但无单可生成(Aborted) / 达到迭代上限
// 红线: 单线程顺序执行; 到货与补货单只增不删; 每次运行独占累积状态
// ==========================================

use crate::config::PlanningConfig;
use crate::domain::input::PlanningInput;
use crate::domain::order::ReplenishmentOrder;
use crate::domain::stock::{ScheduledDelivery, StockForecast};
use crate::domain::types::{LoopPhase, RunOutcome};
use crate::engine::calendar::LogisticsCalendarAdjuster;
use crate::engine::lot_size::LotSizeAdjuster;
use crate::engine::order_generator::OrderGenerator;
use crate::engine::simulator::{SimulationParams, StockSimulator};
use chrono::Weekday;
use tracing::{debug, info, instrument, warn};

// ==========================================
// ConvergenceResult - 收敛结果
// ==========================================
#[derive(Debug, Clone)]
pub struct ConvergenceResult {
    pub outcome: RunOutcome,
    pub iterations: u32,                     // 实际执行的生成轮次
    pub orders: Vec<ReplenishmentOrder>,     // 累积补货单（按轮次、对有序）
    pub deliveries: Vec<ScheduledDelivery>,  // 全部到货（在途 + 补货单）
    pub final_forecast: StockForecast,       // 包含全部到货的最终推演
    pub phase_trace: Vec<LoopPhase>,         // 状态迁移轨迹
    pub warning: Option<String>,
}

impl ConvergenceResult {
    pub fn order_count(&self) -> usize {
        self.orders.len()
    }
}

// ==========================================
// ConvergenceOrchestrator - 收敛编排器
// ==========================================
pub struct ConvergenceOrchestrator {
    simulator: StockSimulator,
    generator: OrderGenerator,
    calendar: LogisticsCalendarAdjuster,
    lot_size: LotSizeAdjuster,
    max_iterations: u32,
}

impl ConvergenceOrchestrator {
    /// 创建编排器
    ///
    /// # 参数
    /// - config: 计划参数（调用方负责先 validate）
    pub fn new(config: &PlanningConfig) -> Self {
        let today = config.current_date();
        Self {
            simulator: StockSimulator::new(SimulationParams {
                horizon_days: config.horizon_days,
                clamp_to_zero: config.clamp_to_zero,
                today,
            }),
            generator: OrderGenerator::new(),
            calendar: LogisticsCalendarAdjuster::new(
                config.cutoff().unwrap_or(Weekday::Wed),
                config.pull_back_to().unwrap_or(Weekday::Wed),
                today,
            ),
            lot_size: LotSizeAdjuster::new(config.fast_rotation_days),
            max_iterations: config.max_iterations,
        }
    }

    /// 执行收敛循环
    ///
    /// # 参数
    /// - input: 计划输入（运行期间只读）
    ///
    /// # 返回
    /// 收敛结果（含终态、累积补货单、最终推演）
    #[instrument(skip(self, input), fields(
        scope_id = %input.scope_id,
        pair_count = input.stock.len(),
        max_iterations = self.max_iterations
    ))]
    pub fn run(&self, input: &PlanningInput) -> ConvergenceResult {
        // 推演窗口按初始输入确定,整个循环内不变
        let start = self
            .simulator
            .start_date(&input.stock, &input.pending_deliveries);
        let calendar = self.calendar.not_before(start);
        let mut deliveries: Vec<ScheduledDelivery> = input.pending_deliveries.clone();
        let mut orders: Vec<ReplenishmentOrder> = Vec::new();
        let mut batch: Vec<ReplenishmentOrder> = Vec::new();
        let mut forecast = StockForecast::default();
        let mut phase_trace = Vec::new();
        let mut iteration: u32 = 0;
        let mut phase = LoopPhase::Simulating;

        info!(start_date = %start, pending_deliveries = deliveries.len(), "开始收敛循环");

        let outcome = loop {
            phase_trace.push(phase);

            match phase {
                LoopPhase::Simulating => {
                    forecast =
                        self.simulator
                            .simulate_from(start, &input.stock, &input.consumption, &deliveries);
                    phase = LoopPhase::Detecting;
                }
                LoopPhase::Detecting => {
                    if !forecast.has_stockout() {
                        phase = LoopPhase::Converged;
                    } else if iteration >= self.max_iterations {
                        break RunOutcome::IterationCapReached;
                    } else {
                        iteration += 1;
                        debug!(
                            iteration,
                            stockout_days = forecast.stockout_day_count(),
                            "检测到断货"
                        );
                        phase = LoopPhase::Generating;
                    }
                }
                LoopPhase::Generating => {
                    batch = self.generator.generate(
                        &forecast,
                        &input.consumption,
                        &input.policy,
                        iteration,
                    );
                    phase = if batch.is_empty() {
                        LoopPhase::Aborted
                    } else {
                        LoopPhase::Adjusting
                    };
                }
                LoopPhase::Adjusting => {
                    let pulled_back = calendar.adjust(&mut batch, &input.consumption, &input.policy);
                    let lot_summary = self.lot_size.adjust(&mut batch, &input.policy);

                    debug!(
                        iteration,
                        order_count = batch.len(),
                        pulled_back,
                        pallet_rounded = lot_summary.pallet_rounded,
                        "本轮补货单已调整"
                    );

                    // 并入到货计划
                    deliveries.extend(batch.iter().map(ReplenishmentOrder::to_delivery));
                    orders.append(&mut batch);
                    phase = LoopPhase::Simulating;
                }
                LoopPhase::Converged => break RunOutcome::Converged,
                LoopPhase::Aborted => break RunOutcome::Aborted,
            }
        };

        let warning = match outcome {
            RunOutcome::Converged => None,
            RunOutcome::Aborted => Some(format!(
                "存在无法覆盖的断货（{} 个断货日），已返回部分计划",
                forecast.stockout_day_count()
            )),
            RunOutcome::IterationCapReached => Some(format!(
                "达到迭代上限 {} 仍有断货（{} 个断货日）",
                self.max_iterations,
                forecast.stockout_day_count()
            )),
        };

        if let Some(message) = &warning {
            warn!(outcome = %outcome, iterations = iteration, "{}", message);
        }

        info!(
            outcome = %outcome,
            iterations = iteration,
            order_count = orders.len(),
            "收敛循环结束"
        );

        ConvergenceResult {
            outcome,
            iterations: iteration,
            orders,
            deliveries,
            final_forecast: forecast,
            phase_trace,
            warning,
        }
    }
}
