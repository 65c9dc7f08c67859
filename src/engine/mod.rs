// ==========================================
// 多节点补货计划系统 - 引擎层
// ==========================================
// 职责: 推演 / 生成 / 日历调整 / 批量调整 / 收敛编排 / 制造分配
// 红线: 引擎不做 I/O,不拼 SQL; 单线程同步执行
// ==========================================

pub mod calendar;
pub mod enrichment;
pub mod lot_size;
pub mod manufacturing;
pub mod order_generator;
pub mod orchestrator;
pub mod reallocation;
pub mod simulator;

// 重导出核心引擎
pub use calendar::LogisticsCalendarAdjuster;
pub use enrichment::OrderEnricher;
pub use lot_size::{round_up_to_multiple, LotRule, LotSizeAdjuster, LotSizeSummary, PALLET_ANNOTATION};
pub use manufacturing::{cover_from_factory_stock, FactoryCalendar, FactoryStockCover, ManufacturingPlanner};
pub use order_generator::OrderGenerator;
pub use orchestrator::{ConvergenceOrchestrator, ConvergenceResult};
pub use reallocation::{ReallocationResult, StockReallocator};
pub use simulator::{SimulationParams, StockSimulator};
