// ==========================================
// 多节点补货计划系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod input;
pub mod manufacturing;
pub mod order;
pub mod policy;
pub mod stock;
pub mod types;

// 重导出核心类型
pub use input::PlanningInput;
pub use manufacturing::{
    AllocatedDelivery, AllocationKind, FactoryWeek, ItemMaster, ManufacturingOrder, WeekType,
};
pub use order::{OrderReportRow, ReplenishmentOrder};
pub use policy::{CoveragePolicy, PackagingSpec, PlanningPolicy};
pub use stock::{ForecastDay, ForecastRow, ScheduledDelivery, StockForecast, StockPosition};
pub use types::{DeliverySource, LoopPhase, PairKey, RunOutcome};
