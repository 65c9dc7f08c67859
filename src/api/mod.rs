// ==========================================
// 多节点补货计划系统 - 服务层
// ==========================================
// 职责: 提供计划运行与结果导出接口,供命令行调用
// ==========================================

pub mod error;
pub mod export;
pub mod planning_api;

// 重导出核心类型
pub use error::{PlanningError, PlanningResult};
pub use export::export_report;
pub use planning_api::{ManufacturingPlan, PlanningRequest, PlanningRunReport, PlanningService};
