// ==========================================
// 多节点补货计划系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite + CSV/Excel 快照
// 系统定位: 易腐品多节点补货计划（预测/补货收敛引擎）
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 收敛与调整规则
pub mod engine;

// 导入层 - 快照文件
pub mod importer;

// 配置层 - 运行参数
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// 服务层 - 计划运行与导出
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::{
    AllocatedDelivery, ForecastRow, ManufacturingOrder, OrderReportRow, PairKey, PlanningInput,
    ReplenishmentOrder, RunOutcome, StockForecast,
};

// 引擎
pub use engine::{ConvergenceOrchestrator, ConvergenceResult, StockSimulator};

// 服务
pub use api::{PlanningError, PlanningRequest, PlanningRunReport, PlanningService};

// 配置
pub use config::PlanningConfig;

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "多节点补货计划系统";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
