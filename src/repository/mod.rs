// ==========================================
// 多节点补货计划系统 - 数据仓储层
// ==========================================
// 职责: 读取计划输入、持久化计划结果,屏蔽数据库细节
// 红线: Repository 不含业务逻辑
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod data_source;
pub mod error;
pub mod plan_result_repo;
pub mod sqlite_source;

// 重导出核心仓储
pub use data_source::{load_planning_input, ConsumptionRates, PlanningDataSource, ScopeRequest};
pub use error::{RepositoryError, RepositoryResult};
pub use plan_result_repo::{PlanResultRepository, PlanResultSink, PlanRunRecord};
pub use sqlite_source::SqlitePlanningSource;
