// ==========================================
// 多节点补货计划系统 - 服务层错误类型
// ==========================================
// 职责: 定义计划服务错误,转换仓储/导入错误为可读消息
// 规则: 输入错误为致命错误,不产出部分计划
// ==========================================

use crate::importer::error::ImportError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 计划服务错误类型
#[derive(Error, Debug)]
pub enum PlanningError {
    // ==========================================
    // 输入错误（致命）
    // ==========================================
    /// 范围内没有任何 (节点, 物料) 组合
    #[error("范围内无可计划的组合: scope_id={0}")]
    EmptyScope(String),

    /// 库存或消耗数据完全缺失
    #[error("参考数据缺失: scope_id={scope_id}, 缺失={missing}")]
    MissingReferenceData { scope_id: String, missing: String },

    #[error("参数无效: {0}")]
    InvalidParameter(String),

    // ==========================================
    // 下层错误
    // ==========================================
    #[error("数据访问失败: {0}")]
    Repository(#[from] RepositoryError),

    #[error("导入失败: {0}")]
    Import(#[from] ImportError),

    #[error("输出失败: {0}")]
    Export(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<std::io::Error> for PlanningError {
    fn from(err: std::io::Error) -> Self {
        PlanningError::Export(err.to_string())
    }
}

impl From<csv::Error> for PlanningError {
    fn from(err: csv::Error) -> Self {
        PlanningError::Export(err.to_string())
    }
}

/// Result 类型别名
pub type PlanningResult<T> = Result<T, PlanningError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_error_is_wrapped() {
        let err: PlanningError = RepositoryError::LockError("poisoned".to_string()).into();
        assert!(matches!(err, PlanningError::Repository(_)));
        assert!(err.to_string().contains("poisoned"));
    }

    #[test]
    fn test_missing_reference_message() {
        let err = PlanningError::MissingReferenceData {
            scope_id: "S1".to_string(),
            missing: "consumption".to_string(),
        };
        assert!(err.to_string().contains("consumption"));
    }
}
