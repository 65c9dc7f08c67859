// ==========================================
// 多节点补货计划系统 - 策略参数领域模型
// ==========================================
// 职责: 覆盖天数/安全天数、包装规格、周转指标
// 红线: 缺失策略按本地默认处理,不报错
// ==========================================

use crate::domain::types::PairKey;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ==========================================
// CoveragePolicy - 覆盖策略（按节点下发,作用于节点内所有物料）
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CoveragePolicy {
    pub target_days: i32, // 目标覆盖天数
    pub safety_days: i32, // 安全天数
}

impl CoveragePolicy {
    pub fn new(target_days: i32, safety_days: i32) -> Self {
        Self {
            target_days,
            safety_days,
        }
    }

    /// 补货覆盖天数 = max(0, 目标 - 安全)
    pub fn covering_days(&self) -> i32 {
        (self.target_days - self.safety_days).max(0)
    }
}

// ==========================================
// PackagingSpec - 物料包装规格
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PackagingSpec {
    pub case_size: Option<f64>,   // 每层/箱数量
    pub pallet_size: Option<f64>, // 每托数量
}

// ==========================================
// PlanningPolicy - 一次运行的全部策略参数
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanningPolicy {
    pub node_coverage: HashMap<String, CoveragePolicy>,
    pub packaging: HashMap<String, PackagingSpec>,
    pub rotation_days: HashMap<PairKey, f64>, // 一托对应的库存天数
}

impl PlanningPolicy {
    /// 读取覆盖策略（缺失时目标/安全均为 0）
    pub fn coverage_for(&self, key: &PairKey) -> CoveragePolicy {
        self.node_coverage
            .get(&key.node)
            .copied()
            .unwrap_or_default()
    }

    /// 显式配置的目标天数（未配置返回 None）
    pub fn target_days(&self, key: &PairKey) -> Option<i32> {
        self.node_coverage.get(&key.node).map(|c| c.target_days)
    }

    pub fn packaging_for(&self, item: &str) -> Option<&PackagingSpec> {
        self.packaging.get(item)
    }

    pub fn rotation_for(&self, key: &PairKey) -> Option<f64> {
        self.rotation_days.get(key).copied()
    }

    pub fn with_coverage(mut self, node: &str, target_days: i32, safety_days: i32) -> Self {
        self.node_coverage
            .insert(node.to_string(), CoveragePolicy::new(target_days, safety_days));
        self
    }

    pub fn with_packaging(mut self, item: &str, case_size: Option<f64>, pallet_size: Option<f64>) -> Self {
        self.packaging.insert(
            item.to_string(),
            PackagingSpec {
                case_size,
                pallet_size,
            },
        );
        self
    }

    pub fn with_rotation(mut self, key: PairKey, days: f64) -> Self {
        self.rotation_days.insert(key, days);
        self
    }
}
