// ==========================================
// 多节点补货计划系统 - 领域类型定义
// ==========================================
// 职责: 复合主键 (节点, 物料)、收敛循环状态、运行结果
// 红线: 不含引擎逻辑
// ==========================================

use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// PairKey - (节点, 物料) 复合主键
// ==========================================
// 用途: 替代字符串拼接键,所有按对维护的状态都以此为键
// 排序: 先节点后物料,保证输出顺序稳定
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PairKey {
    pub node: String, // 节点代码（配送中心/工厂）
    pub item: String, // 物料代码
}

impl PairKey {
    pub fn new(node: impl Into<String>, item: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            item: item.into(),
        }
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.node, self.item)
    }
}

// ==========================================
// 收敛循环阶段 (Loop Phase)
// ==========================================
// 状态机: Simulating → Detecting → Generating → Adjusting → Simulating ...
// 终态: Converged / Aborted（迭代上限由 RunOutcome 表达）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoopPhase {
    Simulating, // 推演库存
    Detecting,  // 检测断货
    Generating, // 生成补货单
    Adjusting,  // 物流日历 + 包装批量调整
    Converged,  // 无断货
    Aborted,    // 有断货但无法生成补货单
}

impl LoopPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, LoopPhase::Converged | LoopPhase::Aborted)
    }
}

impl fmt::Display for LoopPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoopPhase::Simulating => write!(f, "SIMULATING"),
            LoopPhase::Detecting => write!(f, "DETECTING"),
            LoopPhase::Generating => write!(f, "GENERATING"),
            LoopPhase::Adjusting => write!(f, "ADJUSTING"),
            LoopPhase::Converged => write!(f, "CONVERGED"),
            LoopPhase::Aborted => write!(f, "ABORTED"),
        }
    }
}

// ==========================================
// 运行结果 (Run Outcome)
// ==========================================
// 序列化格式: SCREAMING_SNAKE_CASE (与结果表一致)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunOutcome {
    Converged,           // 完全收敛（可能 0 单）
    Aborted,             // 部分计划：存在无法覆盖的断货
    IterationCapReached, // 达到迭代上限仍有断货（告警,非失败）
}

impl RunOutcome {
    /// 是否需要在结果中附带告警
    pub fn is_warning(&self) -> bool {
        !matches!(self, RunOutcome::Converged)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunOutcome::Converged => "CONVERGED",
            RunOutcome::Aborted => "ABORTED",
            RunOutcome::IterationCapReached => "ITERATION_CAP_REACHED",
        }
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==========================================
// 到货来源 (Delivery Source)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliverySource {
    PendingPurchase, // 外部在途采购单
    PlannedOrder,    // 本次运行生成的补货单
    Transfer,        // 节点间调拨（可为负数）
}

impl fmt::Display for DeliverySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliverySource::PendingPurchase => write!(f, "PENDING_PURCHASE"),
            DeliverySource::PlannedOrder => write!(f, "PLANNED_ORDER"),
            DeliverySource::Transfer => write!(f, "TRANSFER"),
        }
    }
}

// ==========================================
// 星期索引换算
// ==========================================
// 约定: 0=周一 ... 6=周日
pub fn weekday_from_index(index: u32) -> Option<Weekday> {
    match index {
        0 => Some(Weekday::Mon),
        1 => Some(Weekday::Tue),
        2 => Some(Weekday::Wed),
        3 => Some(Weekday::Thu),
        4 => Some(Weekday::Fri),
        5 => Some(Weekday::Sat),
        6 => Some(Weekday::Sun),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_key_ordering_is_node_then_item() {
        let mut keys = vec![
            PairKey::new("2801", "100"),
            PairKey::new("0801", "200"),
            PairKey::new("0801", "100"),
        ];
        keys.sort();
        assert_eq!(keys[0], PairKey::new("0801", "100"));
        assert_eq!(keys[1], PairKey::new("0801", "200"));
        assert_eq!(keys[2], PairKey::new("2801", "100"));
        assert_eq!(keys[2].to_string(), "2801/100");
    }

    #[test]
    fn test_weekday_index() {
        assert_eq!(weekday_from_index(0), Some(Weekday::Mon));
        assert_eq!(weekday_from_index(2), Some(Weekday::Wed));
        assert_eq!(weekday_from_index(7), None);
    }

    #[test]
    fn test_outcome_warning_flag() {
        assert!(!RunOutcome::Converged.is_warning());
        assert!(RunOutcome::Aborted.is_warning());
        assert!(RunOutcome::IterationCapReached.is_warning());
        assert_eq!(
            serde_json::to_string(&RunOutcome::IterationCapReached).unwrap(),
            "\"ITERATION_CAP_REACHED\""
        );
    }
}
