// ==========================================
// 多节点补货计划系统 - 包装批量调整
// ==========================================
// 职责: 将补货数量向上取整到整托或整箱
// 规则 (优先级从高到低):
// 1. 每托数量 > 0 且 周转天数 < 快周转阈值 → 整托,追加备注
// 2. 每箱数量 > 0 → 整箱,不追加备注
// 3. 否则不变
// 红线: 数量 <= 0 原样通过; 幂等
// ==========================================

use crate::domain::order::ReplenishmentOrder;
use crate::domain::policy::PlanningPolicy;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// 整托取整备注
pub const PALLET_ANNOTATION: &str = "rounded to pallet";

/// 浮点容差（避免 48.000000001 被取整到下一个倍数）
const ROUNDING_EPSILON: f64 = 1e-9;

/// 向上取整到 multiple 的整数倍
pub fn round_up_to_multiple(quantity: f64, multiple: f64) -> f64 {
    if multiple <= 0.0 {
        return quantity;
    }
    ((quantity / multiple) - ROUNDING_EPSILON).ceil() * multiple
}

// ==========================================
// LotRule - 实际采用的取整规则
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LotRule {
    Pallet,
    Case,
    Unchanged,
}

// ==========================================
// LotSizeSummary - 调整统计
// ==========================================
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LotSizeSummary {
    pub pallet_rounded: usize,
    pub case_rounded: usize,
    pub unchanged: usize,
}

// ==========================================
// LotSizeAdjuster - 包装批量调整器
// ==========================================
#[derive(Debug, Clone, Copy)]
pub struct LotSizeAdjuster {
    fast_rotation_days: f64,
}

impl LotSizeAdjuster {
    pub fn new(fast_rotation_days: f64) -> Self {
        Self { fast_rotation_days }
    }

    /// 判定单张补货单适用的规则
    pub fn rule_for(&self, order: &ReplenishmentOrder, policy: &PlanningPolicy) -> LotRule {
        if order.quantity <= 0.0 {
            return LotRule::Unchanged;
        }
        let Some(spec) = policy.packaging_for(&order.key.item) else {
            return LotRule::Unchanged;
        };

        let pallet = spec.pallet_size.unwrap_or(0.0);
        let fast = policy
            .rotation_for(&order.key)
            .map(|days| days < self.fast_rotation_days)
            .unwrap_or(false);

        if pallet > 0.0 && fast {
            LotRule::Pallet
        } else if spec.case_size.unwrap_or(0.0) > 0.0 {
            LotRule::Case
        } else {
            LotRule::Unchanged
        }
    }

    /// 调整补货单数量（原地修改）
    pub fn adjust(&self, orders: &mut [ReplenishmentOrder], policy: &PlanningPolicy) -> LotSizeSummary {
        let mut summary = LotSizeSummary::default();

        for order in orders.iter_mut() {
            let rule = self.rule_for(order, policy);
            let spec = policy.packaging_for(&order.key.item).copied().unwrap_or_default();

            match rule {
                LotRule::Pallet => {
                    let pallet = spec.pallet_size.unwrap_or(0.0);
                    order.quantity = round_up_to_multiple(order.quantity, pallet);
                    order.annotate(PALLET_ANNOTATION);
                    summary.pallet_rounded += 1;
                }
                LotRule::Case => {
                    let case = spec.case_size.unwrap_or(0.0);
                    order.quantity = round_up_to_multiple(order.quantity, case);
                    summary.case_rounded += 1;
                }
                LotRule::Unchanged => summary.unchanged += 1,
            }
        }

        debug!(
            pallet_rounded = summary.pallet_rounded,
            case_rounded = summary.case_rounded,
            unchanged = summary.unchanged,
            "包装批量调整完成"
        );
        summary
    }
}
