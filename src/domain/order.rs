// ==========================================
// 多节点补货计划系统 - 补货单领域模型
// ==========================================
// 职责: 补货单实体 + 结果表输出行
// 红线: 备注只追加,不覆盖
// ==========================================

use crate::domain::stock::ScheduledDelivery;
use crate::domain::types::{DeliverySource, PairKey};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 备注拼接分隔符
pub const ANNOTATION_SEPARATOR: &str = "; ";

// ==========================================
// ReplenishmentOrder - 补货单
// ==========================================
// 生命周期: 生成器创建 → 日历调整(日期+数量) → 批量调整(数量) → 并入到货计划
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplenishmentOrder {
    pub key: PairKey,
    pub load_date: NaiveDate,     // 装车日期
    pub delivery_date: NaiveDate, // 到货日期
    pub quantity: f64,            // 数量（整数单位）
    pub stockout_date: NaiveDate, // 触发断货日期
    pub annotations: Vec<String>, // 备注（按调整顺序追加）
    pub iteration: u32,           // 产生该单的迭代轮次（从 1 开始）
}

impl ReplenishmentOrder {
    /// 追加备注
    pub fn annotate(&mut self, note: impl Into<String>) {
        let note = note.into();
        if !note.trim().is_empty() {
            self.annotations.push(note);
        }
    }

    /// 备注文本（空备注返回空串）
    pub fn annotation_text(&self) -> String {
        self.annotations.join(ANNOTATION_SEPARATOR)
    }

    /// 折算为计划到货
    pub fn to_delivery(&self) -> ScheduledDelivery {
        ScheduledDelivery::new(
            self.key.clone(),
            self.delivery_date,
            self.quantity,
            DeliverySource::PlannedOrder,
        )
    }
}

// ==========================================
// OrderReportRow - 补货单输出行（富化后）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderReportRow {
    // ===== 基础字段 =====
    pub node: String,
    pub item: String,
    pub load_date: NaiveDate,
    pub delivery_date: NaiveDate,
    pub quantity: f64,
    pub stockout_date: NaiveDate,
    pub annotations: String,

    // ===== 派生字段 =====
    pub iso_year: i32,
    pub iso_week: u32,
    pub iso_week_label: String,               // YYYY-Www
    pub baseline_rate: Option<f64>,           // 未加成的日均消耗
    pub adjusted_rate: Option<f64>,           // 加成后的日均消耗
    pub order_value: Option<f64>,             // 单价 × 数量
    pub days_of_stock_on_arrival: Option<f64>, // 到货日可见库存 ÷ 日均消耗
}
