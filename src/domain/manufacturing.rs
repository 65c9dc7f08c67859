// ==========================================
// 多节点补货计划系统 - 制造与分配领域模型
// ==========================================
// 职责: 物料主数据、制造批次、分配/调拨记录、工厂周类型
// ==========================================

use crate::domain::types::PairKey;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ==========================================
// ItemMaster - 物料主数据（制造相关）
// ==========================================
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ItemMaster {
    pub item: String,
    pub min_batch: Option<f64>,      // 最小生产批量
    pub unit_price: Option<f64>,     // 单价
    pub work_center: Option<String>, // 工作中心（推断工厂周类型）
}

// ==========================================
// 工厂周类型 (Week Type)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WeekType {
    Ultra,
    Preco,
}

impl WeekType {
    /// 由工作中心推断周类型
    ///
    /// - `L01*` → Ultra
    /// - `PRECO*` 或 `BOLLERIA` → Preco
    pub fn from_work_center(work_center: &str) -> Option<Self> {
        let wc = work_center.trim().to_uppercase();
        if wc.starts_with("L01") {
            Some(WeekType::Ultra)
        } else if wc.starts_with("PRECO") || wc == "BOLLERIA" {
            Some(WeekType::Preco)
        } else {
            None
        }
    }
}

impl FromStr for WeekType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "ULTRA" => Ok(WeekType::Ultra),
            "PRECO" => Ok(WeekType::Preco),
            other => Err(format!("未知周类型: {}", other)),
        }
    }
}

impl fmt::Display for WeekType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WeekType::Ultra => write!(f, "ULTRA"),
            WeekType::Preco => write!(f, "PRECO"),
        }
    }
}

// ==========================================
// FactoryWeek - 工厂生产周（按周类型下发的可生产周）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactoryWeek {
    pub week_monday: NaiveDate, // 周一日期
    pub week_type: WeekType,
}

// ==========================================
// ManufacturingOrder - 制造批次
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManufacturingOrder {
    pub order_id: String,         // MO-{item}-{下达日期 YYYYMMDD}
    pub item: String,
    pub order_date: NaiveDate,    // 生产下达日期 = 装车日 - 提前期
    pub load_date: NaiveDate,     // 覆盖的装车日期
    pub quantity: f64,
    pub annotations: Vec<String>,
}

// ==========================================
// 分配类型 (Allocation Kind)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AllocationKind {
    Full,         // 完全满足
    Partial,      // 部分满足
    Surplus,      // 余量转默认节点
    FactoryStock, // 工厂库存直供
    TransferIn,   // 枢纽调入
    TransferOut,  // 枢纽调出（负数）
}

impl fmt::Display for AllocationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocationKind::Full => write!(f, "FULL"),
            AllocationKind::Partial => write!(f, "PARTIAL"),
            AllocationKind::Surplus => write!(f, "SURPLUS"),
            AllocationKind::FactoryStock => write!(f, "FACTORY_STOCK"),
            AllocationKind::TransferIn => write!(f, "TRANSFER_IN"),
            AllocationKind::TransferOut => write!(f, "TRANSFER_OUT"),
        }
    }
}

// ==========================================
// AllocatedDelivery - 分配/调拨结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocatedDelivery {
    pub source_ref: String, // 来源（制造批次号 / STOCKFAB-… / TRANSFER-…）
    pub key: PairKey,
    pub load_date: NaiveDate,
    pub delivery_date: NaiveDate,
    pub quantity: f64,
    pub kind: AllocationKind,
}
