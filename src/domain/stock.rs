// ==========================================
// 多节点补货计划系统 - 库存与预测领域模型
// ==========================================
// 职责: 期初库存、计划到货、逐日预测记录
// 红线: 预测记录只读,每次推演整体替换
// ==========================================

use crate::domain::types::{DeliverySource, PairKey};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ==========================================
// StockPosition - 期初库存
// ==========================================
// 用途: 由外部快照提供,推演期间归模拟器所有
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockPosition {
    pub key: PairKey,
    pub on_hand: f64,                       // 在手库存（可为负：超额占用）
    pub snapshot_date: Option<NaiveDate>,   // 快照日期
}

impl StockPosition {
    pub fn new(node: &str, item: &str, on_hand: f64) -> Self {
        Self {
            key: PairKey::new(node, item),
            on_hand,
            snapshot_date: None,
        }
    }
}

// ==========================================
// ScheduledDelivery - 计划到货
// ==========================================
// 红线: 一次运行内只增不删
// 数量可为负数（调出）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledDelivery {
    pub key: PairKey,
    pub arrival_date: NaiveDate,
    pub quantity: f64,
    pub source: DeliverySource,
}

impl ScheduledDelivery {
    pub fn new(key: PairKey, arrival_date: NaiveDate, quantity: f64, source: DeliverySource) -> Self {
        Self {
            key,
            arrival_date,
            quantity,
            source,
        }
    }
}

// ==========================================
// ForecastDay - 单日预测
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastDay {
    pub date: NaiveDate,
    pub visible_stock: f64, // 可见库存（开启截断时 >= 0）
    pub deficit: f64,       // 当日缺口 = max(0, -原始库存)
    pub is_stockout: bool,  // deficit > 0
}

// ==========================================
// ForecastRow - 预测输出行（结果表/CSV）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRow {
    pub node: String,
    pub item: String,
    pub date: NaiveDate,
    pub visible_stock: f64,
    pub deficit: f64,
    pub is_stockout: bool,
}

// ==========================================
// StockForecast - 一次推演的完整输出
// ==========================================
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StockForecast {
    pub start_date: Option<NaiveDate>,
    pub horizon_days: u32,
    pub series: BTreeMap<PairKey, Vec<ForecastDay>>,
}

impl StockForecast {
    /// 对数
    pub fn pair_count(&self) -> usize {
        self.series.len()
    }

    /// 是否存在任一断货日
    pub fn has_stockout(&self) -> bool {
        self.series
            .values()
            .any(|days| days.iter().any(|d| d.is_stockout))
    }

    /// 断货日总数（全部对、全部日期）
    pub fn stockout_day_count(&self) -> usize {
        self.series
            .values()
            .map(|days| days.iter().filter(|d| d.is_stockout).count())
            .sum()
    }

    /// 某对的最早断货日
    pub fn first_stockout(&self, key: &PairKey) -> Option<&ForecastDay> {
        self.series
            .get(key)
            .and_then(|days| days.iter().find(|d| d.is_stockout))
    }

    /// 某对某日的可见库存
    pub fn visible_stock_on(&self, key: &PairKey, date: NaiveDate) -> Option<f64> {
        self.series
            .get(key)
            .and_then(|days| days.iter().find(|d| d.date == date))
            .map(|d| d.visible_stock)
    }

    /// 展平为输出行（按键、日期有序）
    pub fn to_rows(&self) -> Vec<ForecastRow> {
        self.series
            .iter()
            .flat_map(|(key, days)| {
                days.iter().map(move |d| ForecastRow {
                    node: key.node.clone(),
                    item: key.item.clone(),
                    date: d.date,
                    visible_stock: d.visible_stock,
                    deficit: d.deficit,
                    is_stockout: d.is_stockout,
                })
            })
            .collect()
    }
}
