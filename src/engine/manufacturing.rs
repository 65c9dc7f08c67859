// ==========================================
// 多节点补货计划系统 - 制造与分配引擎
// ==========================================
// 职责:
// - 工厂库存直供（整单满足）
// - 按物料逐装车日扣减需求,缺口生成制造批次（按最小批量向上取整）
// - 工厂生产周校验（不兼容周移到此前最近的兼容周五）
// - 批次按到货日升序分配给待满足补货单,可部分满足,余量转兜底节点
// 红线: 单次贪心,不回到收敛循环
// ==========================================

use crate::domain::manufacturing::{
    AllocatedDelivery, AllocationKind, FactoryWeek, ItemMaster, ManufacturingOrder, WeekType,
};
use crate::domain::order::ReplenishmentOrder;
use crate::domain::types::PairKey;
use chrono::{Datelike, Duration, NaiveDate};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, info};

/// 数量比较容差
const QTY_EPSILON: f64 = 1e-9;

// ==========================================
// FactoryStockCover - 工厂库存直供结果
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct FactoryStockCover {
    pub deliveries: Vec<AllocatedDelivery>,
    pub remaining_stock: HashMap<String, f64>,
    pub pending: Vec<ReplenishmentOrder>, // 未被直供的补货单
}

/// 按 (物料, 装车日, 节点) 排序,保证贪心结果稳定
fn sort_by_item_and_load(orders: &mut [ReplenishmentOrder]) {
    orders.sort_by(|a, b| {
        (&a.key.item, a.load_date, &a.key.node).cmp(&(&b.key.item, b.load_date, &b.key.node))
    });
}

/// 工厂库存直供
///
/// # 规则
/// - 按 (物料, 装车日) 升序
/// - 工厂库存 >= 单量时整单直供并扣减库存,否则进入待满足列表
/// - 数量 <= 0 的单直接忽略
pub fn cover_from_factory_stock(
    orders: &[ReplenishmentOrder],
    factory_stock: &HashMap<String, f64>,
) -> FactoryStockCover {
    let mut sorted = orders.to_vec();
    sort_by_item_and_load(&mut sorted);

    let mut remaining_stock = factory_stock.clone();
    let mut deliveries = Vec::new();
    let mut pending = Vec::new();

    for order in sorted {
        if order.quantity <= 0.0 {
            continue;
        }
        let available = remaining_stock.get(&order.key.item).copied().unwrap_or(0.0);

        if available + QTY_EPSILON >= order.quantity {
            deliveries.push(AllocatedDelivery {
                source_ref: format!(
                    "STOCKFAB-{}-{}",
                    order.key.item,
                    order.load_date.format("%Y%m%d")
                ),
                key: order.key.clone(),
                load_date: order.load_date,
                delivery_date: order.delivery_date,
                quantity: order.quantity,
                kind: AllocationKind::FactoryStock,
            });
            remaining_stock.insert(order.key.item.clone(), available - order.quantity);
        } else {
            pending.push(order);
        }
    }

    debug!(
        covered = deliveries.len(),
        pending = pending.len(),
        "工厂库存直供完成"
    );

    FactoryStockCover {
        deliveries,
        remaining_stock,
        pending,
    }
}

// ==========================================
// ManufacturingPlanner - 制造批次生成与分配
// ==========================================
pub struct ManufacturingPlanner {
    lead_days: i64,
    fallback_node: String,
}

impl ManufacturingPlanner {
    /// # 参数
    /// - lead_days: 生产提前期（下达日 = 装车日 - 提前期）
    /// - fallback_node: 余量默认节点
    pub fn new(lead_days: i32, fallback_node: impl Into<String>) -> Self {
        Self {
            lead_days: lead_days as i64,
            fallback_node: fallback_node.into(),
        }
    }

    /// 生成制造批次
    ///
    /// # 规则
    /// - 按物料分组,装车日升序扣减当日需求
    /// - 预计库存 < 0 → 批次数量 = ceil(缺口 / 最小批量) × 最小批量（最小批量缺省为 1）
    /// - 批次余量结转到后续装车日
    pub fn generate_orders(
        &self,
        pending: &[ReplenishmentOrder],
        factory_stock: &HashMap<String, f64>,
        items: &HashMap<String, ItemMaster>,
    ) -> Vec<ManufacturingOrder> {
        // 物料 → 装车日 → 需求
        let mut demand: BTreeMap<&str, BTreeMap<NaiveDate, f64>> = BTreeMap::new();
        for order in pending.iter().filter(|o| o.quantity > 0.0) {
            *demand
                .entry(order.key.item.as_str())
                .or_default()
                .entry(order.load_date)
                .or_insert(0.0) += order.quantity;
        }

        let mut orders = Vec::new();
        for (item, by_date) in demand {
            let mut projected = factory_stock.get(item).copied().unwrap_or(0.0);
            let min_batch = items
                .get(item)
                .and_then(|m| m.min_batch)
                .filter(|b| *b > 0.0)
                .unwrap_or(1.0);

            for (load_date, qty) in by_date {
                projected -= qty;
                if projected >= -QTY_EPSILON {
                    continue;
                }

                let shortfall = -projected;
                let quantity = ((shortfall / min_batch) - QTY_EPSILON).ceil() * min_batch;
                let order_date = load_date - Duration::days(self.lead_days);

                orders.push(ManufacturingOrder {
                    order_id: format!("MO-{}-{}", item, order_date.format("%Y%m%d")),
                    item: item.to_string(),
                    order_date,
                    load_date,
                    quantity,
                    annotations: vec![format!("covers center orders up to {}", load_date)],
                });
                projected += quantity;
            }
        }

        info!(manufacturing_orders = orders.len(), "制造批次生成完成");
        orders
    }

    /// 分配批次到补货单
    ///
    /// # 规则
    /// - 供给顺序: 剩余工厂库存 → 制造批次（按装车日升序）
    /// - 制造批次只分配给装车日 >= 批次装车日的补货单
    /// - 补货单按到货日升序,记录剩余未满足数量,可部分满足
    /// - 批次余量转兜底节点（到货日 = 装车日）
    pub fn allocate(
        &self,
        pending: &[ReplenishmentOrder],
        remaining_stock: &HashMap<String, f64>,
        manufacturing_orders: &[ManufacturingOrder],
    ) -> Vec<AllocatedDelivery> {
        // 待满足补货单（按物料,到货日升序）
        let mut open: BTreeMap<&str, Vec<(ReplenishmentOrder, f64)>> = BTreeMap::new();
        for order in pending.iter().filter(|o| o.quantity > 0.0) {
            open.entry(order.key.item.as_str())
                .or_default()
                .push((order.clone(), order.quantity));
        }
        for list in open.values_mut() {
            list.sort_by(|(a, _), (b, _)| {
                (a.delivery_date, a.load_date, &a.key.node).cmp(&(b.delivery_date, b.load_date, &b.key.node))
            });
        }

        let mut deliveries = Vec::new();

        // 1. 剩余工厂库存
        for (item, list) in open.iter_mut() {
            let available = remaining_stock.get(*item).copied().unwrap_or(0.0);
            if available <= 0.0 {
                continue;
            }
            let source_ref = format!("STOCKFAB-{}", item);
            let leftover = fill(list, available, None, &source_ref, AllocationKind::FactoryStock, &mut deliveries);
            debug!(item = %item, leftover, "剩余工厂库存已分配");
        }

        // 2. 制造批次
        let mut sorted_mos: Vec<&ManufacturingOrder> = manufacturing_orders.iter().collect();
        sorted_mos.sort_by(|a, b| (&a.item, a.load_date).cmp(&(&b.item, b.load_date)));

        for mo in sorted_mos {
            let leftover = match open.get_mut(mo.item.as_str()) {
                Some(list) => fill(
                    list,
                    mo.quantity,
                    Some(mo.load_date),
                    &mo.order_id,
                    AllocationKind::Partial,
                    &mut deliveries,
                ),
                None => mo.quantity,
            };

            if leftover > QTY_EPSILON {
                deliveries.push(AllocatedDelivery {
                    source_ref: mo.order_id.clone(),
                    key: PairKey::new(self.fallback_node.clone(), mo.item.clone()),
                    load_date: mo.load_date,
                    delivery_date: mo.load_date,
                    quantity: leftover,
                    kind: AllocationKind::Surplus,
                });
            }
        }

        info!(allocations = deliveries.len(), "批次分配完成");
        deliveries
    }
}

/// 按顺序填充待满足补货单,返回剩余供给
///
/// supply_kind: FactoryStock 原样记录; 其余按是否整单满足记为 Full/Partial
fn fill(
    list: &mut [(ReplenishmentOrder, f64)],
    mut supply: f64,
    earliest_load: Option<NaiveDate>,
    source_ref: &str,
    supply_kind: AllocationKind,
    deliveries: &mut Vec<AllocatedDelivery>,
) -> f64 {
    for (order, open_qty) in list.iter_mut() {
        if supply <= QTY_EPSILON {
            break;
        }
        if *open_qty <= QTY_EPSILON {
            continue;
        }
        if earliest_load.map(|d| order.load_date < d).unwrap_or(false) {
            continue;
        }

        let assigned = open_qty.min(supply);
        let kind = match supply_kind {
            AllocationKind::FactoryStock => AllocationKind::FactoryStock,
            _ if (assigned - order.quantity).abs() <= QTY_EPSILON => AllocationKind::Full,
            _ => AllocationKind::Partial,
        };

        deliveries.push(AllocatedDelivery {
            source_ref: source_ref.to_string(),
            key: order.key.clone(),
            load_date: order.load_date,
            delivery_date: order.delivery_date,
            quantity: assigned,
            kind,
        });

        *open_qty -= assigned;
        supply -= assigned;
    }
    supply
}

// ==========================================
// FactoryCalendar - 工厂生产周校验
// ==========================================
pub struct FactoryCalendar {
    compatible_fridays: HashMap<WeekType, BTreeSet<NaiveDate>>,
    today: NaiveDate,
}

impl FactoryCalendar {
    pub fn new(weeks: &[FactoryWeek], today: NaiveDate) -> Self {
        let mut compatible_fridays: HashMap<WeekType, BTreeSet<NaiveDate>> = HashMap::new();
        for week in weeks {
            compatible_fridays
                .entry(week.week_type)
                .or_default()
                .insert(Self::friday_of(week.week_monday));
        }
        Self {
            compatible_fridays,
            today,
        }
    }

    /// 日期所在周的周五
    pub fn friday_of(date: NaiveDate) -> NaiveDate {
        let weekday = date.weekday().num_days_from_monday() as i64;
        date + Duration::days(4 - weekday)
    }

    /// 校验制造批次的下达日期（原地修改）
    ///
    /// # 规则
    /// - 周类型由物料工作中心推断,未知或无日历 → 不移动,追加备注
    /// - 所在周兼容 → 不变
    /// - 否则移到 <= 下达日的最近兼容周五,早于今天时取今天并标记 late
    /// - 无更早兼容周 → 不移动,追加备注
    ///
    /// # 返回
    /// 被移动的批次数
    pub fn validate(&self, orders: &mut [ManufacturingOrder], items: &HashMap<String, ItemMaster>) -> usize {
        let mut moved = 0;

        for order in orders.iter_mut() {
            let week_type = items
                .get(&order.item)
                .and_then(|m| m.work_center.as_deref())
                .and_then(WeekType::from_work_center);

            let Some(fridays) = week_type.and_then(|t| self.compatible_fridays.get(&t)) else {
                order.annotations.push("factory calendar: no week type or calendar, not validated".to_string());
                continue;
            };

            if fridays.contains(&Self::friday_of(order.order_date)) {
                order.annotations.push("factory calendar: ok".to_string());
                continue;
            }

            match fridays.range(..=order.order_date).next_back().copied() {
                Some(previous) => {
                    if previous < self.today {
                        order.order_date = self.today;
                        order.annotations.push("factory calendar: late".to_string());
                    } else {
                        order.order_date = previous;
                    }
                    order
                        .annotations
                        .push(format!("factory calendar: moved to compatible friday {}", previous));
                    moved += 1;
                }
                None => {
                    order
                        .annotations
                        .push("factory calendar: no earlier compatible week, kept".to_string());
                }
            }
        }

        moved
    }
}
