// ==========================================
// 多节点补货计划系统 - 文件快照数据源
// ==========================================
// 职责: 从快照目录（CSV/Excel）读取计划输入
// 文件: stock / consumption 必须存在; 其余缺失视为空
//       node_policy / packaging / rotation / item_master /
//       factory_stock / pending_deliveries / factory_calendar
// 范围: 若文件含 scope_id 列,仅保留与请求范围一致的行
// ==========================================

use crate::domain::manufacturing::{FactoryWeek, ItemMaster, WeekType};
use crate::domain::policy::{CoveragePolicy, PackagingSpec};
use crate::domain::stock::{ScheduledDelivery, StockPosition};
use crate::domain::types::{DeliverySource, PairKey};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::field_mapper::FieldMapper;
use crate::importer::file_parser::{RawRecord, UniversalFileParser};
use crate::repository::data_source::{ConsumptionRates, PlanningDataSource, ScopeRequest};
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

// 列名别名（首个为规范列名）
const NODE: &[&str] = &["node", "Centro", "centro", "site"];
const ITEM: &[&str] = &["item", "Material", "material", "sku"];
const SCOPE: &[&str] = &["scope_id", "scope", "supplier"];
const ON_HAND: &[&str] = &["on_hand", "stock", "Stock"];
const SNAPSHOT_DATE: &[&str] = &["snapshot_date", "date"];
const DAILY_RATE: &[&str] = &["daily_rate", "rate", "consumption"];
const TARGET_DAYS: &[&str] = &["target_days", "target"];
const SAFETY_DAYS: &[&str] = &["safety_days", "safety"];
const CASE_SIZE: &[&str] = &["case_size", "layer_size"];
const PALLET_SIZE: &[&str] = &["pallet_size", "pallet"];
const DAYS_PER_PALLET: &[&str] = &["days_per_pallet", "rotation_days"];
const MIN_BATCH: &[&str] = &["min_batch", "minimum_batch"];
const UNIT_PRICE: &[&str] = &["unit_price", "price"];
const WORK_CENTER: &[&str] = &["work_center", "workcenter"];
const QUANTITY: &[&str] = &["quantity", "qty"];
const ARRIVAL_DATE: &[&str] = &["arrival_date", "delivery_date"];
const WEEK_MONDAY: &[&str] = &["week_monday", "monday"];
const WEEK_TYPE: &[&str] = &["week_type", "type"];

const SUPPORTED_EXTENSIONS: [&str; 3] = ["csv", "xlsx", "xls"];

fn import_failure(err: ImportError) -> RepositoryError {
    RepositoryError::Other(anyhow::Error::from(err))
}

// ==========================================
// FileSnapshotSource
// ==========================================
pub struct FileSnapshotSource {
    dir: PathBuf,
    parser: UniversalFileParser,
}

impl FileSnapshotSource {
    /// # 参数
    /// - dir: 快照目录（文件名不含扩展名,如 stock.csv / stock.xlsx）
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            parser: UniversalFileParser,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 按文件名定位快照文件（优先 csv）
    fn locate(&self, stem: &str) -> Option<PathBuf> {
        SUPPORTED_EXTENSIONS
            .iter()
            .map(|ext| self.dir.join(format!("{}.{}", stem, ext)))
            .find(|path| path.is_file())
    }

    fn read_required(&self, stem: &str) -> ImportResult<Vec<RawRecord>> {
        let path = self
            .locate(stem)
            .ok_or_else(|| ImportError::FileNotFound(self.dir.join(stem).display().to_string()))?;
        self.parser.parse(&path)
    }

    fn read_optional(&self, stem: &str) -> ImportResult<Vec<RawRecord>> {
        match self.locate(stem) {
            Some(path) => self.parser.parse(&path),
            None => {
                debug!(dir = %self.dir.display(), file = stem, "可选快照文件缺失,按空处理");
                Ok(Vec::new())
            }
        }
    }

    /// 读取文件并按范围过滤,逐行映射
    fn map_rows<T>(
        &self,
        stem: &str,
        required: bool,
        request: &ScopeRequest,
        mut map: impl FnMut(&FieldMapper<'_>) -> ImportResult<Option<T>>,
    ) -> RepositoryResult<Vec<T>> {
        let records = if required {
            self.read_required(stem)
        } else {
            self.read_optional(stem)
        }
        .map_err(import_failure)?;

        let mut out = Vec::with_capacity(records.len());
        for (idx, record) in records.iter().enumerate() {
            let mapper = FieldMapper::new(stem, record, idx + 1);
            if let Some(scope) = mapper.get_string(SCOPE) {
                if scope != request.scope_id {
                    continue;
                }
            }
            if let Some(value) = map(&mapper).map_err(import_failure)? {
                out.push(value);
            }
        }
        Ok(out)
    }
}

#[async_trait]
impl PlanningDataSource for FileSnapshotSource {
    async fn load_stock(&self, request: &ScopeRequest) -> RepositoryResult<Vec<StockPosition>> {
        self.map_rows("stock", true, request, |m| {
            let item = m.require_string(ITEM)?;
            if request.is_excluded(&item) {
                return Ok(None);
            }
            let mut position = StockPosition::new(&m.require_string(NODE)?, &item, m.require_f64(ON_HAND)?);
            position.snapshot_date = m.parse_date(SNAPSHOT_DATE)?;
            Ok(Some(position))
        })
    }

    async fn load_consumption(&self, request: &ScopeRequest) -> RepositoryResult<ConsumptionRates> {
        let rows = self.map_rows("consumption", true, request, |m| {
            Ok(Some((
                PairKey::new(m.require_string(NODE)?, m.require_string(ITEM)?),
                m.require_f64(DAILY_RATE)?,
            )))
        })?;
        // 同一组合重复出现时累加
        let mut baseline: HashMap<PairKey, f64> = HashMap::new();
        for (key, rate) in rows {
            *baseline.entry(key).or_insert(0.0) += rate;
        }
        Ok(ConsumptionRates::from_baseline(baseline, request))
    }

    async fn load_node_policies(
        &self,
        request: &ScopeRequest,
    ) -> RepositoryResult<HashMap<String, CoveragePolicy>> {
        let rows = self.map_rows("node_policy", false, request, |m| {
            let node = m.require_string(NODE)?;
            let target = m.parse_i32(TARGET_DAYS)?.unwrap_or(0);
            let safety = m.parse_i32(SAFETY_DAYS)?.unwrap_or(0);
            Ok(Some((node, CoveragePolicy::new(target, safety))))
        })?;
        Ok(rows.into_iter().collect())
    }

    async fn load_packaging(&self, request: &ScopeRequest) -> RepositoryResult<HashMap<String, PackagingSpec>> {
        let rows = self.map_rows("packaging", false, request, |m| {
            Ok(Some((
                m.require_string(ITEM)?,
                PackagingSpec {
                    case_size: m.parse_f64(CASE_SIZE)?,
                    pallet_size: m.parse_f64(PALLET_SIZE)?,
                },
            )))
        })?;
        Ok(rows.into_iter().collect())
    }

    async fn load_rotation(&self, request: &ScopeRequest) -> RepositoryResult<HashMap<PairKey, f64>> {
        let rows = self.map_rows("rotation", false, request, |m| {
            Ok(Some((
                PairKey::new(m.require_string(NODE)?, m.require_string(ITEM)?),
                m.require_f64(DAYS_PER_PALLET)?,
            )))
        })?;
        Ok(rows.into_iter().collect())
    }

    async fn load_item_master(&self, request: &ScopeRequest) -> RepositoryResult<HashMap<String, ItemMaster>> {
        let rows = self.map_rows("item_master", false, request, |m| {
            Ok(Some(ItemMaster {
                item: m.require_string(ITEM)?,
                min_batch: m.parse_f64(MIN_BATCH)?,
                unit_price: m.parse_f64(UNIT_PRICE)?,
                work_center: m.get_string(WORK_CENTER),
            }))
        })?;
        Ok(rows.into_iter().map(|master| (master.item.clone(), master)).collect())
    }

    async fn load_factory_stock(&self, request: &ScopeRequest) -> RepositoryResult<HashMap<String, f64>> {
        let rows = self.map_rows("factory_stock", false, request, |m| {
            let item = m.require_string(ITEM)?;
            if request.is_excluded(&item) {
                return Ok(None);
            }
            Ok(Some((item, m.require_f64(QUANTITY)?)))
        })?;
        let mut stock: HashMap<String, f64> = HashMap::new();
        for (item, quantity) in rows {
            *stock.entry(item).or_insert(0.0) += quantity;
        }
        Ok(stock)
    }

    async fn load_pending_deliveries(
        &self,
        request: &ScopeRequest,
    ) -> RepositoryResult<Vec<ScheduledDelivery>> {
        self.map_rows("pending_deliveries", false, request, |m| {
            let key = PairKey::new(m.require_string(NODE)?, m.require_string(ITEM)?);
            if request.is_excluded(&key.item) {
                return Ok(None);
            }
            Ok(Some(ScheduledDelivery::new(
                key,
                m.require_date(ARRIVAL_DATE)?,
                m.require_f64(QUANTITY)?,
                DeliverySource::PendingPurchase,
            )))
        })
    }

    async fn load_factory_calendar(&self, request: &ScopeRequest) -> RepositoryResult<Vec<FactoryWeek>> {
        self.map_rows("factory_calendar", false, request, |m| {
            let week_monday = m.require_date(WEEK_MONDAY)?;
            let raw_type = m.require_string(WEEK_TYPE)?;
            match raw_type.parse::<WeekType>() {
                Ok(week_type) => Ok(Some(FactoryWeek { week_monday, week_type })),
                Err(message) => {
                    warn!(%week_monday, %message, "忽略未知周类型");
                    Ok(None)
                }
            }
        })
    }
}
