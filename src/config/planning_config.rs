// ==========================================
// 多节点补货计划系统 - 计划运行参数
// ==========================================
// 职责: 一次计划运行的全部可调参数及默认值
// 来源优先级: 命令行 > config_kv > 默认值
// ==========================================

use crate::domain::types::weekday_from_index;
use chrono::{Local, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// 快周转阈值默认值（一托对应库存天数 < 11 视为快周转）
pub const DEFAULT_FAST_ROTATION_DAYS: f64 = 11.0;

/// 默认兜底/枢纽节点
pub const DEFAULT_FALLBACK_NODE: &str = "0801";

// ==========================================
// PlanningConfig - 计划运行参数
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanningConfig {
    // ===== 收敛引擎 =====
    pub horizon_days: u32,   // 预测天数: 60
    pub max_iterations: u32, // 最大迭代次数: 50
    pub clamp_to_zero: bool, // 可见库存截断为 0: true

    // ===== 物流日历 =====
    pub cutoff_weekday: u32,    // 截止日（0=周一）: 2 (周三)
    pub pull_back_weekday: u32, // 提前到上周的星期几: 2 (周三)

    // ===== 包装批量 =====
    pub fast_rotation_days: f64, // 快周转阈值: 11

    // ===== 制造/分配 =====
    pub production_lead_days: i32, // 生产提前期: 2
    pub fallback_node: String,     // 余量默认节点: 0801
    pub hub_node: String,          // 调拨枢纽节点: 0801

    // ===== 数据源 =====
    pub consumption_boost: f64,      // 消耗加成（0.15 = +15%）
    pub excluded_items: Vec<String>, // 排除物料

    // ===== 运行日期 =====
    pub today: Option<NaiveDate>, // 为空时取本地当前日期
}

impl Default for PlanningConfig {
    fn default() -> Self {
        Self {
            horizon_days: 60,
            max_iterations: 50,
            clamp_to_zero: true,
            cutoff_weekday: 2,
            pull_back_weekday: 2,
            fast_rotation_days: DEFAULT_FAST_ROTATION_DAYS,
            production_lead_days: 2,
            fallback_node: DEFAULT_FALLBACK_NODE.to_string(),
            hub_node: DEFAULT_FALLBACK_NODE.to_string(),
            consumption_boost: 0.0,
            excluded_items: Vec::new(),
            today: None,
        }
    }
}

impl PlanningConfig {
    /// 当前日期（可被 today 覆写,便于重放与测试）
    pub fn current_date(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }

    pub fn cutoff(&self) -> Option<Weekday> {
        weekday_from_index(self.cutoff_weekday)
    }

    pub fn pull_back_to(&self) -> Option<Weekday> {
        weekday_from_index(self.pull_back_weekday)
    }

    /// 校验参数
    ///
    /// # 返回
    /// - `Ok(())`: 参数有效
    /// - `Err(String)`: 参数无效,返回错误描述
    pub fn validate(&self) -> Result<(), String> {
        if self.horizon_days == 0 {
            return Err("预测天数必须大于 0".to_string());
        }
        if self.cutoff().is_none() {
            return Err(format!("截止日索引无效: {}（应为 0-6）", self.cutoff_weekday));
        }
        if self.pull_back_to().is_none() {
            return Err(format!(
                "提前目标星期索引无效: {}（应为 0-6）",
                self.pull_back_weekday
            ));
        }
        if !self.fast_rotation_days.is_finite() || self.fast_rotation_days < 0.0 {
            return Err(format!("快周转阈值无效: {}", self.fast_rotation_days));
        }
        if !self.consumption_boost.is_finite() || self.consumption_boost <= -1.0 {
            return Err(format!("消耗加成无效: {}", self.consumption_boost));
        }
        if self.production_lead_days < 0 {
            return Err(format!("生产提前期不能为负: {}", self.production_lead_days));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PlanningConfig::default();
        assert_eq!(config.horizon_days, 60);
        assert_eq!(config.max_iterations, 50);
        assert!(config.clamp_to_zero);
        assert_eq!(config.cutoff(), Some(Weekday::Wed));
        assert_eq!(config.fast_rotation_days, 11.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = PlanningConfig::default();
        config.horizon_days = 0;
        assert!(config.validate().is_err());

        let mut config = PlanningConfig::default();
        config.cutoff_weekday = 9;
        assert!(config.validate().is_err());

        let mut config = PlanningConfig::default();
        config.consumption_boost = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: PlanningConfig =
            serde_json::from_str(r#"{"horizon_days": 30, "today": "2026-03-02"}"#).unwrap();
        assert_eq!(config.horizon_days, 30);
        assert_eq!(config.max_iterations, 50);
        assert_eq!(
            config.current_date(),
            NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
        );
    }
}
