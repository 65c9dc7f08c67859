// ==========================================
// 多节点补货计划系统 - 字段映射器
// ==========================================
// 职责: 原始记录 → 类型化字段（支持列名别名）
// 日期: YYYY-MM-DD / YYYYMMDD / YYYY/MM/DD / Excel 序列号
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::RawRecord;
use chrono::{Duration, NaiveDate};

/// Excel 日期序列号起点（1900 闰年缺陷修正后）
fn excel_epoch() -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(1899, 12, 30)
}

// ==========================================
// FieldMapper - 单行字段读取器
// ==========================================
pub struct FieldMapper<'a> {
    file: &'a str,
    row: &'a RawRecord,
    row_number: usize,
}

impl<'a> FieldMapper<'a> {
    /// # 参数
    /// - file: 文件名（用于错误定位）
    /// - row: 原始记录
    /// - row_number: 数据行号（从 1 开始,不含表头）
    pub fn new(file: &'a str, row: &'a RawRecord, row_number: usize) -> Self {
        Self {
            file,
            row,
            row_number,
        }
    }

    /// 提取字符串字段,依次尝试别名,空串视为缺失
    pub fn get_string(&self, aliases: &[&str]) -> Option<String> {
        aliases.iter().find_map(|alias| {
            self.row
                .get(*alias)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        })
    }

    /// 必填字符串字段
    pub fn require_string(&self, aliases: &[&str]) -> ImportResult<String> {
        self.get_string(aliases).ok_or_else(|| ImportError::MissingField {
            file: self.file.to_string(),
            row: self.row_number,
            field: aliases.first().copied().unwrap_or_default().to_string(),
        })
    }

    /// 解析浮点数（小数逗号: "12,5" 视为 12.5）
    pub fn parse_f64(&self, aliases: &[&str]) -> ImportResult<Option<f64>> {
        match self.get_string(aliases) {
            None => Ok(None),
            Some(value) => {
                let normalized = value.replace(',', ".");
                normalized
                    .parse::<f64>()
                    .map(Some)
                    .map_err(|_| ImportError::TypeConversionError {
                        row: self.row_number,
                        field: aliases.first().copied().unwrap_or_default().to_string(),
                        message: format!("无法解析为浮点数: {}", value),
                    })
            }
        }
    }

    pub fn require_f64(&self, aliases: &[&str]) -> ImportResult<f64> {
        self.parse_f64(aliases)?.ok_or_else(|| ImportError::MissingField {
            file: self.file.to_string(),
            row: self.row_number,
            field: aliases.first().copied().unwrap_or_default().to_string(),
        })
    }

    /// 解析整数（允许 "7.0" 这类 Excel 输出）
    pub fn parse_i32(&self, aliases: &[&str]) -> ImportResult<Option<i32>> {
        Ok(self.parse_f64(aliases)?.map(|v| v.round() as i32))
    }

    /// 解析日期
    pub fn parse_date(&self, aliases: &[&str]) -> ImportResult<Option<NaiveDate>> {
        let Some(value) = self.get_string(aliases) else {
            return Ok(None);
        };

        let parsed = NaiveDate::parse_from_str(&value, "%Y-%m-%d")
            .or_else(|_| NaiveDate::parse_from_str(&value, "%Y%m%d"))
            .or_else(|_| NaiveDate::parse_from_str(&value, "%Y/%m/%d"))
            .ok()
            .or_else(|| {
                // Excel 序列号
                value
                    .parse::<f64>()
                    .ok()
                    .filter(|serial| *serial > 0.0 && *serial < 100_000.0)
                    .and_then(|serial| excel_epoch().map(|e| e + Duration::days(serial.trunc() as i64)))
            });

        parsed.map(Some).ok_or_else(|| ImportError::DateFormatError {
            row: self.row_number,
            field: aliases.first().copied().unwrap_or_default().to_string(),
            value,
        })
    }

    pub fn require_date(&self, aliases: &[&str]) -> ImportResult<NaiveDate> {
        self.parse_date(aliases)?.ok_or_else(|| ImportError::MissingField {
            file: self.file.to_string(),
            row: self.row_number,
            field: aliases.first().copied().unwrap_or_default().to_string(),
        })
    }
}
