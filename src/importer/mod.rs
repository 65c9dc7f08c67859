// ==========================================
// 多节点补货计划系统 - 导入层
// ==========================================
// 职责: 快照文件 (Excel / CSV) → 计划输入
// ==========================================

pub mod error;
pub mod field_mapper;
pub mod file_parser;
pub mod snapshot_source;

// 重导出核心类型
pub use error::{ImportError, ImportResult};
pub use field_mapper::FieldMapper;
pub use file_parser::{CsvParser, ExcelParser, FileParser, RawRecord, UniversalFileParser};
pub use snapshot_source::FileSnapshotSource;
