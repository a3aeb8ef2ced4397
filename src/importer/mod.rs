// ==========================================
// 疫苗分配优化系统 - 导入层
// ==========================================
// 职责: 外部疫情轨迹导入,生成只读快照
// 支持: Excel, CSV
// ==========================================

pub mod epidemic_loader;
pub mod error;
pub mod file_parser;

// 重导出核心类型
pub use epidemic_loader::{required_columns, EpidemicSnapshotStore};
pub use error::{DataFormatError, ImportResult};
pub use file_parser::{CsvParser, ExcelParser, FileParser, RawTable, UniversalFileParser};
