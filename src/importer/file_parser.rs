// ==========================================
// 疫苗分配优化系统 - 文件解析器实现
// ==========================================
// 阶段 0: 文件读取与解析，输出原始字符串表
// 支持: Excel (.xlsx/.xls) / CSV (.csv)
// ==========================================

use crate::importer::error::{DataFormatError, ImportResult};
use calamine::{open_workbook_auto, Reader};
use csv::ReaderBuilder;
use std::fs::File;
use std::path::Path;

/// 原始表格：表头 + 数据行（均为去空白后的字符串）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    /// 列名 -> 列下标
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// 读取单元格，越界视为空字符串
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(|s| s.as_str())
            .unwrap_or("")
    }

    fn push_row(&mut self, row: Vec<String>) {
        // 跳过完全空白的行
        if row.iter().all(|v| v.is_empty()) {
            return;
        }
        self.rows.push(row);
    }
}

/// 文件解析接口
pub trait FileParser {
    fn parse_table(&self, file_path: &Path) -> ImportResult<RawTable>;
}

fn ensure_exists(path: &Path) -> ImportResult<()> {
    if !path.exists() {
        return Err(DataFormatError::FileNotFound(path.display().to_string()));
    }
    Ok(())
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

// ==========================================
// CSV Parser 实现
// ==========================================
pub struct CsvParser;

impl FileParser for CsvParser {
    fn parse_table(&self, file_path: &Path) -> ImportResult<RawTable> {
        ensure_exists(file_path)?;

        let ext = extension_of(file_path);
        if ext != "csv" {
            return Err(DataFormatError::UnsupportedFormat(ext));
        }

        let file = File::open(file_path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true) // 允许行长度不一致
            .trim(csv::Trim::All)
            .from_reader(file);

        let mut table = RawTable {
            headers: reader.headers()?.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        };

        for result in reader.records() {
            let record = result?;
            table.push_row(record.iter().map(|v| v.to_string()).collect());
        }

        Ok(table)
    }
}

// ==========================================
// Excel Parser 实现（读取第一个工作表）
// ==========================================
pub struct ExcelParser;

impl FileParser for ExcelParser {
    fn parse_table(&self, file_path: &Path) -> ImportResult<RawTable> {
        ensure_exists(file_path)?;

        let ext = extension_of(file_path);
        if ext != "xlsx" && ext != "xls" {
            return Err(DataFormatError::UnsupportedFormat(ext));
        }

        let mut workbook = open_workbook_auto(file_path)?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| DataFormatError::ExcelParseError("Excel 文件无工作表".to_string()))??;

        let mut rows = range.rows();
        let header_row = rows
            .next()
            .ok_or_else(|| DataFormatError::ExcelParseError("Excel 文件无数据行".to_string()))?;

        let mut table = RawTable {
            headers: header_row
                .iter()
                .map(|cell| cell.to_string().trim().to_string())
                .collect(),
            rows: Vec::new(),
        };

        for data_row in rows {
            table.push_row(
                data_row
                    .iter()
                    .map(|cell| cell.to_string().trim().to_string())
                    .collect(),
            );
        }

        Ok(table)
    }
}

// ==========================================
// 通用文件解析器（根据扩展名自动选择）
// ==========================================
pub struct UniversalFileParser;

impl UniversalFileParser {
    pub fn parse<P: AsRef<Path>>(&self, file_path: P) -> ImportResult<RawTable> {
        let path = file_path.as_ref();
        match extension_of(path).as_str() {
            "csv" => CsvParser.parse_table(path),
            "xlsx" | "xls" => ExcelParser.parse_table(path),
            other => Err(DataFormatError::UnsupportedFormat(other.to_string())),
        }
    }
}
