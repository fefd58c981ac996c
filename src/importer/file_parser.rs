// ==========================================
// TIKTUY 批量导入 - 文件解析器实现
// ==========================================
// 阶段 0: 文件读取与解析
// 支持: Excel (.xlsx/.xls) / CSV (.csv)
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use crate::importer::import_traits::FileParser;
use calamine::{open_workbook_auto_from_rs, Reader};
use csv::ReaderBuilder;
use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;

// ==========================================
// RawRow - 原始行记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawRow {
    pub row_number: usize, // 表格可见行号（表头为第 1 行）
    pub cells: HashMap<String, String>,
}

impl RawRow {
    pub fn new(row_number: usize) -> Self {
        Self {
            row_number,
            cells: HashMap::new(),
        }
    }

    pub fn with(mut self, header: &str, value: &str) -> Self {
        self.cells.insert(header.to_string(), value.to_string());
        self
    }

    fn is_blank(&self) -> bool {
        self.cells.values().all(|v| v.trim().is_empty())
    }
}

// ==========================================
// SpreadsheetFile - 待上传/解析的表格文件
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct SpreadsheetFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl SpreadsheetFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    /// 从磁盘读取
    pub fn from_path(path: &Path) -> ImportResult<Self> {
        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "import.xlsx".to_string());
        Ok(Self { file_name, bytes })
    }

    pub fn extension(&self) -> String {
        Path::new(&self.file_name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase()
    }

    /// multipart 上传使用的 MIME 类型
    pub fn mime_type(&self) -> &'static str {
        match self.extension().as_str() {
            "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            "xls" => "application/vnd.ms-excel",
            "csv" => "text/csv",
            _ => "application/octet-stream",
        }
    }

    /// 上传前的格式检查
    pub fn ensure_supported(&self) -> ImportResult<()> {
        match self.extension().as_str() {
            "xlsx" | "xls" | "csv" => Ok(()),
            other => Err(ImportError::UnsupportedFormat(other.to_string())),
        }
    }
}

// ==========================================
// CSV Parser 实现
// ==========================================
pub struct CsvParser;

impl CsvParser {
    pub fn parse_bytes(&self, bytes: &[u8]) -> ImportResult<Vec<RawRow>> {
        // 兼容 Excel 导出的 UTF-8 BOM
        let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true) // 允许行长度不一致
            .from_reader(bytes);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut records = Vec::new();
        for (idx, result) in reader.records().enumerate() {
            let record = result?;
            let mut row = RawRow::new(idx + 2);

            for (col_idx, value) in record.iter().enumerate() {
                if let Some(header) = headers.get(col_idx) {
                    row.cells.insert(header.clone(), value.trim().to_string());
                }
            }

            // 跳过完全空白的行
            if row.is_blank() {
                continue;
            }
            records.push(row);
        }

        Ok(records)
    }
}

impl FileParser for CsvParser {
    fn parse_to_raw_records(&self, file_path: &Path) -> ImportResult<Vec<RawRow>> {
        if !file_path.exists() {
            return Err(ImportError::FileNotFound(file_path.display().to_string()));
        }
        if let Some(ext) = file_path.extension() {
            if ext != "csv" {
                return Err(ImportError::UnsupportedFormat(
                    ext.to_string_lossy().to_string(),
                ));
            }
        }

        let bytes = std::fs::read(file_path)?;
        self.parse_bytes(&bytes)
    }
}

// ==========================================
// Excel Parser 实现
// ==========================================
pub struct ExcelParser;

impl ExcelParser {
    /// 解析第一个工作表（第一行为表头）
    pub fn parse_bytes(&self, bytes: Vec<u8>) -> ImportResult<Vec<RawRow>> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;

        let sheet_names = workbook.sheet_names();
        let sheet_name = sheet_names
            .first()
            .cloned()
            .ok_or_else(|| ImportError::ExcelParseError("Excel 文件无工作表".to_string()))?;

        let range = workbook.worksheet_range(&sheet_name)?;

        let mut rows = range.rows();
        let header_row = rows
            .next()
            .ok_or_else(|| ImportError::ExcelParseError("Excel 文件无数据行".to_string()))?;

        let headers: Vec<String> = header_row
            .iter()
            .map(|cell| cell.to_string().trim().to_string())
            .collect();

        let mut records = Vec::new();
        for (idx, data_row) in rows.enumerate() {
            let mut row = RawRow::new(idx + 2);

            for (col_idx, cell) in data_row.iter().enumerate() {
                if let Some(header) = headers.get(col_idx) {
                    row.cells
                        .insert(header.clone(), cell.to_string().trim().to_string());
                }
            }

            if row.is_blank() {
                continue;
            }
            records.push(row);
        }

        Ok(records)
    }
}

impl FileParser for ExcelParser {
    fn parse_to_raw_records(&self, file_path: &Path) -> ImportResult<Vec<RawRow>> {
        if !file_path.exists() {
            return Err(ImportError::FileNotFound(file_path.display().to_string()));
        }

        let ext = file_path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        if ext != "xlsx" && ext != "xls" {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        let bytes = std::fs::read(file_path)?;
        self.parse_bytes(bytes)
    }
}

// ==========================================
// 通用文件解析器（根据扩展名自动选择）
// ==========================================
pub struct UniversalFileParser;

impl UniversalFileParser {
    pub fn parse(&self, file: &SpreadsheetFile) -> ImportResult<Vec<RawRow>> {
        match file.extension().as_str() {
            "csv" => CsvParser.parse_bytes(&file.bytes),
            "xlsx" | "xls" => ExcelParser.parse_bytes(file.bytes.clone()),
            other => Err(ImportError::UnsupportedFormat(other.to_string())),
        }
    }
}
