// ==========================================
// TIKTUY 批量导入 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use crate::i18n::t_with_args;
use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件相关错误 =====
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("文件格式不支持: {0}（仅支持 .xlsx/.xls/.csv）")]
    UnsupportedFormat(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("Excel 解析失败: {0}")]
    ExcelParseError(String),

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    #[error("文件行数超出上限: {rows} > {max}")]
    TooManyRows { rows: usize, max: usize },

    // ===== 数据映射错误 =====
    #[error("缺少必需的列: {0}")]
    MissingColumn(String),

    #[error("类型转换失败 (行 {row}, 字段 {field}): {message}")]
    TypeConversionError {
        row: usize,
        field: String,
        message: String,
    },

    // ===== 预览会话错误 =====
    #[error("无效的状态转换: from={from} to={to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("行下标越界: {index}（共 {len} 行）")]
    RowOutOfRange { index: usize, len: usize },

    #[error("明细下标越界: 行 {row}, 明细 {item}")]
    ItemOutOfRange { row: usize, item: usize },

    // ===== 远端错误 =====
    #[error("预览请求失败: {0}")]
    PreviewFailed(String),

    // ===== 通用错误 =====
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ImportError {
    /// 面向用户的本地化消息（阻断性提示使用）
    pub fn user_message(&self) -> String {
        match self {
            ImportError::FileNotFound(path) => {
                t_with_args("import.file_not_found", &[("path", path.as_str())])
            }
            ImportError::UnsupportedFormat(ext) => {
                t_with_args("import.unsupported_format", &[("ext", ext.as_str())])
            }
            ImportError::TooManyRows { rows, max } => t_with_args(
                "import.too_many_rows",
                &[("rows", rows.to_string().as_str()), ("max", max.to_string().as_str())],
            ),
            ImportError::PreviewFailed(message) => message.clone(),
            other => t_with_args("import.preview_failed", &[("message", other.to_string().as_str())]),
        }
    }
}

impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

impl From<calamine::Error> for ImportError {
    fn from(err: calamine::Error) -> Self {
        ImportError::ExcelParseError(err.to_string())
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;
