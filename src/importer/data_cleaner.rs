// ==========================================
// TIKTUY 批量导入 - 数据清洗器实现
// ==========================================
// 职责: TRIM / NULL 标准化 / 日期归一化 / 数值强制转换
// 用途: 行校验（日期可解析性）与提交前载荷归一化共用
// ==========================================

use crate::domain::preview::round_money;
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime};

/// Excel 序列日期的起点（1900 日期系统，含 1900-02-29 的历史偏差）
const EXCEL_EPOCH: (i32, u32, u32) = (1899, 12, 30);

/// 序列号合理区间: 1950-01-01 (18264) .. 9999-12-31
const EXCEL_SERIAL_RANGE: std::ops::RangeInclusive<f64> = 18_264.0..=2_958_465.0;

/// 最早接受的年份
const MIN_YEAR: i32 = 1900;

/// 时间部分允许的格式（日期后以 'T' 或空格分隔）
const TIME_FORMATS: &[&str] = &["%H:%M:%S%.f", "%H:%M:%S", "%H:%M"];

pub struct DataCleaner;

impl DataCleaner {
    pub fn clean_text(&self, value: &str) -> String {
        value.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// 空字符串/空白 → None
    pub fn normalize_null(&self, value: &str) -> Option<String> {
        let cleaned = self.clean_text(value);
        if cleaned.is_empty() {
            None
        } else {
            Some(cleaned)
        }
    }

    /// 解析日期
    ///
    /// # 支持格式
    /// - YYYY-MM-DD / YYYY/MM/DD / DD/MM/YYYY / DD-MM-YYYY / DD/MM/YY / YYYYMMDD
    /// - Excel 序列号（如 "46096" 或 "46096.0"）
    /// - RFC 3339 时间戳，或日期后跟可解析的时间部分
    ///
    /// 年份早于 1900 或时间部分无法解析时返回 None
    pub fn parse_date(&self, value: &str) -> Option<NaiveDate> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return None;
        }

        if let Ok(ts) = DateTime::parse_from_rfc3339(trimmed) {
            return Some(ts.date_naive()).filter(|d| d.year() >= MIN_YEAR);
        }

        let (date_part, time_part) = match trimmed.find(|c| c == 'T' || c == ' ') {
            Some(pos) => (&trimmed[..pos], Some(trimmed[pos + 1..].trim())),
            None => (trimmed, None),
        };
        if let Some(time) = time_part {
            if !is_time_of_day(time) {
                return None;
            }
        }

        parse_calendar_date(date_part)
            .or_else(|| match time_part {
                None => self.parse_excel_serial(date_part),
                Some(_) => None,
            })
            .filter(|d| d.year() >= MIN_YEAR)
    }

    fn parse_excel_serial(&self, value: &str) -> Option<NaiveDate> {
        let serial = value.parse::<f64>().ok()?;
        if !serial.is_finite() || !EXCEL_SERIAL_RANGE.contains(&serial) {
            return None;
        }
        let (y, m, d) = EXCEL_EPOCH;
        let epoch = NaiveDate::from_ymd_opt(y, m, d)?;
        epoch.checked_add_signed(Duration::days(serial.trunc() as i64))
    }

    /// 转换为 ISO 日期字符串 YYYY-MM-DD
    pub fn to_iso_date(&self, value: &str) -> Option<String> {
        self.parse_date(value)
            .map(|d| d.format("%Y-%m-%d").to_string())
    }

    /// 数量强制转换为非负整数（非整数/负数/非有限 → None）
    pub fn coerce_quantity(&self, value: f64) -> Option<u32> {
        if !value.is_finite() || value < 0.0 || value.fract() != 0.0 || value > u32::MAX as f64 {
            return None;
        }
        Some(value as u32)
    }

    /// 金额强制转换（非有限 → None，保留两位小数）
    pub fn coerce_money(&self, value: f64) -> Option<f64> {
        if value.is_finite() {
            Some(round_money(value))
        } else {
            None
        }
    }
}

fn is_time_of_day(value: &str) -> bool {
    let value = value.strip_suffix('Z').unwrap_or(value);
    TIME_FORMATS
        .iter()
        .any(|fmt| NaiveTime::parse_from_str(value, fmt).is_ok())
}

/// 按各段位数判断日/月/年顺序（两位年份: 00-68 → 20xx，69-99 → 19xx）
fn parse_calendar_date(value: &str) -> Option<NaiveDate> {
    // YYYYMMDD
    if value.len() == 8 && value.bytes().all(|b| b.is_ascii_digit()) {
        return NaiveDate::from_ymd_opt(
            value[0..4].parse().ok()?,
            value[4..6].parse().ok()?,
            value[6..8].parse().ok()?,
        );
    }

    let sep = if value.contains('/') { '/' } else { '-' };
    let parts: Vec<&str> = value.split(sep).collect();
    if parts.len() != 3
        || parts
            .iter()
            .any(|p| p.is_empty() || !p.bytes().all(|b| b.is_ascii_digit()))
    {
        return None;
    }

    let (year, month, day) = match (parts[0].len(), parts[2].len()) {
        (4, 1..=2) => (parts[0], parts[1], parts[2]),
        (1..=2, 4) | (1..=2, 2) => (parts[2], parts[1], parts[0]),
        _ => return None,
    };
    if month.len() > 2 {
        return None;
    }

    let mut year: i32 = year.parse().ok()?;
    if parts[2].len() == 2 && parts[0].len() <= 2 {
        year += if year < 69 { 2000 } else { 1900 };
    }
    NaiveDate::from_ymd_opt(year, month.parse().ok()?, day.parse().ok()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text_basic() {
        let cleaner = DataCleaner;
        assert_eq!(cleaner.clean_text("  Av.   Larco  123 "), "Av. Larco 123");
        assert_eq!(cleaner.normalize_null("   "), None);
        assert_eq!(cleaner.normalize_null(" x "), Some("x".to_string()));
    }

    #[test]
    fn test_parse_date_formats() {
        let cleaner = DataCleaner;
        let expected = NaiveDate::from_ymd_opt(2026, 3, 15).unwrap();
        assert_eq!(cleaner.parse_date("2026-03-15"), Some(expected));
        assert_eq!(cleaner.parse_date("15/03/2026"), Some(expected));
        assert_eq!(cleaner.parse_date("15-03-2026"), Some(expected));
        assert_eq!(cleaner.parse_date("2026/03/15"), Some(expected));
        assert_eq!(cleaner.parse_date("20260315"), Some(expected));
        assert_eq!(cleaner.parse_date("2026-03-15T10:30:00Z"), Some(expected));
    }

    #[test]
    fn test_parse_excel_serial() {
        let cleaner = DataCleaner;
        // 45658 = 2025-01-01
        assert_eq!(
            cleaner.parse_date("45658"),
            NaiveDate::from_ymd_opt(2025, 1, 1)
        );
        assert_eq!(
            cleaner.parse_date("45658.75"),
            NaiveDate::from_ymd_opt(2025, 1, 1)
        );
        assert_eq!(cleaner.parse_date("-3"), None);
    }

    #[test]
    fn test_small_numbers_are_not_serial_dates() {
        let cleaner = DataCleaner;
        assert_eq!(cleaner.parse_date("3"), None);
        assert_eq!(cleaner.parse_date("150"), None);
        assert_eq!(cleaner.to_iso_date("3"), None);
    }

    #[test]
    fn test_two_digit_year() {
        let cleaner = DataCleaner;
        assert_eq!(cleaner.to_iso_date("05/01/26"), Some("2026-01-05".to_string()));
        assert_eq!(cleaner.to_iso_date("05-01-26"), Some("2026-01-05".to_string()));
        assert_eq!(cleaner.to_iso_date("31/12/99"), Some("1999-12-31".to_string()));
    }

    #[test]
    fn test_years_before_1900_rejected() {
        let cleaner = DataCleaner;
        assert_eq!(cleaner.parse_date("05/01/0026"), None);
        assert_eq!(cleaner.parse_date("0026-01-05"), None);
        assert_eq!(cleaner.parse_date("1899-12-31"), None);
    }

    #[test]
    fn test_trailing_text_must_be_a_time() {
        let cleaner = DataCleaner;
        assert_eq!(cleaner.parse_date("15/03/2026 basura"), None);
        assert_eq!(cleaner.parse_date("2026-03-15Tx"), None);
        assert_eq!(
            cleaner.to_iso_date("15/03/2026 10:30"),
            Some("2026-03-15".to_string())
        );
        assert_eq!(
            cleaner.to_iso_date("2026-03-15 10:00:00"),
            Some("2026-03-15".to_string())
        );
        assert_eq!(
            cleaner.to_iso_date("2026-03-15T10:30:00-05:00"),
            Some("2026-03-15".to_string())
        );
    }

    #[test]
    fn test_parse_date_rejects_garbage() {
        let cleaner = DataCleaner;
        assert_eq!(cleaner.parse_date("mañana"), None);
        assert_eq!(cleaner.parse_date("31/02/2026"), None);
        assert_eq!(cleaner.parse_date(""), None);
    }

    #[test]
    fn test_to_iso_date() {
        let cleaner = DataCleaner;
        assert_eq!(cleaner.to_iso_date("05/01/2026"), Some("2026-01-05".to_string()));
    }

    #[test]
    fn test_coerce_quantity() {
        let cleaner = DataCleaner;
        assert_eq!(cleaner.coerce_quantity(3.0), Some(3));
        assert_eq!(cleaner.coerce_quantity(2.5), None);
        assert_eq!(cleaner.coerce_quantity(-1.0), None);
        assert_eq!(cleaner.coerce_quantity(f64::NAN), None);
    }
}
