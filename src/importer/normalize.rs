// ==========================================
// TIKTUY 批量导入 - 名称归一化
// ==========================================
// 职责: 表格自由文本 ↔ 参照实体名称的比较
// 规则: 小写 + 去除变音符号 + 去首尾空白 + 合并连续空白
// 红线: 纯函数，不依赖任何请求或会话状态
// ==========================================

use std::collections::HashSet;
use unicode_normalization::UnicodeNormalization;

/// 归一化名称，得到比较用的键
///
/// # 示例
/// ```
/// use tiktuy_import::importer::normalize::normalize_key;
/// assert_eq!(normalize_key("  San Martín   de Porres "), "san martin de porres");
/// ```
pub fn normalize_key(value: &str) -> String {
    value
        .nfd()
        .filter(|c| !unicode_normalization::char::is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// 两个名称在归一化后是否相同（任一为空视为不匹配）
pub fn names_match(left: &str, right: &str) -> bool {
    let l = normalize_key(left);
    !l.is_empty() && l == normalize_key(right)
}

/// 匹配置信度 [0.0, 1.0]
///
/// - 1.0: 归一化后完全相同
/// - (0, 1): 词集合 Jaccard 相似度（仅用于候选提示，不参与校验判定）
/// - 0.0: 任一为空或无共同词
pub fn match_confidence(left: &str, right: &str) -> f64 {
    let l = normalize_key(left);
    let r = normalize_key(right);
    if l.is_empty() || r.is_empty() {
        return 0.0;
    }
    if l == r {
        return 1.0;
    }

    let lt: HashSet<&str> = l.split(' ').collect();
    let rt: HashSet<&str> = r.split(' ').collect();
    let inter = lt.intersection(&rt).count() as f64;
    let union = lt.union(&rt).count() as f64;
    // 非完全相同时上限低于 1.0
    (inter / union).min(0.99)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_diacritics_and_case() {
        assert_eq!(normalize_key("ÁNCASH"), "ancash");
        assert_eq!(normalize_key("Jesús María"), "jesus maria");
        assert_eq!(normalize_key("Breña"), "brena");
    }

    #[test]
    fn test_normalize_collapses_whitespace() {
        assert_eq!(normalize_key("\tLa   Victoria \n"), "la victoria");
        assert_eq!(normalize_key("   "), "");
    }

    #[test]
    fn test_names_match() {
        assert!(names_match("Miraflores", " miraflores "));
        assert!(names_match("Surquillo", "SURQUÍLLO"));
        assert!(!names_match("Lince", "Lima"));
        assert!(!names_match("", ""));
    }

    #[test]
    fn test_names_match_is_symmetric() {
        let pairs = [("Ate", "ATE"), ("San Isidro", "san  isidro"), ("Comas", "Chorrillos")];
        for (a, b) in pairs {
            assert_eq!(names_match(a, b), names_match(b, a));
        }
    }

    #[test]
    fn test_match_confidence() {
        assert_eq!(match_confidence("Sede Lima", "sede lima"), 1.0);
        assert_eq!(match_confidence("", "Lima"), 0.0);
        let partial = match_confidence("Sede Lima Norte", "Sede Lima");
        assert!(partial > 0.5 && partial < 1.0);
        assert_eq!(match_confidence("Arequipa", "Cusco"), 0.0);
    }
}
