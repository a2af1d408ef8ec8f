// ==========================================
// 智能配送路由系统 - 数据清洗器实现
// ==========================================
// 职责: TRIM / NULL 标准化 / 重量提取
// ==========================================

use once_cell::sync::Lazy;
use regex::Regex;

/// "<数字> kg" 模式(不区分大小写,数字与单位间允许空白)
static WEIGHT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*kg").expect("weight pattern is a valid regex")
});

pub struct DataCleaner;

impl DataCleaner {
    /// 清洗文本字段（TRIM + 合并连续空白）
    pub fn clean_text(&self, value: &str) -> String {
        value.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// 标准化 NULL 值（空字符串/空白 → None）
    pub fn normalize_null(&self, value: Option<&str>) -> Option<String> {
        value.and_then(|v| {
            let cleaned = self.clean_text(v);
            if cleaned.is_empty() {
                None
            } else {
                Some(cleaned)
            }
        })
    }

    /// 从订单描述中提取重量（公斤）
    ///
    /// 取第一个 "<数字> kg" 匹配,无匹配返回 0.0
    pub fn parse_weight_kg(&self, text: &str) -> f64 {
        WEIGHT_PATTERN
            .captures(text)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<f64>().ok())
            .filter(|w| w.is_finite())
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text_basic() {
        let cleaner = DataCleaner;
        assert_eq!(cleaner.clean_text("  Mango   Ave  "), "Mango Ave");
    }

    #[test]
    fn test_normalize_null() {
        let cleaner = DataCleaner;
        assert_eq!(cleaner.normalize_null(Some("  ")), None);
        assert_eq!(cleaner.normalize_null(Some("")), None);
        assert_eq!(cleaner.normalize_null(Some("  value  ")), Some("value".to_string()));
        assert_eq!(cleaner.normalize_null(None), None);
    }

    #[test]
    fn test_parse_weight_kg() {
        let cleaner = DataCleaner;
        assert_eq!(cleaner.parse_weight_kg("12kg"), 12.0);
        assert_eq!(cleaner.parse_weight_kg("3.5 KG"), 3.5);
        assert_eq!(cleaner.parse_weight_kg("heavy"), 0.0);
        assert_eq!(cleaner.parse_weight_kg("Rice 25 kg, Oil 3kg"), 25.0);
        assert_eq!(cleaner.parse_weight_kg(""), 0.0);
    }
}
