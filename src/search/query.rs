//! Boolean query builder / 布尔查询构造
//!
//! Strict form: `top AND (k2 OR k3 ...)`. Relaxed form: `k1 OR k2 OR ...`.

use super::tokenizer::{contains_cjk, KeywordTokenizer, KEYWORD_POS, TOP_KEYWORDS};

/// Keywords used for `text`, most relevant first / 查询关键词
///
/// When the tokenizer finds nothing (e.g. only stop words or latin words
/// carrying other tags), non-CJK text falls back to its whitespace-separated
/// words and CJK text to the whole trimmed string.
pub fn query_keywords(tokenizer: &dyn KeywordTokenizer, text: &str) -> Vec<String> {
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }

    let keywords: Vec<String> = tokenizer
        .top_keywords(text, TOP_KEYWORDS, KEYWORD_POS)
        .into_iter()
        .map(|k| k.word)
        .filter(|w| !w.trim().is_empty())
        .collect();
    if !keywords.is_empty() {
        return keywords;
    }

    if contains_cjk(text) {
        vec![text.to_string()]
    } else {
        text.split_whitespace()
            .take(TOP_KEYWORDS)
            .map(str::to_string)
            .collect()
    }
}

/// Build the engine query string / 构造查询字符串
pub fn build_query(tokenizer: &dyn KeywordTokenizer, text: &str, relaxed: bool) -> String {
    let keywords = query_keywords(tokenizer, text);
    join_keywords(&keywords, relaxed)
}

/// Join keywords into a boolean expression / 拼接布尔表达式
pub fn join_keywords(keywords: &[String], relaxed: bool) -> String {
    if keywords.len() < 2 || relaxed {
        return keywords.join(" OR ");
    }
    format!("{} AND ({})", keywords[0], keywords[1..].join(" OR "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::tokenizer::Keyword;

    /// Returns a fixed keyword list / 固定关键词
    struct FixedTokenizer(Vec<&'static str>);

    impl KeywordTokenizer for FixedTokenizer {
        fn top_keywords(&self, _text: &str, limit: usize, _pos: &[&str]) -> Vec<Keyword> {
            self.0
                .iter()
                .take(limit)
                .enumerate()
                .map(|(i, w)| Keyword::new(*w, 10.0 - i as f64))
                .collect()
        }
    }

    #[test]
    fn test_strict_query() {
        let t = FixedTokenizer(vec!["手机", "苹果", "价格"]);
        assert_eq!(build_query(&t, "苹果手机价格", false), "手机 AND (苹果 OR 价格)");
    }

    #[test]
    fn test_relaxed_query() {
        let t = FixedTokenizer(vec!["手机", "苹果", "价格"]);
        assert_eq!(build_query(&t, "苹果手机价格", true), "手机 OR 苹果 OR 价格");
    }

    #[test]
    fn test_single_keyword_is_or_form() {
        let t = FixedTokenizer(vec!["手机"]);
        assert_eq!(build_query(&t, "手机", false), "手机");
    }

    #[test]
    fn test_two_keywords() {
        let t = FixedTokenizer(vec!["手机", "苹果"]);
        assert_eq!(build_query(&t, "苹果手机", false), "手机 AND (苹果)");
    }

    #[test]
    fn test_top_five_only() {
        let t = FixedTokenizer(vec!["a", "b", "c", "d", "e", "f", "g"]);
        assert_eq!(build_query(&t, "x", true), "a OR b OR c OR d OR e");
    }

    #[test]
    fn test_empty_query() {
        let t = FixedTokenizer(vec!["unused"]);
        assert_eq!(build_query(&t, "   ", false), "");
    }

    #[test]
    fn test_fallback_without_keywords() {
        let t = FixedTokenizer(vec![]);
        assert_eq!(build_query(&t, "rust search", false), "rust AND (search)");
        assert_eq!(build_query(&t, " 的了 ", false), "的了");
    }
}
