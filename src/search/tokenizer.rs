//! Keyword tokenizer - uses jieba-rs TF-IDF extraction / 关键词分词器
//!
//! Supports / 支持：
//! - Chinese word segmentation with part-of-speech tags (jieba) / 带词性的中文分词
//! - Top-N keyword extraction weighted by relevance / 按相关度提取前 N 个关键词

use jieba_rs::{Jieba, KeywordExtract, TfIdf};
use once_cell::sync::Lazy;

/// Global jieba tokenizer instance / 全局 jieba 分词器实例
static JIEBA: Lazy<Jieba> = Lazy::new(Jieba::new);

/// Global TF-IDF extractor with the bundled IDF dictionary / 全局 TF-IDF 提取器
static TFIDF: Lazy<TfIdf> = Lazy::new(TfIdf::default);

/// Number of keywords used to build a query / 构造查询使用的关键词数量
pub const TOP_KEYWORDS: usize = 5;

/// Noun and verb-like tags kept for queries / 查询保留的名词、动词类词性
pub const KEYWORD_POS: &[&str] = &["n", "nr", "ns", "nz", "v", "vn"];

/// Weighted keyword / 带权重的关键词
#[derive(Debug, Clone, PartialEq)]
pub struct Keyword {
    pub word: String,
    pub weight: f64,
}

impl Keyword {
    pub fn new(word: impl Into<String>, weight: f64) -> Self {
        Self { word: word.into(), weight }
    }
}

/// Extracts the most relevant keywords of a text / 提取文本的关键词
pub trait KeywordTokenizer: Send + Sync {
    /// At most `limit` keywords tagged with one of `allowed_pos`,
    /// highest weight first / 按权重降序返回
    fn top_keywords(&self, text: &str, limit: usize, allowed_pos: &[&str]) -> Vec<Keyword>;
}

/// Default tokenizer backed by jieba / 基于 jieba 的默认分词器
#[derive(Debug, Clone, Copy, Default)]
pub struct JiebaTokenizer;

impl KeywordTokenizer for JiebaTokenizer {
    fn top_keywords(&self, text: &str, limit: usize, allowed_pos: &[&str]) -> Vec<Keyword> {
        let allowed: Vec<String> = allowed_pos.iter().map(|p| p.to_string()).collect();
        TFIDF
            .extract_keywords(&JIEBA, text, limit, allowed)
            .into_iter()
            .map(|k| Keyword::new(k.keyword, k.weight))
            .collect()
    }
}

/// Check if text contains CJK characters (Chinese, Japanese, Korean) / 检测文本是否包含CJK字符
pub fn contains_cjk(text: &str) -> bool {
    text.chars().any(|c| {
        matches!(c,
            '\u{4e00}'..='\u{9fff}' |  // CJK Unified Ideographs
            '\u{3400}'..='\u{4dbf}' |  // CJK Extension A
            '\u{3040}'..='\u{309f}' |  // Hiragana
            '\u{30a0}'..='\u{30ff}' |  // Katakana
            '\u{ac00}'..='\u{d7af}'    // Hangul Syllables
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_keywords_chinese() {
        let keywords = JiebaTokenizer.top_keywords(
            "今天纽约的天气真好啊，京华大酒店的张尧经理吃了一只北京烤鸭",
            TOP_KEYWORDS,
            KEYWORD_POS,
        );
        assert!(!keywords.is_empty());
        assert!(keywords.len() <= TOP_KEYWORDS);
        // 按权重降序
        for pair in keywords.windows(2) {
            assert!(pair[0].weight >= pair[1].weight);
        }
        println!("Keywords: {:?}", keywords);
    }

    #[test]
    fn test_top_keywords_pos_filter() {
        fn words(pos: &[&str]) -> Vec<String> {
            JiebaTokenizer
                .top_keywords("非常美丽", TOP_KEYWORDS, pos)
                .into_iter()
                .map(|k| k.word)
                .collect()
        }

        // 副词 "非常" 只在不限词性时出现
        let all = words(&[]);
        assert!(all.contains(&"非常".to_string()));

        let filtered = words(KEYWORD_POS);
        assert!(!filtered.contains(&"非常".to_string()));
        assert!(filtered.len() < all.len());
    }

    #[test]
    fn test_top_keywords_limit() {
        let keywords = JiebaTokenizer.top_keywords(
            "北京 上海 广州 深圳 杭州 南京 武汉 成都",
            2,
            KEYWORD_POS,
        );
        assert!(keywords.len() <= 2);
    }

    #[test]
    fn test_top_keywords_empty() {
        assert!(JiebaTokenizer.top_keywords("", TOP_KEYWORDS, KEYWORD_POS).is_empty());
    }

    #[test]
    fn test_contains_cjk() {
        assert!(contains_cjk("测试"));
        assert!(contains_cjk("test测试"));
        assert!(!contains_cjk("test"));
    }
}
