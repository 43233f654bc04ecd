//! Typed where-filters and their query modifiers / 过滤条件

use std::fmt;

use anyhow::Result;

use super::session::SearchSession;

/// Filter attached to a field of a search request / 字段过滤条件
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Inclusive range / 闭区间
    Range { from: Option<String>, to: Option<String> },
    /// Boost documents having `term` in the field / 字段权重
    Weight { term: String, scale: f32 },
    /// Fuzzy matching toggle / 模糊匹配开关
    Fuzzy(bool),
    /// Facet aggregation over `fields` / 分面统计
    Facets { fields: Vec<String>, exact: bool },
    /// Keep at most `n` results per field value / 折叠
    Collapse(u32),
    /// Exact value, same as `value..=value` / 精确匹配
    Exact(String),
}

impl Filter {
    pub fn between(from: impl ToString, to: impl ToString) -> Self {
        Filter::Range { from: Some(from.to_string()), to: Some(to.to_string()) }
    }

    pub fn at_least(from: impl ToString) -> Self {
        Filter::Range { from: Some(from.to_string()), to: None }
    }

    pub fn at_most(to: impl ToString) -> Self {
        Filter::Range { from: None, to: Some(to.to_string()) }
    }

    pub fn weight(term: impl Into<String>) -> Self {
        Filter::Weight { term: term.into(), scale: 1.0 }
    }

    pub fn facets<I, S>(fields: I, exact: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Filter::Facets { fields: fields.into_iter().map(Into::into).collect(), exact }
    }

    pub fn exact(value: impl ToString) -> Self {
        Filter::Exact(value.to_string())
    }

    /// Apply this filter on `field` to a search session / 应用到搜索会话
    pub fn apply(&self, field: &str, search: &mut dyn SearchSession) -> Result<()> {
        match self {
            Filter::Range { from, to } => search.add_range(field, from.as_deref(), to.as_deref()),
            Filter::Weight { term, scale } => search.add_weight(field, term, *scale),
            Filter::Fuzzy(on) => {
                search.set_fuzzy(*on);
                Ok(())
            }
            Filter::Facets { fields, exact } => search.set_facets(fields, *exact),
            Filter::Collapse(n) => search.set_collapse(field, *n),
            Filter::Exact(value) => search.add_range(field, Some(value.as_str()), Some(value.as_str())),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Range { from, to } => write!(
                f,
                "{},{}",
                from.as_deref().unwrap_or(""),
                to.as_deref().unwrap_or("")
            ),
            Filter::Weight { term, .. } => f.write_str(term),
            Filter::Fuzzy(on) => write!(f, "{}", *on as u8),
            Filter::Facets { fields, .. } => f.write_str(&fields.join(",")),
            Filter::Collapse(n) => write!(f, "{}", n),
            Filter::Exact(value) => f.write_str(value),
        }
    }
}

impl From<&str> for Filter {
    fn from(value: &str) -> Self {
        Filter::Exact(value.to_string())
    }
}

impl From<String> for Filter {
    fn from(value: String) -> Self {
        Filter::Exact(value)
    }
}

impl From<i64> for Filter {
    fn from(value: i64) -> Self {
        Filter::Exact(value.to_string())
    }
}
