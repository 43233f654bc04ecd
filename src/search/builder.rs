//! Search request builder / 搜索请求构造器

use std::sync::Arc;

use anyhow::Result;

use super::operators::Filter;
use super::session::SearchSession;
use crate::models::Searchable;

/// Sort direction / 排序方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl From<&str> for Direction {
    fn from(s: &str) -> Self {
        if s.eq_ignore_ascii_case("desc") {
            Direction::Desc
        } else {
            Direction::Asc
        }
    }
}

/// Options computed by the engine for one request / 一次请求的执行选项
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchOptions {
    /// `field=value` rendering of every filter / 过滤条件字符串
    pub numeric_filters: Vec<String>,
    pub hits_per_page: Option<usize>,
    /// Zero-based page index / 从 0 开始的页码
    pub page: Option<usize>,
}

/// Replaces the default query translation / 自定义查询回调
///
/// Receives the raw session, the raw query text and the options, and
/// configures the session itself.
pub type SearchCallback =
    Arc<dyn Fn(&mut dyn SearchSession, &str, &SearchOptions) -> Result<()> + Send + Sync>;

/// Abstract search request / 抽象搜索请求
#[derive(Clone)]
pub struct SearchBuilder {
    pub index: String,
    pub query: String,
    /// Filters in insertion order / 按添加顺序的过滤条件
    pub wheres: Vec<(String, Filter)>,
    pub orders: Vec<(String, Direction)>,
    pub limit: Option<usize>,
    pub callback: Option<SearchCallback>,
}

impl SearchBuilder {
    pub fn new(index: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            query: query.into(),
            wheres: Vec::new(),
            orders: Vec::new(),
            limit: None,
            callback: None,
        }
    }

    /// Search the index of a model / 搜索模型所在索引
    pub fn for_model<M: Searchable>(model: &M, query: impl Into<String>) -> Self {
        Self::new(model.searchable_as(), query)
    }

    pub fn within(mut self, index: impl Into<String>) -> Self {
        self.index = index.into();
        self
    }

    /// Add a typed filter; a later filter on the same field replaces it / 添加过滤条件
    pub fn where_filter(mut self, field: impl Into<String>, filter: Filter) -> Self {
        let field = field.into();
        match self.wheres.iter_mut().find(|(f, _)| *f == field) {
            Some(entry) => entry.1 = filter,
            None => self.wheres.push((field, filter)),
        }
        self
    }

    /// Exact-value filter / 精确值过滤
    pub fn where_eq(self, field: impl Into<String>, value: impl Into<Filter>) -> Self {
        self.where_filter(field, value.into())
    }

    pub fn order_by(mut self, column: impl Into<String>, direction: impl Into<Direction>) -> Self {
        self.orders.push((column.into(), direction.into()));
        self
    }

    pub fn take(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&mut dyn SearchSession, &str, &SearchOptions) -> Result<()> + Send + Sync + 'static,
    {
        self.callback = Some(Arc::new(callback));
        self
    }

    /// `field=value` strings for every filter / 过滤条件字符串
    pub fn filters(&self) -> Vec<String> {
        self.wheres
            .iter()
            .map(|(field, filter)| format!("{}={}", field, filter))
            .collect()
    }
}
