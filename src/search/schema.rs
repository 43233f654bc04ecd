//! Raw search results / 原始搜索结果

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::client::Hit;

/// Facet counts per field: field -> value -> count / 分面统计
pub type Facets = BTreeMap<String, BTreeMap<String, u32>>;

/// Result of one executed search / 一次搜索的结果
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResults {
    /// Hits of the requested page, in rank order / 当前页命中
    pub hits: Vec<Hit>,
    /// Total matches reported by the server / 匹配总数
    pub total: u64,
    /// Facet counts of every requested facet field / 分面统计
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub facets: Facets,
    /// Whether the relaxed (OR) query produced these hits / 是否为宽松查询结果
    #[serde(default)]
    pub relaxed: bool,
}

impl SearchResults {
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}
