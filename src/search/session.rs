//! Session interfaces the engine drives (primitive operations only) / 引擎使用的会话接口
//!
//! The engine only talks to these traits; the Xunsearch client implements
//! them over TCP and tests implement them in memory.

use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;

use crate::client::{Document, Hit};

/// Opens index and search sessions for a project / 打开索引与搜索会话
#[async_trait]
pub trait SearchConnector: Send + Sync {
    /// Open an index session on project `name` / 打开索引会话
    async fn init_index(&self, name: &str) -> Result<Box<dyn IndexSession>>;

    /// Open a search session on project `name` / 打开搜索会话
    async fn init_search(&self, name: &str) -> Result<Box<dyn SearchSession>>;

    /// Name of the primary key field stored in every hit / 主键字段名
    fn primary_key(&self) -> &str;
}

/// Index-side primitives / 索引原语
#[async_trait]
pub trait IndexSession: Send {
    /// Add or replace a document by primary key / 按主键新增或替换文档
    async fn update(&mut self, doc: Document) -> Result<()>;

    /// Remove a document by primary key / 按主键删除文档
    async fn del(&mut self, key: &str) -> Result<()>;

    /// Drop every document of the project / 清空项目
    async fn clean(&mut self) -> Result<()>;

    /// Commit pending changes; `false` when the server is busy / 提交变更
    async fn flush_index(&mut self) -> Result<bool>;
}

/// Search-side primitives / 搜索原语
#[async_trait]
pub trait SearchSession: Send {
    fn set_query(&mut self, query: &str);

    /// Inclusive range; a missing bound turns it into a one-sided comparison / 闭区间
    fn add_range(&mut self, field: &str, from: Option<&str>, to: Option<&str>) -> Result<()>;

    fn add_weight(&mut self, field: &str, term: &str, scale: f32) -> Result<()>;

    fn set_fuzzy(&mut self, fuzzy: bool);

    fn set_facets(&mut self, fields: &[String], exact: bool) -> Result<()>;

    fn set_collapse(&mut self, field: &str, num: u32) -> Result<()>;

    /// Sort by `(field, ascending)` pairs; empty means relevance / 排序
    fn set_sort(&mut self, sorts: &[(String, bool)]) -> Result<()>;

    fn set_limit(&mut self, limit: usize, offset: usize);

    async fn search(&mut self) -> Result<Vec<Hit>>;

    /// Total matches reported by the last search / 上次搜索的匹配总数
    fn last_count(&self) -> u64;

    /// Facet counts of `field` from the last search / 分面统计
    fn facets(&self, field: &str) -> BTreeMap<String, u32>;
}
