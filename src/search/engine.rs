//! Search engine adapter / 搜索引擎适配器
//!
//! Architecture principle: translate requests, do not control flow / 架构原则
//! - update / delete / flush: index primitives / 索引原语
//! - search / paginate: query translation + fallback retry / 查询转换与回退重试
//! - map_ids / map: hit to record mapping / 命中到记录的映射

use std::collections::{HashMap, HashSet};

use anyhow::{anyhow, Result};

use super::builder::{Direction, SearchBuilder, SearchOptions};
use super::operators::Filter;
use super::query::build_query;
use super::schema::{Facets, SearchResults};
use super::session::{SearchConnector, SearchSession};
use super::tokenizer::{JiebaTokenizer, KeywordTokenizer};
use crate::client::search::PAGE_SIZE;
use crate::client::Document;
use crate::models::Searchable;
use crate::repository::ModelRepository;

/// Pages with fewer hits than this are retried once with the relaxed query / 回退阈值
pub const FALLBACK_THRESHOLD: usize = 3;

/// Xunsearch-backed search engine / 基于 Xunsearch 的搜索引擎
pub struct XunsearchEngine<C, T = JiebaTokenizer> {
    connector: C,
    tokenizer: T,
}

impl<C: SearchConnector> XunsearchEngine<C> {
    /// Engine using the jieba tokenizer / 使用 jieba 分词的引擎
    pub fn new(connector: C) -> Self {
        Self::with_tokenizer(connector, JiebaTokenizer)
    }
}

impl<C: SearchConnector, T: KeywordTokenizer> XunsearchEngine<C, T> {
    pub fn with_tokenizer(connector: C, tokenizer: T) -> Self {
        Self { connector, tokenizer }
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Update the given models in the index / 更新模型索引
    pub async fn update<M: Searchable>(&self, models: &[M]) -> Result<()> {
        let Some(first) = models.first() else {
            return Ok(());
        };
        let mut index = self.connector.init_index(&first.searchable_as()).await?;

        let mut indexed = 0usize;
        for model in models {
            let array = model.to_searchable_array();
            if array.is_empty() {
                continue;
            }

            let mut doc = Document::new();
            doc.set_field(model.key_name(), model.key());
            doc.set_fields(array);
            index.update(doc).await?;
            indexed += 1;
        }

        index.flush_index().await?;
        tracing::info!(
            "Indexed {} of {} models into {}",
            indexed,
            models.len(),
            first.searchable_as()
        );
        Ok(())
    }

    /// Remove the given models from the index / 从索引中删除模型
    pub async fn delete<M: Searchable>(&self, models: &[M]) -> Result<()> {
        let Some(first) = models.first() else {
            return Ok(());
        };
        let mut index = self.connector.init_index(&first.searchable_as()).await?;

        for model in models {
            index.del(&model.key()).await?;
        }

        index.flush_index().await?;
        tracing::info!("Removed {} models from {}", models.len(), first.searchable_as());
        Ok(())
    }

    /// Run the search with the builder's own limit / 按构造器限制执行搜索
    pub async fn search(&self, builder: &SearchBuilder) -> Result<SearchResults> {
        let options = SearchOptions {
            numeric_filters: builder.filters(),
            hits_per_page: builder.limit,
            page: None,
        };
        self.perform_search(builder, &options, false).await
    }

    /// Run the search for a 1-based `page` / 分页搜索（页码从 1 开始）
    pub async fn paginate(
        &self,
        builder: &SearchBuilder,
        per_page: usize,
        page: usize,
    ) -> Result<SearchResults> {
        let options = SearchOptions {
            numeric_filters: builder.filters(),
            hits_per_page: Some(per_page),
            page: Some(page.saturating_sub(1)),
        };
        self.perform_search(builder, &options, false).await
    }

    /// Execute with a single relaxed retry on thin results / 执行搜索，结果过少时宽松重试一次
    pub async fn perform_search(
        &self,
        builder: &SearchBuilder,
        options: &SearchOptions,
        relaxed: bool,
    ) -> Result<SearchResults> {
        let results = self.execute(builder, options, relaxed).await?;
        if relaxed || builder.callback.is_some() || results.hits.len() >= FALLBACK_THRESHOLD {
            return Ok(results);
        }

        // Single keyword or blank text: the relaxed query is the same one
        let strict = build_query(&self.tokenizer, &builder.query, false);
        if strict == build_query(&self.tokenizer, &builder.query, true) {
            return Ok(results);
        }

        tracing::debug!(
            "Only {} hits for {:?} on {}, retrying with relaxed query",
            results.hits.len(),
            builder.query,
            builder.index
        );
        self.execute(builder, options, true).await
    }

    async fn execute(
        &self,
        builder: &SearchBuilder,
        options: &SearchOptions,
        relaxed: bool,
    ) -> Result<SearchResults> {
        let limit = options.hits_per_page.unwrap_or(PAGE_SIZE);
        let offset = match options.page {
            Some(page) => limit
                .checked_mul(page)
                .ok_or_else(|| anyhow!("page {} with {} hits per page is out of range", page, limit))?,
            None => 0,
        };

        let mut search = self.connector.init_search(&builder.index).await?;

        if let Some(callback) = &builder.callback {
            search.set_limit(limit, offset);
            callback(search.as_mut(), &builder.query, options)?;
            return collect(search.as_mut(), builder, false).await;
        }

        let query = build_query(&self.tokenizer, &builder.query, relaxed);
        tracing::debug!("Query for {:?}: {:?} (relaxed={})", builder.query, query, relaxed);
        search.set_query(&query);

        for (field, filter) in &builder.wheres {
            filter.apply(field, search.as_mut())?;
        }

        if !builder.orders.is_empty() {
            let sorts: Vec<(String, bool)> = builder
                .orders
                .iter()
                .map(|(column, direction)| (column.clone(), *direction == Direction::Asc))
                .collect();
            search.set_sort(&sorts)?;
        }

        search.set_limit(limit, offset);
        collect(search.as_mut(), builder, relaxed).await
    }

    /// Primary keys of the hits, in hit order / 命中的主键
    pub fn map_ids(&self, results: &SearchResults) -> Vec<String> {
        let key = self.connector.primary_key();
        results
            .hits
            .iter()
            .filter_map(|hit| hit.get(key).map(str::to_string))
            .collect()
    }

    /// Hydrate hits from the backing store, keeping hit order / 回填模型，保持命中顺序
    ///
    /// Hits whose record no longer exists are dropped.
    pub async fn map<M, R>(&self, results: &SearchResults, repository: &R) -> Result<Vec<M>>
    where
        M: Searchable + Clone,
        R: ModelRepository<M> + ?Sized,
    {
        if results.hits.is_empty() {
            return Ok(Vec::new());
        }

        let key_name = repository.key_name();
        let keys: Vec<String> = results
            .hits
            .iter()
            .filter_map(|hit| hit.get(key_name).map(str::to_string))
            .collect();

        let mut seen = HashSet::new();
        let unique: Vec<String> = keys.iter().filter(|k| seen.insert(*k)).cloned().collect();

        let models: HashMap<String, M> = repository
            .find_by_keys(&unique)
            .await?
            .into_iter()
            .map(|m| (m.key(), m))
            .collect();

        Ok(keys.iter().filter_map(|k| models.get(k).cloned()).collect())
    }

    /// Total matches of a result / 结果总数
    pub fn total_count(&self, results: &SearchResults) -> u64 {
        results.total
    }

    /// Drop every document of a model's index / 清空模型索引
    pub async fn flush<M: Searchable>(&self, model: &M) -> Result<()> {
        let mut index = self.connector.init_index(&model.searchable_as()).await?;
        index.clean().await?;
        index.flush_index().await?;
        Ok(())
    }
}

/// Run the search and gather hits, total and facets / 执行并收集结果
async fn collect(
    search: &mut dyn SearchSession,
    builder: &SearchBuilder,
    relaxed: bool,
) -> Result<SearchResults> {
    let hits = search.search().await?;

    let mut facets = Facets::new();
    for (_, filter) in &builder.wheres {
        if let Filter::Facets { fields, .. } = filter {
            for field in fields {
                facets.insert(field.clone(), search.facets(field));
            }
        }
    }

    Ok(SearchResults {
        hits,
        total: search.last_count(),
        facets,
        relaxed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Hit;
    use crate::models::Record;
    use crate::search::session::IndexSession;
    use crate::search::tokenizer::Keyword;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    /// Calls recorded by the fake sessions / 假会话记录的调用
    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Open(String),
        Query(String),
        Range(String, Option<String>, Option<String>),
        Weight(String, String),
        Fuzzy(bool),
        Facets(Vec<String>, bool),
        Collapse(String, u32),
        Sort(Vec<(String, bool)>),
        Limit(usize, usize),
        Search,
        Update(BTreeMap<String, String>),
        Del(String),
        Clean,
        Flush,
    }

    type Log = Arc<Mutex<Vec<Call>>>;

    /// Returns `hits_for(query)` documents for every search / 按查询返回命中数
    struct FakeConnector {
        log: Log,
        hits_for: fn(&str) -> usize,
    }

    struct FakeSearch {
        log: Log,
        query: String,
        hits_for: fn(&str) -> usize,
    }

    struct FakeIndex {
        log: Log,
    }

    #[async_trait]
    impl SearchConnector for FakeConnector {
        async fn init_index(&self, name: &str) -> Result<Box<dyn IndexSession>> {
            self.log.lock().push(Call::Open(name.to_string()));
            Ok(Box::new(FakeIndex { log: self.log.clone() }))
        }

        async fn init_search(&self, name: &str) -> Result<Box<dyn SearchSession>> {
            self.log.lock().push(Call::Open(name.to_string()));
            Ok(Box::new(FakeSearch {
                log: self.log.clone(),
                query: String::new(),
                hits_for: self.hits_for,
            }))
        }

        fn primary_key(&self) -> &str {
            "id"
        }
    }

    #[async_trait]
    impl IndexSession for FakeIndex {
        async fn update(&mut self, doc: Document) -> Result<()> {
            self.log.lock().push(Call::Update(doc.fields().clone()));
            Ok(())
        }

        async fn del(&mut self, key: &str) -> Result<()> {
            self.log.lock().push(Call::Del(key.to_string()));
            Ok(())
        }

        async fn clean(&mut self) -> Result<()> {
            self.log.lock().push(Call::Clean);
            Ok(())
        }

        async fn flush_index(&mut self) -> Result<bool> {
            self.log.lock().push(Call::Flush);
            Ok(true)
        }
    }

    #[async_trait]
    impl SearchSession for FakeSearch {
        fn set_query(&mut self, query: &str) {
            self.query = query.to_string();
            self.log.lock().push(Call::Query(query.to_string()));
        }

        fn add_range(&mut self, field: &str, from: Option<&str>, to: Option<&str>) -> Result<()> {
            self.log.lock().push(Call::Range(
                field.to_string(),
                from.map(str::to_string),
                to.map(str::to_string),
            ));
            Ok(())
        }

        fn add_weight(&mut self, field: &str, term: &str, _scale: f32) -> Result<()> {
            self.log.lock().push(Call::Weight(field.to_string(), term.to_string()));
            Ok(())
        }

        fn set_fuzzy(&mut self, fuzzy: bool) {
            self.log.lock().push(Call::Fuzzy(fuzzy));
        }

        fn set_facets(&mut self, fields: &[String], exact: bool) -> Result<()> {
            self.log.lock().push(Call::Facets(fields.to_vec(), exact));
            Ok(())
        }

        fn set_collapse(&mut self, field: &str, num: u32) -> Result<()> {
            self.log.lock().push(Call::Collapse(field.to_string(), num));
            Ok(())
        }

        fn set_sort(&mut self, sorts: &[(String, bool)]) -> Result<()> {
            self.log.lock().push(Call::Sort(sorts.to_vec()));
            Ok(())
        }

        fn set_limit(&mut self, limit: usize, offset: usize) {
            self.log.lock().push(Call::Limit(limit, offset));
        }

        async fn search(&mut self) -> Result<Vec<Hit>> {
            self.log.lock().push(Call::Search);
            let count = (self.hits_for)(&self.query);
            Ok((1..=count)
                .map(|i| {
                    let mut hit = Hit { docid: i as u32, ..Default::default() };
                    hit.fields.insert("id".to_string(), i.to_string());
                    hit
                })
                .collect())
        }

        fn last_count(&self) -> u64 {
            (self.hits_for)(&self.query) as u64 * 10
        }

        fn facets(&self, field: &str) -> BTreeMap<String, u32> {
            BTreeMap::from([(format!("{}-value", field), 4)])
        }
    }

    struct FixedTokenizer;

    impl KeywordTokenizer for FixedTokenizer {
        fn top_keywords(&self, text: &str, limit: usize, _pos: &[&str]) -> Vec<Keyword> {
            text.split_whitespace()
                .take(limit)
                .map(|w| Keyword::new(w, 1.0))
                .collect()
        }
    }

    fn engine(hits_for: fn(&str) -> usize) -> (XunsearchEngine<FakeConnector, FixedTokenizer>, Log) {
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let connector = FakeConnector { log: log.clone(), hits_for };
        (XunsearchEngine::with_tokenizer(connector, FixedTokenizer), log)
    }

    fn calls(log: &Log) -> Vec<Call> {
        log.lock().clone()
    }

    #[tokio::test]
    async fn test_filters_mapped_to_modifiers() {
        let (engine, log) = engine(|_| 5);
        let builder = SearchBuilder::new("posts", "apple phone")
            .where_filter("price", Filter::between(10, 20))
            .where_filter("title", Filter::weight("iphone"))
            .where_filter("fuzzy", Filter::Fuzzy(true))
            .where_filter("_facets", Filter::facets(["category"], true))
            .where_filter("category", Filter::Collapse(2))
            .where_eq("status", "published")
            .take(5);

        let results = engine.search(&builder).await.unwrap();
        assert_eq!(results.hits.len(), 5);
        assert_eq!(results.total, 50);
        assert!(!results.relaxed);

        assert_eq!(
            calls(&log),
            vec![
                Call::Open("posts".to_string()),
                Call::Query("apple AND (phone)".to_string()),
                Call::Range("price".to_string(), Some("10".to_string()), Some("20".to_string())),
                Call::Weight("title".to_string(), "iphone".to_string()),
                Call::Fuzzy(true),
                Call::Facets(vec!["category".to_string()], true),
                Call::Collapse("category".to_string(), 2),
                Call::Range(
                    "status".to_string(),
                    Some("published".to_string()),
                    Some("published".to_string())
                ),
                Call::Limit(5, 0),
                Call::Search,
            ]
        );
        assert_eq!(results.facets["category"]["category-value"], 4);
    }

    #[tokio::test]
    async fn test_paginate_offset() {
        let (engine, log) = engine(|_| 10);
        let builder = SearchBuilder::new("posts", "rust");

        engine.paginate(&builder, 15, 3).await.unwrap();
        assert!(calls(&log).contains(&Call::Limit(15, 30)));
    }

    #[tokio::test]
    async fn test_paginate_offset_overflow() {
        let (engine, log) = engine(|_| 10);
        let builder = SearchBuilder::new("posts", "rust");

        assert!(engine.paginate(&builder, 10, usize::MAX).await.is_err());
        assert!(calls(&log).is_empty());
    }

    #[tokio::test]
    async fn test_default_page_size() {
        let (engine, log) = engine(|_| 10);
        engine.search(&SearchBuilder::new("posts", "rust")).await.unwrap();
        assert!(calls(&log).contains(&Call::Limit(PAGE_SIZE, 0)));
    }

    #[tokio::test]
    async fn test_orders() {
        let (engine, log) = engine(|_| 10);
        let builder = SearchBuilder::new("posts", "rust")
            .order_by("created", "desc")
            .order_by("price", "asc");
        engine.search(&builder).await.unwrap();
        assert!(calls(&log).contains(&Call::Sort(vec![
            ("created".to_string(), false),
            ("price".to_string(), true),
        ])));
    }

    #[tokio::test]
    async fn test_fallback_to_relaxed_query() {
        // strict query finds 1 hit, relaxed finds 4 / 严格查询 1 条，宽松查询 4 条
        let (engine, log) = engine(|q| if q.contains(" AND ") { 1 } else { 4 });
        let builder = SearchBuilder::new("posts", "apple phone case");

        let results = engine.search(&builder).await.unwrap();
        assert!(results.relaxed);
        assert_eq!(results.hits.len(), 4);

        let queries: Vec<Call> = calls(&log)
            .into_iter()
            .filter(|c| matches!(c, Call::Query(_)))
            .collect();
        assert_eq!(
            queries,
            vec![
                Call::Query("apple AND (phone OR case)".to_string()),
                Call::Query("apple OR phone OR case".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_fallback_retries_only_once() {
        let (engine, log) = engine(|_| 0);
        let results = engine.search(&SearchBuilder::new("posts", "a b")).await.unwrap();
        assert!(results.relaxed);
        assert!(results.is_empty());

        let searches = calls(&log).into_iter().filter(|c| *c == Call::Search).count();
        assert_eq!(searches, 2);
    }

    #[tokio::test]
    async fn test_single_keyword_not_retried() {
        let (engine, log) = engine(|_| 0);
        let results = engine.search(&SearchBuilder::new("posts", "rust")).await.unwrap();
        assert!(!results.relaxed);

        let searches = calls(&log).into_iter().filter(|c| *c == Call::Search).count();
        assert_eq!(searches, 1);
    }

    #[tokio::test]
    async fn test_blank_query_not_retried() {
        let (engine, log) = engine(|_| 0);
        engine.search(&SearchBuilder::new("posts", "  ")).await.unwrap();
        let searches = calls(&log).into_iter().filter(|c| *c == Call::Search).count();
        assert_eq!(searches, 1);
    }

    #[tokio::test]
    async fn test_relaxed_request_not_retried() {
        let (engine, log) = engine(|_| 0);
        let builder = SearchBuilder::new("posts", "a b");
        let results = engine
            .perform_search(&builder, &SearchOptions::default(), true)
            .await
            .unwrap();
        assert!(results.relaxed);
        assert_eq!(
            calls(&log),
            vec![
                Call::Open("posts".to_string()),
                Call::Query("a OR b".to_string()),
                Call::Limit(PAGE_SIZE, 0),
                Call::Search,
            ]
        );
    }

    #[tokio::test]
    async fn test_no_fallback_at_threshold() {
        let (engine, log) = engine(|_| FALLBACK_THRESHOLD);
        engine.search(&SearchBuilder::new("posts", "a b")).await.unwrap();
        let searches = calls(&log).into_iter().filter(|c| *c == Call::Search).count();
        assert_eq!(searches, 1);
    }

    #[tokio::test]
    async fn test_callback_replaces_translation() {
        let (engine, log) = engine(|_| 1);
        let builder = SearchBuilder::new("posts", "raw query")
            .where_eq("status", "x")
            .with_callback(|search, query, options| {
                assert_eq!(options.numeric_filters, vec!["status=x".to_string()]);
                search.set_query(&format!("title:{}", query));
                Ok(())
            });

        engine.search(&builder).await.unwrap();
        assert_eq!(
            calls(&log),
            vec![
                Call::Open("posts".to_string()),
                Call::Limit(PAGE_SIZE, 0),
                Call::Query("title:raw query".to_string()),
                Call::Search,
            ]
        );
    }

    #[tokio::test]
    async fn test_update_skips_empty_models() {
        let (engine, log) = engine(|_| 0);
        let models = vec![
            Record::new("posts", "id").with("id", 1).with("title", "hello"),
            Record::new("posts", "id"),
        ];
        engine.update(&models).await.unwrap();

        let log = calls(&log);
        assert_eq!(log.first(), Some(&Call::Open("posts".to_string())));
        let updates: Vec<&Call> = log.iter().filter(|c| matches!(c, Call::Update(_))).collect();
        assert_eq!(updates.len(), 1);
        if let Call::Update(fields) = updates[0] {
            assert_eq!(fields.get("id").map(String::as_str), Some("1"));
            assert_eq!(fields.get("title").map(String::as_str), Some("hello"));
        }
        assert_eq!(log.last(), Some(&Call::Flush));
    }

    #[tokio::test]
    async fn test_update_empty_is_noop() {
        let (engine, log) = engine(|_| 0);
        engine.update::<Record>(&[]).await.unwrap();
        engine.delete::<Record>(&[]).await.unwrap();
        assert!(calls(&log).is_empty());
    }

    #[tokio::test]
    async fn test_delete_and_flush() {
        let (engine, log) = engine(|_| 0);
        let models = vec![
            Record::new("posts", "id").with("id", 7),
            Record::new("posts", "id").with("id", 8),
        ];
        engine.delete(&models).await.unwrap();
        engine.flush(&models[0]).await.unwrap();

        assert_eq!(
            calls(&log),
            vec![
                Call::Open("posts".to_string()),
                Call::Del("7".to_string()),
                Call::Del("8".to_string()),
                Call::Flush,
                Call::Open("posts".to_string()),
                Call::Clean,
                Call::Flush,
            ]
        );
    }

    struct MemoryRepository(Vec<Record>);

    #[async_trait]
    impl ModelRepository<Record> for MemoryRepository {
        fn key_name(&self) -> &str {
            "id"
        }

        async fn find_by_keys(&self, keys: &[String]) -> Result<Vec<Record>> {
            Ok(self.0.iter().filter(|r| keys.contains(&r.key())).cloned().collect())
        }
    }

    fn hits(ids: &[&str]) -> SearchResults {
        SearchResults {
            hits: ids
                .iter()
                .map(|id| {
                    let mut hit = Hit::default();
                    hit.fields.insert("id".to_string(), id.to_string());
                    hit
                })
                .collect(),
            total: ids.len() as u64,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_map_keeps_hit_order_and_drops_missing() {
        let (engine, _) = engine(|_| 0);
        let repo = MemoryRepository(vec![
            Record::new("posts", "id").with("id", 1).with("title", "one"),
            Record::new("posts", "id").with("id", 3).with("title", "three"),
        ]);

        let results = hits(&["3", "2", "1"]);
        let models = engine.map(&results, &repo).await.unwrap();
        let keys: Vec<String> = models.iter().map(|m| m.key()).collect();
        assert_eq!(keys, vec!["3", "1"]);

        assert_eq!(engine.map_ids(&results), vec!["3", "2", "1"]);
        assert_eq!(engine.total_count(&results), 3);
    }

    #[tokio::test]
    async fn test_map_empty_hits() {
        let (engine, _) = engine(|_| 0);
        let repo = MemoryRepository(vec![Record::new("posts", "id").with("id", 1)]);
        let models = engine.map(&SearchResults::default(), &repo).await.unwrap();
        assert!(models.is_empty());
    }
}
