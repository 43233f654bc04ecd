//! Search module - translates model searches into Xunsearch sessions / 搜索模块
//!
//! Architecture principles / 架构原则：
//! - Engine only drives primitive session operations (query, filters, limit, search)
//! - Sessions are opened through [`SearchConnector`], so the engine never sees TCP
//! - Call direction: Engine → Session (unidirectional) / 调用方向
//!
//! Query features / 查询特性：
//! - jieba keyword extraction, top 5 nouns and verbs
//! - Strict `k1 AND (k2 OR ...)` query with one relaxed `OR` retry on thin results
//! - Range, weight, fuzzy, facet and collapse filters

pub mod builder;
pub mod engine;
pub mod operators;
pub mod query;
pub mod schema;
pub mod session;
pub mod tokenizer;

pub use builder::{Direction, SearchBuilder, SearchCallback, SearchOptions};
pub use engine::{XunsearchEngine, FALLBACK_THRESHOLD};
pub use operators::Filter;
pub use query::build_query;
pub use schema::{Facets, SearchResults};
pub use session::{IndexSession, SearchConnector, SearchSession};
pub use tokenizer::{JiebaTokenizer, Keyword, KeywordTokenizer};
