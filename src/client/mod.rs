//! Xunsearch protocol client / Xunsearch 协议客户端
//!
//! Only the subset the search engine adapter needs: project selection,
//! document update/remove/clean/commit and searching with filters, sorting,
//! collapsing and facets.

pub mod command;
pub mod connection;
pub mod document;
pub mod index;
pub mod scheme;
pub mod search;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

pub use command::Command;
pub use connection::Connection;
pub use document::{Document, Hit};
pub use index::XsIndex;
pub use scheme::{FieldConfig, FieldMeta, FieldScheme, FieldType, IndexMode};
pub use search::XsSearch;

use crate::config::XunsearchConfig;
use crate::search::{IndexSession, SearchConnector, SearchSession};

/// Client holding server addresses and the field scheme / 持有服务地址与字段方案的客户端
#[derive(Clone)]
pub struct XunsearchClient {
    index_addr: String,
    search_addr: String,
    timeout: Duration,
    scheme: Arc<FieldScheme>,
}

impl XunsearchClient {
    pub fn new(config: &XunsearchConfig) -> Result<Self> {
        let scheme = FieldScheme::new(&config.schema)?;
        Ok(Self {
            index_addr: config.index.clone(),
            search_addr: config.search.clone(),
            timeout: Duration::from_secs(config.timeout_secs.max(1)),
            scheme: Arc::new(scheme),
        })
    }

    pub fn scheme(&self) -> &FieldScheme {
        &self.scheme
    }

    /// Connect to the index server and select project `name` / 连接索引服务
    pub async fn connect_index(&self, name: &str) -> Result<XsIndex> {
        let mut conn = Connection::connect(&self.index_addr, self.timeout).await?;
        conn.use_project(name).await?;
        tracing::debug!("Index session opened: project={}", name);
        Ok(XsIndex::new(conn, self.scheme.clone()))
    }

    /// Connect to the search server and select project `name` / 连接搜索服务
    pub async fn connect_search(&self, name: &str) -> Result<XsSearch> {
        let mut conn = Connection::connect(&self.search_addr, self.timeout).await?;
        conn.use_project(name).await?;
        tracing::debug!("Search session opened: project={}", name);
        Ok(XsSearch::new(conn, self.scheme.clone()))
    }
}

#[async_trait]
impl SearchConnector for XunsearchClient {
    async fn init_index(&self, name: &str) -> Result<Box<dyn IndexSession>> {
        Ok(Box::new(self.connect_index(name).await?))
    }

    async fn init_search(&self, name: &str) -> Result<Box<dyn SearchSession>> {
        Ok(Box::new(self.connect_search(name).await?))
    }

    fn primary_key(&self) -> &str {
        &self.scheme.id_field().name
    }
}
