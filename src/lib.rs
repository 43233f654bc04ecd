pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod search;

pub use client::XunsearchClient;
pub use error::{XsError, XsResult};
pub use models::{Record, Searchable};
pub use repository::{ModelRepository, SqliteRepository};
pub use search::{Filter, SearchBuilder, SearchResults, XunsearchEngine};
