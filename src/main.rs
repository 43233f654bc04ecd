use std::path::Path;

use anyhow::Result;
use clap::{Parser, Subcommand};
use sqlx::sqlite::SqlitePool;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use xunsearch_scout::client::search::PAGE_SIZE;
use xunsearch_scout::config::{self, AppConfig};
use xunsearch_scout::search::SearchOptions;
use xunsearch_scout::{Record, SearchBuilder, SqliteRepository, XunsearchClient, XunsearchEngine};

/// Index and search SQLite tables through a Xunsearch server
#[derive(Parser, Debug)]
#[command(author, version = concat!(env!("CARGO_PKG_VERSION"), " (built ", env!("BUILD_TIME"), ")"), about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Search an index and print the results as JSON
    Search {
        index: String,
        query: String,
        /// Hits per page
        #[arg(long)]
        limit: Option<usize>,
        /// 1-based page number
        #[arg(long)]
        page: Option<usize>,
        /// Use the OR query right away
        #[arg(long)]
        relaxed: bool,
    },
    /// Import every row of a table into its index
    Import { table: String },
    /// Remove every document of an index
    Flush { index: String },
    /// Remove documents by primary key
    Delete {
        table: String,
        #[arg(required = true)]
        keys: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "xunsearch_scout=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration / 加载配置
    let app_config = config::init_config().map_err(anyhow::Error::msg)?.read().clone();
    tracing::info!(
        "Xunsearch index server {}, search server {}",
        app_config.xunsearch.index,
        app_config.xunsearch.search
    );

    let client = XunsearchClient::new(&app_config.xunsearch)?;
    let engine = XunsearchEngine::new(client);

    match args.command {
        Commands::Search { index, query, limit, page, relaxed } => {
            let mut builder = SearchBuilder::new(index, query);
            if let Some(limit) = limit {
                builder = builder.take(limit);
            }

            let results = match (page, relaxed) {
                (Some(page), false) => {
                    engine.paginate(&builder, limit.unwrap_or(PAGE_SIZE), page).await?
                }
                _ => {
                    let options = SearchOptions {
                        numeric_filters: builder.filters(),
                        hits_per_page: limit,
                        page: page.map(|p| p.saturating_sub(1)),
                    };
                    engine.perform_search(&builder, &options, relaxed).await?
                }
            };
            println!("{}", serde_json::to_string_pretty(&results)?);
        }
        Commands::Import { table } => {
            let pool = connect_database(&app_config).await?;
            let repo = SqliteRepository::new(pool, &table, &app_config.database.key_column);

            let total = repo.count().await?;
            let chunk_size = app_config.database.chunk_size.max(1) as i64;
            let mut offset = 0i64;
            while offset < total {
                let records = repo.chunk(offset, chunk_size).await?;
                if records.is_empty() {
                    break;
                }
                engine.update(&records).await?;
                offset += records.len() as i64;
                tracing::info!("Imported {}/{} rows of {}", offset, total, table);
            }
            println!("Imported {} rows of {}", offset, table);
        }
        Commands::Flush { index } => {
            let model = Record::new(&index, &app_config.database.key_column);
            engine.flush(&model).await?;
            println!("Flushed {}", index);
        }
        Commands::Delete { table, keys } => {
            let key_column = &app_config.database.key_column;
            let models: Vec<Record> = keys
                .iter()
                .map(|key| Record::new(&table, key_column).with(key_column, key.as_str()))
                .collect();
            engine.delete(&models).await?;
            println!("Removed {} documents from {}", models.len(), table);
        }
    }

    Ok(())
}

/// Open the SQLite pool, creating the data directory if needed / 打开数据库连接池
async fn connect_database(app_config: &AppConfig) -> Result<SqlitePool> {
    let database_url = &app_config.database.url;

    let file = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:");
    let file = file.split('?').next().unwrap_or_default();
    if let Some(dir) = Path::new(file).parent() {
        if !dir.as_os_str().is_empty() && !dir.exists() {
            std::fs::create_dir_all(dir)?;
            tracing::info!("Created data directory: {:?}", dir);
        }
    }

    Ok(SqlitePool::connect(database_url).await?)
}
