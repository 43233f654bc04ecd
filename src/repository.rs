//! Backing store used to hydrate search hits / 用于回填搜索结果的数据源
//!
//! Each table is read as dynamic [`Record`]s through sqlx (SQLite).

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Pool, Row, Sqlite, TypeInfo, ValueRef};

use crate::models::Record;

/// Loads models by primary key / 按主键加载模型
#[async_trait]
pub trait ModelRepository<M>: Send + Sync {
    /// Primary key column / 主键列名
    fn key_name(&self) -> &str;

    /// Records whose key is in `keys`, any order / 按主键批量查询
    async fn find_by_keys(&self, keys: &[String]) -> Result<Vec<M>>;
}

/// SQLite table repository / SQLite 表数据源
#[derive(Clone)]
pub struct SqliteRepository {
    db: Pool<Sqlite>,
    table: String,
    key_name: String,
}

/// Quote an identifier for SQLite / 标识符转义
fn quote_ident(name: &str) -> Result<String> {
    if name.is_empty() || name.contains('\0') {
        return Err(anyhow!("invalid identifier: {:?}", name));
    }
    Ok(format!("\"{}\"", name.replace('"', "\"\"")))
}

impl SqliteRepository {
    pub fn new(db: Pool<Sqlite>, table: impl Into<String>, key_name: impl Into<String>) -> Self {
        Self {
            db,
            table: table.into(),
            key_name: key_name.into(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    fn row_to_record(&self, row: &SqliteRow) -> Result<Record> {
        let mut fields = Map::new();
        for (i, column) in row.columns().iter().enumerate() {
            let raw = row.try_get_raw(i)?;
            let value = if raw.is_null() {
                Value::Null
            } else {
                let type_name = raw.type_info().name().to_ascii_uppercase();
                match type_name.as_str() {
                    "INTEGER" | "BOOLEAN" => Value::from(row.try_get::<i64, _>(i)?),
                    "REAL" => Value::from(row.try_get::<f64, _>(i)?),
                    "BLOB" => continue,
                    _ => Value::from(row.try_get::<String, _>(i)?),
                }
            };
            fields.insert(column.name().to_string(), value);
        }
        Ok(Record {
            table: self.table.clone(),
            key_name: self.key_name.clone(),
            fields,
        })
    }

    /// Total rows of the table / 表行数
    pub async fn count(&self) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_ident(&self.table)?);
        let (count,): (i64,) = sqlx::query_as(&sql).fetch_one(&self.db).await?;
        Ok(count)
    }

    /// One page of rows ordered by key, for bulk import / 按主键分批读取
    pub async fn chunk(&self, offset: i64, limit: i64) -> Result<Vec<Record>> {
        let sql = format!(
            "SELECT * FROM {} ORDER BY {} LIMIT ? OFFSET ?",
            quote_ident(&self.table)?,
            quote_ident(&self.key_name)?
        );
        let rows = sqlx::query(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.db)
            .await?;
        rows.iter().map(|row| self.row_to_record(row)).collect()
    }
}

#[async_trait]
impl ModelRepository<Record> for SqliteRepository {
    fn key_name(&self) -> &str {
        &self.key_name
    }

    async fn find_by_keys(&self, keys: &[String]) -> Result<Vec<Record>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; keys.len()].join(", ");
        let sql = format!(
            "SELECT * FROM {} WHERE CAST({} AS TEXT) IN ({})",
            quote_ident(&self.table)?,
            quote_ident(&self.key_name)?,
            placeholders
        );

        let mut query = sqlx::query(&sql);
        for key in keys {
            query = query.bind(key);
        }
        let rows = query.fetch_all(&self.db).await?;
        tracing::debug!("Loaded {} of {} records from {}", rows.len(), keys.len(), self.table);

        rows.iter().map(|row| self.row_to_record(row)).collect()
    }
}
