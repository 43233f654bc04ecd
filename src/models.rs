//! Searchable models / 可搜索模型

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A record that can be written to a search index / 可被索引的记录
pub trait Searchable: Send + Sync {
    /// Index (project) name / 索引名
    fn searchable_as(&self) -> String;

    /// Primary key column / 主键列名
    fn key_name(&self) -> &str;

    /// Primary key value / 主键值
    fn key(&self) -> String;

    /// Fields to index; empty means "do not index" / 要索引的字段，为空则跳过
    fn to_searchable_array(&self) -> BTreeMap<String, String>;
}

/// Dynamic row loaded from a table / 从表中读取的动态记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub table: String,
    pub key_name: String,
    pub fields: Map<String, Value>,
}

impl Record {
    pub fn new(table: impl Into<String>, key_name: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            key_name: key_name.into(),
            fields: Map::new(),
        }
    }

    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

/// Render a JSON value as index text; null yields nothing / JSON 值转文本
pub fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some((*b as u8).to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

impl Searchable for Record {
    fn searchable_as(&self) -> String {
        self.table.clone()
    }

    fn key_name(&self) -> &str {
        &self.key_name
    }

    fn key(&self) -> String {
        self.fields
            .get(&self.key_name)
            .and_then(value_to_string)
            .unwrap_or_default()
    }

    fn to_searchable_array(&self) -> BTreeMap<String, String> {
        self.fields
            .iter()
            .filter_map(|(k, v)| value_to_string(v).map(|s| (k.clone(), s)))
            .collect()
    }
}
