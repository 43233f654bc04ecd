//! Index documents and search hits / 索引文档与搜索命中

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{XsError, XsResult};

/// Document submitted to the index server / 提交到索引服务的文档
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    fields: BTreeMap<String, String>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_field(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Merge fields, later values win / 合并字段，后者覆盖前者
    pub fn set_fields<I, K, V>(&mut self, fields: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (k, v) in fields {
            self.set_field(k, v);
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }
}

/// Length of the hit header in CMD_SEARCH_RESULT_DOC / 命中头部长度
pub const HIT_HEADER_LEN: usize = 20;

/// One search hit with its stored fields / 单条搜索命中
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    pub docid: u32,
    pub rank: u32,
    pub ccount: u32,
    pub percent: i32,
    pub weight: f32,
    pub fields: BTreeMap<String, String>,
    /// Query terms that matched this document / 命中的查询词
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub matched: Vec<String>,
}

impl Hit {
    /// Parse the 20-byte header: docid, rank, ccount, percent, weight / 解析命中头
    pub fn from_header(buf: &[u8]) -> XsResult<Self> {
        if buf.len() < HIT_HEADER_LEN {
            return Err(XsError::Malformed(format!(
                "hit header too short: {} bytes",
                buf.len()
            )));
        }
        let word = |i: usize| [buf[i], buf[i + 1], buf[i + 2], buf[i + 3]];

        Ok(Self {
            docid: u32::from_le_bytes(word(0)),
            rank: u32::from_le_bytes(word(4)),
            ccount: u32::from_le_bytes(word(8)),
            percent: i32::from_le_bytes(word(12)),
            weight: f32::from_le_bytes(word(16)),
            ..Default::default()
        })
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}
