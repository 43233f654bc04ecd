//! Field scheme of a Xunsearch project / 项目字段方案

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::command::{INDEX_FLAG_WITHPOS, MIXED_VNO};
use crate::error::{XsError, XsResult};

/// Field type / 字段类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    #[default]
    String,
    Numeric,
    Date,
    /// Primary key / 主键
    Id,
    Title,
    Body,
}

/// Where a field's terms are indexed / 索引方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexMode {
    None,
    #[serde(rename = "self")]
    SelfOnly,
    Mixed,
    Both,
}

/// Field definition as written in config / 配置中的字段定义
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldConfig {
    pub name: String,
    #[serde(rename = "type", default)]
    pub field_type: FieldType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<IndexMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phrase: Option<bool>,
}

impl FieldConfig {
    pub fn new(name: &str, field_type: FieldType) -> Self {
        Self {
            name: name.to_string(),
            field_type,
            index: None,
            weight: None,
            phrase: None,
        }
    }

    pub fn index(mut self, mode: IndexMode) -> Self {
        self.index = Some(mode);
        self
    }
}

/// Resolved field with its slot number / 带序号的字段
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMeta {
    pub name: String,
    pub vno: u8,
    pub field_type: FieldType,
    pub index: IndexMode,
    pub weight: u8,
    pub with_pos: bool,
}

impl FieldMeta {
    fn from_config(config: &FieldConfig, vno: u8) -> Self {
        let (default_index, default_weight, default_pos) = match config.field_type {
            FieldType::Id => (IndexMode::SelfOnly, 1, false),
            FieldType::Title => (IndexMode::Both, 5, true),
            FieldType::Body => (IndexMode::Both, 1, true),
            FieldType::String => (IndexMode::SelfOnly, 1, false),
            FieldType::Numeric | FieldType::Date => (IndexMode::None, 1, false),
        };

        // Body is always indexed into the mixed area / body 字段固定为混合索引
        let index = if config.field_type == FieldType::Body {
            IndexMode::Both
        } else {
            config.index.unwrap_or(default_index)
        };

        Self {
            name: config.name.clone(),
            vno,
            field_type: config.field_type,
            index,
            weight: config.weight.unwrap_or(default_weight).min(63),
            with_pos: config.phrase.unwrap_or(default_pos),
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self.field_type, FieldType::Numeric | FieldType::Date)
    }

    /// Facets are only allowed on `string` fields / 仅 string 字段可分面
    pub fn is_facetable(&self) -> bool {
        self.field_type == FieldType::String
    }

    pub fn index_self(&self) -> bool {
        matches!(self.index, IndexMode::SelfOnly | IndexMode::Both)
    }

    pub fn index_mixed(&self) -> bool {
        matches!(self.index, IndexMode::Mixed | IndexMode::Both)
    }

    /// Within-document frequency flags for DOC_INDEX / 索引词频标志
    pub fn wdf(&self) -> u8 {
        self.weight | if self.with_pos { INDEX_FLAG_WITHPOS } else { 0 }
    }

    /// Normalise a value before it goes on the wire / 发送前规范化字段值
    ///
    /// Date fields accept `YYYYMMDD`, unix timestamps or RFC 3339 strings.
    pub fn value(&self, raw: &str) -> String {
        match self.field_type {
            FieldType::Date => normalize_date(raw),
            FieldType::Numeric => raw.trim().to_string(),
            _ => raw.to_string(),
        }
    }
}

fn normalize_date(raw: &str) -> String {
    let raw = raw.trim();
    if raw.len() == 8 && raw.chars().all(|c| c.is_ascii_digit()) {
        return raw.to_string();
    }
    if let Ok(ts) = raw.parse::<i64>() {
        if let Some(dt) = chrono::DateTime::from_timestamp(ts, 0) {
            return dt.format("%Y%m%d").to_string();
        }
    }
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(raw) {
        return dt.format("%Y%m%d").to_string();
    }
    if let Ok(date) = chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.format("%Y%m%d").to_string();
    }
    raw.to_string()
}

/// Ordered field scheme / 有序字段方案
#[derive(Debug, Clone)]
pub struct FieldScheme {
    fields: Vec<FieldMeta>,
    by_name: HashMap<String, usize>,
    id_field: usize,
}

impl FieldScheme {
    /// Build scheme from config, assigning slot numbers / 构建字段方案
    pub fn new(configs: &[FieldConfig]) -> XsResult<Self> {
        let mut fields: Vec<FieldMeta> = Vec::with_capacity(configs.len());
        let mut by_name = HashMap::new();
        let mut id_field = None;
        let mut seen_special: Vec<FieldType> = Vec::new();

        for config in configs {
            if by_name.contains_key(&config.name) {
                return Err(XsError::InvalidScheme(format!("duplicated field: {}", config.name)));
            }
            if matches!(config.field_type, FieldType::Id | FieldType::Title | FieldType::Body) {
                if seen_special.contains(&config.field_type) {
                    return Err(XsError::InvalidScheme(format!(
                        "duplicated {:?} field: {}",
                        config.field_type, config.name
                    )));
                }
                seen_special.push(config.field_type);
            }

            let vno = if config.field_type == FieldType::Body {
                MIXED_VNO
            } else {
                let vno = fields.len();
                if vno >= MIXED_VNO as usize {
                    return Err(XsError::InvalidScheme("too many fields".to_string()));
                }
                vno as u8
            };

            if config.field_type == FieldType::Id {
                id_field = Some(fields.len());
            }
            by_name.insert(config.name.clone(), fields.len());
            fields.push(FieldMeta::from_config(config, vno));
        }

        let id_field = id_field
            .ok_or_else(|| XsError::InvalidScheme("missing field of type `id`".to_string()))?;

        Ok(Self { fields, by_name, id_field })
    }

    pub fn field(&self, name: &str) -> XsResult<&FieldMeta> {
        self.by_name
            .get(name)
            .map(|&i| &self.fields[i])
            .ok_or_else(|| XsError::UnknownField(name.to_string()))
    }

    pub fn field_by_vno(&self, vno: u8) -> Option<&FieldMeta> {
        self.fields.iter().find(|f| f.vno == vno)
    }

    /// Primary key field / 主键字段
    pub fn id_field(&self) -> &FieldMeta {
        &self.fields[self.id_field]
    }

    pub fn fields(&self) -> &[FieldMeta] {
        &self.fields
    }
}
