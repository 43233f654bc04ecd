//! Application configuration module / 应用配置模块
//!
//! Manages configuration loaded from config.json
//! Creates default config file on first run / 首次运行时创建默认配置文件

use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

use crate::client::{FieldConfig, FieldType};

/// Global configuration instance / 全局配置实例
static CONFIG: OnceCell<Arc<RwLock<AppConfig>>> = OnceCell::new();

/// Application configuration / 应用配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Xunsearch server configuration / Xunsearch 服务配置
    #[serde(default)]
    pub xunsearch: XunsearchConfig,
    /// Backing database configuration / 数据库配置
    #[serde(default)]
    pub database: DatabaseConfig,
}

/// Xunsearch configuration / Xunsearch 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XunsearchConfig {
    /// Index server address (host:port) / 索引服务地址
    pub index: String,
    /// Search server address (host:port) / 搜索服务地址
    pub search: String,
    /// Socket timeout in seconds / 超时秒数
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Field scheme shared by all projects / 字段方案
    pub schema: Vec<FieldConfig>,
}

/// Database configuration / 数据库配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite connection URL / SQLite 连接地址
    pub url: String,
    /// Primary key column of imported tables / 主键列名
    #[serde(default = "default_key_column")]
    pub key_column: String,
    /// Rows per import batch / 每批导入行数
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

fn default_timeout() -> u64 { 30 }
fn default_key_column() -> String { "id".to_string() }
fn default_chunk_size() -> usize { 500 }

impl Default for XunsearchConfig {
    fn default() -> Self {
        Self {
            index: "127.0.0.1:8383".to_string(),
            search: "127.0.0.1:8384".to_string(),
            timeout_secs: default_timeout(),
            schema: vec![
                FieldConfig::new("id", FieldType::Id),
                FieldConfig::new("title", FieldType::Title),
                FieldConfig::new("content", FieldType::Body),
            ],
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:data/app.db?mode=rwc".to_string(),
            key_column: default_key_column(),
            chunk_size: default_chunk_size(),
        }
    }
}

impl AppConfig {
    /// Apply environment overrides / 应用环境变量覆盖
    /// XUNSEARCH_INDEX, XUNSEARCH_SEARCH, DATABASE_URL
    pub fn apply_env(&mut self) {
        if let Ok(addr) = std::env::var("XUNSEARCH_INDEX") {
            self.xunsearch.index = addr;
        }
        if let Ok(addr) = std::env::var("XUNSEARCH_SEARCH") {
            self.xunsearch.search = addr;
        }
        if let Ok(url) = std::env::var("DATABASE_URL") {
            self.database.url = url;
        }
    }
}

/// Get the config file path / 获取配置文件路径
fn get_config_path() -> PathBuf {
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join("config.json")
}

/// Parse configuration from JSON text / 从 JSON 解析配置
pub fn parse_config(content: &str) -> Result<AppConfig, String> {
    serde_json::from_str(content).map_err(|e| format!("Failed to parse config file: {}", e))
}

/// Load configuration from file, or create default if not exists / 加载配置文件，不存在则创建默认配置
pub fn load_config() -> Result<AppConfig, String> {
    let config_path = get_config_path();

    let mut config = if config_path.exists() {
        let content = std::fs::read_to_string(&config_path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;
        let config = parse_config(&content)?;
        tracing::info!("Loaded configuration from {:?}", config_path);
        config
    } else {
        let config = AppConfig::default();
        save_config(&config)?;
        tracing::info!("Created default configuration at {:?}", config_path);
        config
    };

    config.apply_env();
    Ok(config)
}

/// Save configuration to file / 保存配置到文件
pub fn save_config(config: &AppConfig) -> Result<(), String> {
    let config_path = get_config_path();

    let content = serde_json::to_string_pretty(config)
        .map_err(|e| format!("Failed to serialize config: {}", e))?;

    std::fs::write(&config_path, content)
        .map_err(|e| format!("Failed to write config file: {}", e))?;

    Ok(())
}

/// Initialize global configuration / 初始化全局配置
pub fn init_config() -> Result<Arc<RwLock<AppConfig>>, String> {
    let config = load_config()?;

    let config_arc = Arc::new(RwLock::new(config));

    CONFIG.set(config_arc.clone())
        .map_err(|_| "Config already initialized".to_string())?;

    Ok(config_arc)
}

/// Get global configuration instance / 获取全局配置实例
pub fn get_config() -> Arc<RwLock<AppConfig>> {
    CONFIG.get_or_init(|| {
        let config = load_config().unwrap_or_default();
        Arc::new(RwLock::new(config))
    }).clone()
}

/// Get a read-only snapshot of current config / 获取当前配置的只读快照
pub fn config() -> AppConfig {
    get_config().read().clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::IndexMode;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.xunsearch.index, "127.0.0.1:8383");
        assert_eq!(config.xunsearch.search, "127.0.0.1:8384");
        assert_eq!(config.database.chunk_size, 500);
        assert_eq!(config.xunsearch.schema[0].field_type, FieldType::Id);
    }

    #[test]
    fn test_parse_partial_config() {
        let config = parse_config(
            r#"{
                "xunsearch": {
                    "index": "10.0.0.2:8383",
                    "search": "10.0.0.2:8384",
                    "schema": [
                        {"name": "pid", "type": "id"},
                        {"name": "subject", "type": "title"},
                        {"name": "city", "type": "string", "index": "both"}
                    ]
                }
            }"#,
        )
        .unwrap();

        assert_eq!(config.xunsearch.timeout_secs, 30);
        assert_eq!(config.xunsearch.schema.len(), 3);
        assert_eq!(config.xunsearch.schema[2].index, Some(IndexMode::Both));
        assert_eq!(config.database.key_column, "id");
    }

    #[test]
    fn test_parse_invalid() {
        assert!(parse_config("{ not json").is_err());
    }
}
