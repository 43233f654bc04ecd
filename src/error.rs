//! Xunsearch client errors / Xunsearch 客户端错误

use thiserror::Error;

/// Errors raised while talking to a Xunsearch server / 与 Xunsearch 服务端通信时的错误
#[derive(Debug, Error)]
pub enum XsError {
    #[error("connection to {addr} failed: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Server answered with CMD_ERR / 服务端返回错误
    #[error("server error {code}: {message}")]
    Server { code: u16, message: String },

    #[error("unexpected response {{CMD:{cmd}, ARG:{arg}}}")]
    UnexpectedResponse { cmd: u8, arg: u16 },

    /// Offset or limit does not fit the 32-bit wire fields / 分页参数超出范围
    #[error("page out of range: offset {offset}, limit {limit}")]
    PageOutOfRange { offset: usize, limit: usize },

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("unknown field: {0}")]
    UnknownField(String),

    #[error("invalid scheme: {0}")]
    InvalidScheme(String),

    #[error("missing value of primary key (field: {0})")]
    MissingPrimaryKey(String),

    #[error("field `{0}` cannot be used for facets, only string fields can")]
    FacetFieldType(String),
}

impl XsError {
    /// Server error code, if any / 服务端错误码
    pub fn code(&self) -> Option<u16> {
        match self {
            XsError::Server { code, .. } => Some(*code),
            _ => None,
        }
    }
}

pub type XsResult<T> = std::result::Result<T, XsError>;
