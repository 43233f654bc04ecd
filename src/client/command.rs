//! Xunsearch command frame / Xunsearch 命令帧
//!
//! Frame layout / 帧格式:
//! `cmd:u8 | arg1:u8 | arg2:u8 | buf1_len:u8 | buf_len:u32 (LE) | buf | buf1`

use bytes::{BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::XsResult;

pub const HEADER_LEN: usize = 8;
pub const MAX_BUF1_LEN: usize = 0xff;

/// Largest body the client accepts from a server / 客户端可接受的最大响应体
pub const MAX_BUF_LEN: usize = 64 * 1024 * 1024;

// Commands that expect a reply / 需要响应的命令
pub const CMD_NONE: u8 = 0;
pub const CMD_USE: u8 = 1;
pub const CMD_DEBUG: u8 = 2;
pub const CMD_TIMEOUT: u8 = 3;
pub const CMD_QUIT: u8 = 4;
pub const CMD_INDEX_SET_DB: u8 = 32;
pub const CMD_INDEX_GET_DB: u8 = 33;
pub const CMD_INDEX_SUBMIT: u8 = 34;
pub const CMD_INDEX_REMOVE: u8 = 35;
pub const CMD_INDEX_EXDATA: u8 = 36;
pub const CMD_INDEX_CLEAN_DB: u8 = 37;
pub const CMD_DELETE_PROJECT: u8 = 38;
pub const CMD_INDEX_COMMIT: u8 = 39;
pub const CMD_SEARCH_DB_TOTAL: u8 = 64;
pub const CMD_SEARCH_GET_TOTAL: u8 = 65;
pub const CMD_SEARCH_GET_RESULT: u8 = 66;
pub const CMD_SEARCH_ADD_DB: u8 = 68;
pub const CMD_SEARCH_FINISH: u8 = 69;

// Reply commands / 响应命令
pub const CMD_OK: u8 = 128;
pub const CMD_ERR: u8 = 129;
pub const CMD_SEARCH_RESULT_DOC: u8 = 140;
pub const CMD_SEARCH_RESULT_FIELD: u8 = 141;
pub const CMD_SEARCH_RESULT_FACETS: u8 = 142;
pub const CMD_SEARCH_RESULT_MATCHED: u8 = 143;

// Buffered commands (bit 0x80, no reply) / 缓冲命令（无响应）
pub const CMD_DOC_TERM: u8 = 160;
pub const CMD_DOC_VALUE: u8 = 161;
pub const CMD_DOC_INDEX: u8 = 162;
pub const CMD_INDEX_REQUEST: u8 = 163;
pub const CMD_SEARCH_SET_SORT: u8 = 192;
pub const CMD_SEARCH_SET_CUT: u8 = 193;
pub const CMD_SEARCH_SET_NUMERIC: u8 = 194;
pub const CMD_SEARCH_SET_COLLAPSE: u8 = 195;
pub const CMD_SEARCH_KEEPALIVE: u8 = 196;
pub const CMD_SEARCH_SET_FACETS: u8 = 197;
pub const CMD_QUERY_INIT: u8 = 224;
pub const CMD_QUERY_PARSE: u8 = 225;
pub const CMD_QUERY_TERM: u8 = 226;
pub const CMD_QUERY_RANGEPROC: u8 = 227;
pub const CMD_QUERY_RANGE: u8 = 228;
pub const CMD_QUERY_VALCMP: u8 = 229;

// CMD_OK arguments / CMD_OK 参数
pub const OK_PROJECT: u16 = 201;
pub const OK_RESULT_BEGIN: u16 = 206;
pub const OK_RESULT_END: u16 = 207;
pub const OK_RQST_FINISHED: u16 = 250;
pub const OK_DB_CLEAN: u16 = 253;
pub const OK_DB_COMMITED: u16 = 256;

// CMD_ERR arguments / CMD_ERR 参数
pub const ERR_NOPROJECT: u16 = 401;
pub const ERR_EMPTYQUERY: u16 = 452;
pub const ERR_TIMEOUT: u16 = 501;
pub const ERR_BUSY: u16 = 504;

// Query operators / 查询操作符
pub const QUERY_OP_AND: u8 = 0;
pub const QUERY_OP_OR: u8 = 1;
pub const QUERY_OP_AND_NOT: u8 = 2;
pub const QUERY_OP_XOR: u8 = 3;
pub const QUERY_OP_AND_MAYBE: u8 = 4;
pub const QUERY_OP_FILTER: u8 = 5;

// Value comparison for open-ended ranges / 单边范围比较
pub const VALCMP_LE: u8 = 0;
pub const VALCMP_GE: u8 = 1;

// Sort types / 排序类型
pub const SORT_TYPE_RELEVANCE: u8 = 0;
pub const SORT_TYPE_DOCID: u8 = 1;
pub const SORT_TYPE_VALUE: u8 = 2;
pub const SORT_TYPE_MULTI: u8 = 3;
pub const SORT_FLAG_ASCENDING: u8 = 0x80;

// Index request / 索引请求
pub const INDEX_REQUEST_ADD: u8 = 0;
pub const INDEX_REQUEST_UPDATE: u8 = 1;
pub const INDEX_FLAG_WITHPOS: u8 = 0x40;
pub const INDEX_FLAG_SAVEVALUE: u8 = 0x80;
pub const VALUE_FLAG_NUMERIC: u8 = 0x80;

/// Field slot shared by all fields (mixed index) / 混合区字段序号
pub const MIXED_VNO: u8 = 255;

/// One protocol command, request or reply / 协议命令（请求或响应）
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Command {
    pub cmd: u8,
    pub arg1: u8,
    pub arg2: u8,
    pub buf: Bytes,
    pub buf1: Bytes,
}

impl Command {
    pub fn new(cmd: u8) -> Self {
        Self { cmd, ..Default::default() }
    }

    pub fn with_args(cmd: u8, arg1: u8, arg2: u8) -> Self {
        Self { cmd, arg1, arg2, ..Default::default() }
    }

    pub fn buf(mut self, buf: impl Into<Bytes>) -> Self {
        self.buf = buf.into();
        self
    }

    pub fn buf1(mut self, buf1: impl Into<Bytes>) -> Self {
        self.buf1 = buf1.into();
        self
    }

    /// 16-bit argument split over arg1/arg2 / 16 位参数
    pub fn arg(&self) -> u16 {
        ((self.arg1 as u16) << 8) | self.arg2 as u16
    }

    pub fn set_arg(&mut self, arg: u16) {
        self.arg1 = (arg >> 8) as u8;
        self.arg2 = (arg & 0xff) as u8;
    }

    /// Commands with bit 0x80 get no reply / 0x80 位命令无需响应
    pub fn expects_reply(&self) -> bool {
        self.cmd & 0x80 == 0
    }

    /// Append the wire form to `out`; buf1 is truncated to 255 bytes / 编码
    pub fn encode(&self, out: &mut BytesMut) {
        let buf1 = &self.buf1[..self.buf1.len().min(MAX_BUF1_LEN)];
        out.reserve(HEADER_LEN + self.buf.len() + buf1.len());
        out.put_u8(self.cmd);
        out.put_u8(self.arg1);
        out.put_u8(self.arg2);
        out.put_u8(buf1.len() as u8);
        out.put_u32_le(self.buf.len() as u32);
        out.put_slice(&self.buf);
        out.put_slice(buf1);
    }

    pub fn to_bytes(&self) -> Bytes {
        let mut out = BytesMut::new();
        self.encode(&mut out);
        out.freeze()
    }

    /// Read one frame from a stream / 从流中读取一帧
    pub async fn read_from<R>(reader: &mut R) -> XsResult<Self>
    where
        R: AsyncRead + Unpin,
    {
        let mut header = [0u8; HEADER_LEN];
        reader.read_exact(&mut header).await?;

        let buf1_len = header[3] as usize;
        let buf_len = u32::from_le_bytes([header[4], header[5], header[6], header[7]]) as usize;
        if buf_len > MAX_BUF_LEN {
            return Err(crate::error::XsError::Malformed(format!(
                "response body of {} bytes exceeds limit",
                buf_len
            )));
        }

        let mut buf = vec![0u8; buf_len];
        reader.read_exact(&mut buf).await?;
        let mut buf1 = vec![0u8; buf1_len];
        reader.read_exact(&mut buf1).await?;

        Ok(Self {
            cmd: header[0],
            arg1: header[1],
            arg2: header[2],
            buf: buf.into(),
            buf1: buf1.into(),
        })
    }

    /// Body as lossy UTF-8 / 以 UTF-8 解析消息体
    pub fn buf_str(&self) -> String {
        String::from_utf8_lossy(&self.buf).into_owned()
    }
}
