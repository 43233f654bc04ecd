//! Search session / 搜索会话
//!
//! Query modifiers are collected locally and flushed in one round trip when
//! `search()` runs, so the fuzzy flag applies no matter when it was set.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use bytes::{BufMut, BytesMut};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

use super::command::*;
use super::connection::{check_ok, Connection};
use super::document::Hit;
use super::scheme::FieldScheme;
use crate::error::{XsError, XsResult};
use crate::search::SearchSession;

/// Default page size when no limit was set / 默认每页条数
pub const PAGE_SIZE: usize = 10;

/// Search session bound to one project / 绑定项目的搜索会话
pub struct XsSearch<S = TcpStream> {
    conn: Connection<S>,
    scheme: Arc<FieldScheme>,
    query: String,
    /// Terms/ranges appended to the parsed query / 附加到查询的条件
    modifiers: Vec<Command>,
    /// Sort/collapse/facets settings / 排序、折叠、分面设置
    settings: Vec<Command>,
    default_op: u8,
    limit: usize,
    offset: usize,
    last_count: u64,
    facets: HashMap<String, BTreeMap<String, u32>>,
}

impl<S> XsSearch<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(conn: Connection<S>, scheme: Arc<FieldScheme>) -> Self {
        Self {
            conn,
            scheme,
            query: String::new(),
            modifiers: Vec::new(),
            settings: Vec::new(),
            default_op: QUERY_OP_AND,
            limit: 0,
            offset: 0,
            last_count: 0,
            facets: HashMap::new(),
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Everything that goes on the wire before GET_RESULT / 结果请求前发送的命令
    pub fn pending_commands(&self) -> Vec<Command> {
        let mut cmds = vec![Command::new(CMD_QUERY_INIT)];
        if !self.query.is_empty() {
            cmds.push(
                Command::with_args(CMD_QUERY_PARSE, QUERY_OP_AND, self.default_op)
                    .buf(self.query.clone()),
            );
        }
        cmds.extend(self.modifiers.iter().cloned());
        cmds.extend(self.settings.iter().cloned());
        cmds
    }

    fn result_command(&self) -> XsResult<Command> {
        let limit = if self.limit > 0 { self.limit } else { PAGE_SIZE };
        let out_of_range = || XsError::PageOutOfRange { offset: self.offset, limit };
        let offset_le = u32::try_from(self.offset).map_err(|_| out_of_range())?;
        let limit_le = u32::try_from(limit).map_err(|_| out_of_range())?;

        let mut page = BytesMut::with_capacity(8);
        page.put_u32_le(offset_le);
        page.put_u32_le(limit_le);
        Ok(Command::with_args(CMD_SEARCH_GET_RESULT, 0, self.default_op).buf1(page.freeze()))
    }

    /// Decode one facets frame into `self.facets` / 解析分面数据
    fn read_facets(&mut self, buf: &[u8]) {
        let mut off = 0;
        while off + 6 <= buf.len() {
            let vno = buf[off];
            let vlen = buf[off + 1] as usize;
            let num = u32::from_le_bytes([buf[off + 2], buf[off + 3], buf[off + 4], buf[off + 5]]);
            let end = (off + 6 + vlen).min(buf.len());
            let value = String::from_utf8_lossy(&buf[off + 6..end]).into_owned();

            if let Some(field) = self.scheme.field_by_vno(vno) {
                self.facets
                    .entry(field.name.clone())
                    .or_default()
                    .insert(value, num);
            }
            off += 6 + vlen;
        }
    }

    async fn execute(&mut self) -> XsResult<Vec<Hit>> {
        for cmd in self.pending_commands() {
            self.conn.queue(&cmd);
        }
        let cmd = self.result_command()?;
        let res = self.conn.exec(cmd, OK_RESULT_BEGIN).await?;
        if res.buf.len() < 4 {
            return Err(XsError::Malformed("missing result count".to_string()));
        }
        self.last_count = u32::from_le_bytes([res.buf[0], res.buf[1], res.buf[2], res.buf[3]]) as u64;
        self.facets.clear();

        let mut hits: Vec<Hit> = Vec::new();
        loop {
            let res = self.conn.read_response().await?;
            match res.cmd {
                CMD_SEARCH_RESULT_FACETS => self.read_facets(&res.buf),
                CMD_SEARCH_RESULT_DOC => hits.push(Hit::from_header(&res.buf)?),
                CMD_SEARCH_RESULT_FIELD => {
                    if let Some(hit) = hits.last_mut() {
                        let name = match self.scheme.field_by_vno(res.arg2) {
                            Some(field) => field.name.clone(),
                            None => res.arg().to_string(),
                        };
                        hit.fields.insert(name, res.buf_str());
                    }
                }
                CMD_SEARCH_RESULT_MATCHED => {
                    if let Some(hit) = hits.last_mut() {
                        hit.matched = res.buf_str().split(' ').map(str::to_string).collect();
                    }
                }
                CMD_OK if res.arg() == OK_RESULT_END => break,
                _ => check_ok(&res, OK_RESULT_END)?,
            }
        }

        self.limit = 0;
        self.offset = 0;
        Ok(hits)
    }

    pub async fn close(self) -> XsResult<()> {
        self.conn.close().await
    }
}

#[async_trait]
impl<S> SearchSession for XsSearch<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    fn set_query(&mut self, query: &str) {
        self.query = query.trim().to_string();
    }

    fn add_range(&mut self, field: &str, from: Option<&str>, to: Option<&str>) -> Result<()> {
        let meta = self.scheme.field(field)?;
        let cmd = match (from, to) {
            (Some(from), Some(to)) => {
                Command::with_args(CMD_QUERY_RANGE, QUERY_OP_FILTER, meta.vno)
                    .buf(meta.value(from))
                    .buf1(meta.value(to))
            }
            (Some(from), None) => Command::with_args(CMD_QUERY_VALCMP, QUERY_OP_FILTER, meta.vno)
                .buf(meta.value(from))
                .buf1(vec![VALCMP_GE]),
            (None, Some(to)) => Command::with_args(CMD_QUERY_VALCMP, QUERY_OP_FILTER, meta.vno)
                .buf(meta.value(to))
                .buf1(vec![VALCMP_LE]),
            (None, None) => return Ok(()),
        };
        self.modifiers.push(cmd);
        Ok(())
    }

    fn add_weight(&mut self, field: &str, term: &str, scale: f32) -> Result<()> {
        let meta = self.scheme.field(field)?;
        let mut cmd = Command::with_args(CMD_QUERY_TERM, QUERY_OP_AND_MAYBE, meta.vno)
            .buf(term.to_lowercase());
        if scale > 0.0 && scale != 1.0 {
            let scaled = (scale * 100.0).round().min(u16::MAX as f32) as u16;
            cmd = cmd.buf1(scaled.to_be_bytes().to_vec());
        }
        self.modifiers.push(cmd);
        Ok(())
    }

    fn set_fuzzy(&mut self, fuzzy: bool) {
        self.default_op = if fuzzy { QUERY_OP_OR } else { QUERY_OP_AND };
    }

    fn set_facets(&mut self, fields: &[String], exact: bool) -> Result<()> {
        let mut buf = Vec::with_capacity(fields.len());
        for name in fields {
            let meta = self.scheme.field(name)?;
            if !meta.is_facetable() {
                return Err(XsError::FacetFieldType(name.clone()).into());
            }
            buf.push(meta.vno);
        }
        self.settings
            .push(Command::with_args(CMD_SEARCH_SET_FACETS, exact as u8, 0).buf(buf));
        Ok(())
    }

    fn set_collapse(&mut self, field: &str, num: u32) -> Result<()> {
        let meta = self.scheme.field(field)?;
        let max = num.clamp(1, 255) as u8;
        self.settings
            .push(Command::with_args(CMD_SEARCH_SET_COLLAPSE, max, meta.vno));
        Ok(())
    }

    fn set_sort(&mut self, sorts: &[(String, bool)]) -> Result<()> {
        let cmd = match sorts {
            [] => Command::with_args(CMD_SEARCH_SET_SORT, SORT_TYPE_RELEVANCE, 0),
            [(field, asc)] => {
                let meta = self.scheme.field(field)?;
                let flag = if *asc { SORT_FLAG_ASCENDING } else { 0 };
                Command::with_args(CMD_SEARCH_SET_SORT, SORT_TYPE_VALUE | flag, meta.vno)
            }
            _ => {
                let mut buf = Vec::with_capacity(sorts.len() * 2);
                for (field, asc) in sorts {
                    buf.push(self.scheme.field(field)?.vno);
                    buf.push(*asc as u8);
                }
                Command::with_args(CMD_SEARCH_SET_SORT, SORT_TYPE_MULTI, 0).buf(buf)
            }
        };
        self.settings.push(cmd);
        Ok(())
    }

    fn set_limit(&mut self, limit: usize, offset: usize) {
        self.limit = limit;
        self.offset = offset;
    }

    async fn search(&mut self) -> Result<Vec<Hit>> {
        Ok(self.execute().await?)
    }

    fn last_count(&self) -> u64 {
        self.last_count
    }

    fn facets(&self, field: &str) -> BTreeMap<String, u32> {
        self.facets.get(field).cloned().unwrap_or_default()
    }
}
