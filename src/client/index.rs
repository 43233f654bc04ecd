//! Index session / 索引会话

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

use super::command::*;
use super::connection::Connection;
use super::document::Document;
use super::scheme::FieldScheme;
use crate::error::{XsError, XsResult};
use crate::search::IndexSession;

/// Index session bound to one project / 绑定项目的索引会话
pub struct XsIndex<S = TcpStream> {
    conn: Connection<S>,
    scheme: Arc<FieldScheme>,
}

impl<S> XsIndex<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(conn: Connection<S>, scheme: Arc<FieldScheme>) -> Self {
        Self { conn, scheme }
    }

    /// Build the command sequence that replaces `doc` / 构造文档更新命令序列
    pub fn update_commands(&self, doc: &Document) -> XsResult<Vec<Command>> {
        let id = self.scheme.id_field();
        let key = doc
            .get(&id.name)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| XsError::MissingPrimaryKey(id.name.clone()))?;

        let mut cmds = vec![Command::with_args(CMD_INDEX_REQUEST, INDEX_REQUEST_UPDATE, id.vno)
            .buf(key.to_string())];

        for field in self.scheme.fields() {
            let Some(raw) = doc.get(&field.name) else {
                continue;
            };
            let value = field.value(raw);
            let mut wdf = field.wdf();

            if field.index_mixed() {
                cmds.push(
                    Command::with_args(CMD_DOC_INDEX, wdf, MIXED_VNO).buf(value.clone()),
                );
            }
            if field.index_self() {
                if !field.is_numeric() {
                    wdf |= INDEX_FLAG_SAVEVALUE;
                }
                cmds.push(Command::with_args(CMD_DOC_INDEX, wdf, field.vno).buf(value.clone()));
            }
            if !field.index_self() || field.is_numeric() {
                let varg = if field.is_numeric() { VALUE_FLAG_NUMERIC } else { 0 };
                cmds.push(Command::with_args(CMD_DOC_VALUE, varg, field.vno).buf(value));
            }
        }

        cmds.push(Command::new(CMD_INDEX_SUBMIT));
        Ok(cmds)
    }

    async fn submit(&mut self, mut cmds: Vec<Command>) -> XsResult<()> {
        let Some(last) = cmds.pop() else {
            return Ok(());
        };
        for cmd in &cmds {
            self.conn.queue(cmd);
        }
        self.conn.exec(last, OK_RQST_FINISHED).await?;
        Ok(())
    }

    pub async fn close(self) -> XsResult<()> {
        self.conn.close().await
    }
}

#[async_trait]
impl<S> IndexSession for XsIndex<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn update(&mut self, doc: Document) -> Result<()> {
        let cmds = self.update_commands(&doc)?;
        self.submit(cmds).await?;
        Ok(())
    }

    async fn del(&mut self, key: &str) -> Result<()> {
        let id = self.scheme.id_field();
        let cmd = Command::with_args(CMD_INDEX_REMOVE, 0, id.vno).buf(key.to_lowercase());
        self.conn.exec(cmd, OK_RQST_FINISHED).await?;
        Ok(())
    }

    async fn clean(&mut self) -> Result<()> {
        self.conn.exec(Command::new(CMD_INDEX_CLEAN_DB), OK_DB_CLEAN).await?;
        tracing::info!("Cleaned index of project {:?}", self.conn.project());
        Ok(())
    }

    async fn flush_index(&mut self) -> Result<bool> {
        match self.conn.exec(Command::new(CMD_INDEX_COMMIT), OK_DB_COMMITED).await {
            Ok(_) => {
                tracing::debug!("Index committed for project {:?}", self.conn.project());
                Ok(true)
            }
            Err(e) if e.code() == Some(ERR_BUSY) => {
                tracing::warn!("Index server busy, commit deferred: {}", e);
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }
}
