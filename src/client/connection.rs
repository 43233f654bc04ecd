//! Server connection / 服务端连接
//!
//! Commands without a reply are queued locally and sent together with the
//! next command that expects one.

use std::time::Duration;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

use super::command::*;
use crate::error::{XsError, XsResult};

/// Connection to an index or search server / 索引或搜索服务端连接
pub struct Connection<S = TcpStream> {
    stream: S,
    send_buffer: BytesMut,
    timeout: Duration,
    project: Option<String>,
}

impl Connection<TcpStream> {
    /// Connect to `addr` (host:port) / 连接服务端
    pub async fn connect(addr: &str, timeout: Duration) -> XsResult<Self> {
        let stream = tokio::time::timeout(timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| XsError::Timeout(timeout))?
            .map_err(|source| XsError::Connect { addr: addr.to_string(), source })?;
        stream.set_nodelay(true).ok();

        tracing::debug!("Connected to xunsearch server {}", addr);
        Ok(Self::new(stream, timeout))
    }
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(stream: S, timeout: Duration) -> Self {
        Self {
            stream,
            send_buffer: BytesMut::new(),
            timeout,
            project: None,
        }
    }

    pub fn project(&self) -> Option<&str> {
        self.project.as_deref()
    }

    /// Select project on the server / 选择项目
    pub async fn use_project(&mut self, name: &str) -> XsResult<()> {
        let cmd = Command::new(CMD_USE).buf(name.to_string());
        self.exec(cmd, OK_PROJECT).await?;
        self.project = Some(name.to_string());
        Ok(())
    }

    /// Queue a command that gets no reply / 缓存无需响应的命令
    pub fn queue(&mut self, cmd: &Command) {
        cmd.encode(&mut self.send_buffer);
    }

    pub fn has_pending(&self) -> bool {
        !self.send_buffer.is_empty()
    }

    /// Send pending commands plus `cmd` and read the reply / 发送命令并读取响应
    ///
    /// The reply must be `CMD_OK` with `expect_arg`, unless `expect_arg` is 0.
    pub async fn exec(&mut self, cmd: Command, expect_arg: u16) -> XsResult<Command> {
        if !cmd.expects_reply() {
            self.queue(&cmd);
            return Ok(cmd);
        }

        self.send(&cmd).await?;
        let res = self.read_response().await?;
        check_ok(&res, expect_arg)?;
        Ok(res)
    }

    /// Write pending commands and `cmd` without waiting / 只发送不等待
    pub async fn send(&mut self, cmd: &Command) -> XsResult<()> {
        cmd.encode(&mut self.send_buffer);
        let buf = self.send_buffer.split().freeze();
        let timeout = self.timeout;
        let stream = &mut self.stream;

        let write = async move {
            stream.write_all(&buf).await?;
            stream.flush().await
        };
        tokio::time::timeout(timeout, write)
            .await
            .map_err(|_| XsError::Timeout(timeout))??;
        Ok(())
    }

    /// Read a single reply frame / 读取一帧响应
    pub async fn read_response(&mut self) -> XsResult<Command> {
        let timeout = self.timeout;
        tokio::time::timeout(timeout, Command::read_from(&mut self.stream))
            .await
            .map_err(|_| XsError::Timeout(timeout))?
    }

    /// Send QUIT and shut the socket down / 关闭连接
    pub async fn close(mut self) -> XsResult<()> {
        self.send(&Command::new(CMD_QUIT)).await?;
        self.stream.shutdown().await?;
        Ok(())
    }
}

/// Map a reply to an error unless it is the expected OK / 校验响应
pub fn check_ok(res: &Command, expect_arg: u16) -> XsResult<()> {
    if res.cmd == CMD_ERR {
        return Err(XsError::Server {
            code: res.arg(),
            message: res.buf_str(),
        });
    }
    if res.cmd != CMD_OK || (expect_arg != 0 && res.arg() != expect_arg) {
        return Err(XsError::UnexpectedResponse { cmd: res.cmd, arg: res.arg() });
    }
    Ok(())
}
