use crate::config::Config;
use crate::error::Error;
use crate::result::{QueryResult, Response};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time::timeout;

const MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;
const DEFAULT_PORT: u16 = 8765;

/// Client holding one server connection; requests are serialized over it.
pub struct Client {
    stream: Arc<Mutex<TcpStream>>,
    config: Config,
    session_id: Arc<Mutex<Option<String>>>,
}

impl Client {
    /// Connect to the server and run a health check.
    pub async fn connect(host: &str, config: Config) -> Result<Self, Error> {
        let client = Self::connect_with_retry(host, &config).await?;

        client.health().await.map_err(|e| {
            Error::Connection(format!("Health check failed: {}", e))
        })?;

        Ok(client)
    }

    async fn connect_with_retry(host: &str, config: &Config) -> Result<Self, Error> {
        let attempts = config.max_retries.max(1);
        let mut last_error = None;

        for attempt in 0..attempts {
            match Self::connect_once(host, config).await {
                Ok(client) => return Ok(client),
                Err(e) => {
                    tracing::warn!(host = %host, attempt = attempt + 1, error = %e, "connect failed");
                    last_error = Some(e);
                    if attempt + 1 < attempts {
                        tokio::time::sleep(config.retry_delay).await;
                    }
                }
            }
        }

        Err(Error::Connection(format!(
            "Failed to connect after {} attempts: {:?}",
            attempts, last_error
        )))
    }

    async fn connect_once(host: &str, config: &Config) -> Result<Self, Error> {
        let (hostname, port) = parse_host(host);

        let stream = timeout(
            config.connect_timeout,
            TcpStream::connect(format!("{}:{}", hostname, port)),
        )
        .await
        .map_err(|_| Error::Timeout("Connection timeout".into()))?
        .map_err(|e| Error::Connection(format!("Failed to connect: {}", e)))?;

        Ok(Self {
            stream: Arc::new(Mutex::new(stream)),
            config: config.clone(),
            session_id: Arc::new(Mutex::new(None)),
        })
    }

    /// Close the connection.
    pub async fn close(&self) -> Result<(), Error> {
        let mut stream = self.stream.lock().await;
        stream.shutdown().await?;
        Ok(())
    }

    async fn send_request(&self, mut request: Value) -> Result<Response, Error> {
        let mut stream = self.stream.lock().await;

        let session_id = self.session_id.lock().await;
        if let Some(ref sid) = *session_id {
            request["auth"] = json!(sid);
        } else if let Some(ref token) = self.config.token {
            request["auth"] = json!(token);
        }
        drop(session_id);

        let json_bytes = serde_json::to_vec(&request)?;
        let len = json_bytes.len() as u32;

        timeout(self.config.write_timeout, async {
            stream.write_all(&len.to_be_bytes()).await?;
            stream.write_all(&json_bytes).await?;
            stream.flush().await
        })
        .await
        .map_err(|_| Error::Timeout("Write timeout".into()))??;

        let resp_buf = timeout(self.config.read_timeout, read_frame(&mut *stream))
            .await
            .map_err(|_| Error::Timeout("Read timeout".into()))??;
        Ok(serde_json::from_slice(&resp_buf)?)
    }

    fn check_status(response: &Response, error_prefix: &str) -> Result<(), Error> {
        if response.status != "ok" {
            let msg = response.message.as_deref().unwrap_or("Unknown error");
            return Err(Error::Query {
                message: format!("{}: {}", error_prefix, msg),
                code: response.error_code,
            });
        }
        Ok(())
    }

    /// Check server health.
    pub async fn health(&self) -> Result<(), Error> {
        let response = self.send_request(json!({"op": "health"})).await?;
        Self::check_status(&response, "Health check failed")
    }

    /// Login with username and password.
    pub async fn login(&self, username: &str, password: &str) -> Result<(), Error> {
        let response = self
            .send_request(json!({
                "op": "login",
                "username": username,
                "password": password
            }))
            .await?;

        if response.status != "ok" {
            let msg = response.message.unwrap_or_else(|| "Unknown error".into());
            return Err(Error::Auth(msg));
        }

        if let Some(sid) = response.session_id {
            let mut session = self.session_id.lock().await;
            *session = Some(sid);
        }

        Ok(())
    }

    /// Execute a SQL statement and return its rows.
    pub async fn query(&self, sql: &str) -> Result<QueryResult, Error> {
        if sql.trim().is_empty() {
            return Err(Error::query("empty statement"));
        }
        let response = self
            .send_request(json!({
                "op": "query",
                "sql": sql,
                "timeout_millis": self.config.query_timeout
            }))
            .await?;
        Self::check_status(&response, "Query failed")?;
        Ok(QueryResult::from_response(response))
    }
}

async fn read_frame<S: AsyncRead + Unpin>(stream: &mut S) -> Result<Vec<u8>, Error> {
    let mut len_buf = [0u8; 4];
    stream.read_exact(&mut len_buf).await?;
    let resp_len = u32::from_be_bytes(len_buf) as usize;
    if resp_len > MAX_FRAME_BYTES {
        return Err(Error::query(format!("Response too large: {} bytes", resp_len)));
    }
    let mut buf = vec![0u8; resp_len];
    stream.read_exact(&mut buf).await?;
    Ok(buf)
}

fn parse_host(host: &str) -> (&str, u16) {
    match host.rsplit_once(':') {
        Some((hostname, port)) => (hostname, port.parse().unwrap_or(DEFAULT_PORT)),
        None if host.is_empty() => ("localhost", DEFAULT_PORT),
        None => (host, DEFAULT_PORT),
    }
}
