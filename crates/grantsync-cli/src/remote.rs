//! Blocking [`Connection`] over the async client driver.

use anyhow::{Context, Result};
use grantsync_client::{Client, Config};
use grantsync_core::{Connection, ConnectionError, Rows};
use tokio::runtime::Runtime;

pub struct RemoteConnection {
    runtime: Runtime,
    client: Client,
}

impl RemoteConnection {
    pub fn connect(host: &str, config: Config, login: Option<(String, String)>) -> Result<Self> {
        let runtime = Runtime::new()?;
        let client = runtime
            .block_on(Client::connect(host, config))
            .with_context(|| format!("connecting to {}", host))?;
        if let Some((user, password)) = login {
            runtime
                .block_on(client.login(&user, &password))
                .with_context(|| format!("logging in as {}", user))?;
        }
        Ok(Self { runtime, client })
    }

    pub fn close(self) -> Result<()> {
        self.runtime.block_on(self.client.close())?;
        Ok(())
    }
}

impl Connection for RemoteConnection {
    fn execute(&self, sql: &str) -> Result<Rows, ConnectionError> {
        self.runtime
            .block_on(self.client.query(sql))
            .map(|result| Rows::new(result.rows))
            .map_err(to_connection_error)
    }
}

fn to_connection_error(err: grantsync_client::Error) -> ConnectionError {
    let error = ConnectionError::new(err.to_string());
    match err.code() {
        Some(code) => error.with_code(code),
        None => error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_survives_conversion() {
        let err = to_connection_error(grantsync_client::Error::Query {
            message: "Query failed: There is no such grant defined".into(),
            code: Some(1141),
        });
        assert_eq!(err.code, Some(1141));
        assert!(err.is_missing_grant());

        let err = to_connection_error(grantsync_client::Error::Timeout("Read timeout".into()));
        assert_eq!(err.code, None);
        assert_eq!(err.message, "Timeout: Read timeout");
    }
}
