use std::time::Duration;

/// Configuration options for the client.
#[derive(Clone, Debug)]
pub struct Config {
    /// Connection timeout.
    pub connect_timeout: Duration,

    /// Timeout for reading a response frame.
    pub read_timeout: Duration,

    /// Timeout for writing a request frame.
    pub write_timeout: Duration,

    /// Authentication token.
    pub token: Option<String>,

    /// Maximum connection attempts.
    pub max_retries: usize,

    /// Delay between connection attempts.
    pub retry_delay: Duration,

    /// Server-side statement timeout in milliseconds.
    pub query_timeout: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(30),
            write_timeout: Duration::from_secs(10),
            token: None,
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
            query_timeout: 30000,
        }
    }
}

impl Config {
    /// Create a new Config builder.
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config.
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Set read timeout.
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.config.read_timeout = timeout;
        self
    }

    /// Set write timeout.
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.config.write_timeout = timeout;
        self
    }

    /// Set authentication token.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.config.token = Some(token.into());
        self
    }

    /// Set max connection attempts (at least one is always made).
    pub fn max_retries(mut self, retries: usize) -> Self {
        self.config.max_retries = retries.max(1);
        self
    }

    /// Set retry delay.
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.config.retry_delay = delay;
        self
    }

    /// Set query timeout in milliseconds.
    pub fn query_timeout(mut self, timeout: u32) -> Self {
        self.config.query_timeout = timeout;
        self
    }

    /// Build the Config.
    pub fn build(self) -> Config {
        self.config
    }
}
