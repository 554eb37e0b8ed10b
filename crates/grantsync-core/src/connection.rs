use crate::error::ConnectionError;

/// Result rows of an executed statement, one `Vec<String>` per row.
///
/// The reconciler only cares whether execution succeeded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rows {
    pub rows: Vec<Vec<String>>,
}

impl Rows {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }
}

/// Capability to run one SQL statement against the server.
///
/// Each call blocks until the statement completes. Pooling, serialization of
/// concurrent callers and deadlines belong to the implementor.
pub trait Connection {
    fn execute(&self, sql: &str) -> Result<Rows, ConnectionError>;
}

impl<C: Connection + ?Sized> Connection for &C {
    fn execute(&self, sql: &str) -> Result<Rows, ConnectionError> {
        (**self).execute(sql)
    }
}

impl<C: Connection + ?Sized> Connection for Box<C> {
    fn execute(&self, sql: &str) -> Result<Rows, ConnectionError> {
        (**self).execute(sql)
    }
}
