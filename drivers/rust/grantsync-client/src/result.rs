use serde::Deserialize;
use serde_json::Value;

/// Result of a statement execution.
#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    /// Rows, each rendered as text.
    pub rows: Vec<Vec<String>>,
}

impl QueryResult {
    pub(crate) fn from_response(response: Response) -> Self {
        let rows = response
            .rows
            .unwrap_or_default()
            .into_iter()
            .map(|row| row.into_iter().map(render_value).collect())
            .collect();
        Self { rows }
    }
}

fn render_value(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => "NULL".to_string(),
        other => other.to_string(),
    }
}

/// Internal response structure.
#[derive(Debug, Deserialize)]
pub(crate) struct Response {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error_code: Option<u16>,
    #[serde(default)]
    pub rows: Option<Vec<Vec<Value>>>,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_response_renders_text() {
        let response: Response = serde_json::from_str(
            r#"{"status":"ok","columns":["Grants for app@localhost"],
                "rows":[["GRANT SELECT ON `appdb`.* TO 'app'@'localhost'"],[null],[42]]}"#,
        )
        .unwrap();
        let result = QueryResult::from_response(response);
        assert_eq!(result.rows.len(), 3);
        assert_eq!(result.rows[0][0], "GRANT SELECT ON `appdb`.* TO 'app'@'localhost'");
        assert_eq!(result.rows[1][0], "NULL");
        assert_eq!(result.rows[2][0], "42");
    }

    #[test]
    fn test_error_response() {
        let response: Response = serde_json::from_str(
            r#"{"status":"error","message":"There is no such grant defined","error_code":1141}"#,
        )
        .unwrap();
        assert_eq!(response.status, "error");
        assert_eq!(response.error_code, Some(1141));
        assert!(QueryResult::from_response(response).rows.is_empty());
    }
}
