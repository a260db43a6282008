use serde_json::Value;

/// One record as returned by the backend.
pub type Row = serde_json::Map<String, Value>;

/// Equality filter on a column (`column = value`)
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
  pub column: String,
  pub value: Value,
}

impl Filter {
  pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
    Self {
      column: column.into(),
      value: value.into(),
    }
  }

  /// Check whether `row` satisfies this filter.
  pub fn matches(&self, row: &Row) -> bool {
    row.get(&self.column) == Some(&self.value)
  }

  /// Filter value as it appears in a query string.
  pub fn value_text(&self) -> String {
    match &self.value {
      Value::String(s) => s.clone(),
      other => other.to_string(),
    }
  }
}

/// Result ordering on one column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
  pub column: String,
  pub ascending: bool,
}

impl Order {
  pub fn asc(column: impl Into<String>) -> Self {
    Self {
      column: column.into(),
      ascending: true,
    }
  }

  pub fn desc(column: impl Into<String>) -> Self {
    Self {
      column: column.into(),
      ascending: false,
    }
  }
}

/// The user a session was opened for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser {
  pub id: String,
  pub email: Option<String>,
}

impl SessionUser {
  /// Label for the header bar.
  pub fn display_name(&self) -> &str {
    self.email.as_deref().unwrap_or(&self.id)
  }
}
