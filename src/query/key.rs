use std::fmt;

/// Composite key addressing one cached query result, e.g. `["note", "<id>"]`.
///
/// Keys are compared segment by segment, so `["notes"]` is a prefix of
/// `["notes", "archived"]` but not of `["note", "42"]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey(Vec<String>);

impl QueryKey {
  pub fn new<I, S>(segments: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self(segments.into_iter().map(Into::into).collect())
  }

  /// Append a segment, returning the extended key.
  pub fn with(mut self, segment: impl Into<String>) -> Self {
    self.0.push(segment.into());
    self
  }

  pub fn segments(&self) -> &[String] {
    &self.0
  }

  /// Check whether `prefix` matches the leading segments of this key.
  pub fn starts_with(&self, prefix: &QueryKey) -> bool {
    self.0.starts_with(&prefix.0)
  }
}

impl fmt::Display for QueryKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("[")?;
    for (i, segment) in self.0.iter().enumerate() {
      if i > 0 {
        f.write_str(", ")?;
      }
      write!(f, "{:?}", segment)?;
    }
    f.write_str("]")
  }
}
