use crate::notes::NotesApi;
use crate::query::QueryClient;
use crate::ui::components::Toasts;

/// Services shared by every view: the notes backend, the query cache and
/// the toast queue.
#[derive(Clone)]
pub struct AppContext {
  pub notes: NotesApi,
  pub cache: QueryClient,
  pub toasts: Toasts,
}

impl AppContext {
  pub fn new(notes: NotesApi, cache: QueryClient) -> Self {
    Self {
      notes,
      cache,
      toasts: Toasts::default(),
    }
  }

  /// Context over an in-memory backend signed in as "me".
  #[cfg(test)]
  pub(crate) fn for_tests(remote: std::sync::Arc<dyn crate::remote::RemoteDataClient>) -> Self {
    let user = crate::remote::SessionUser {
      id: "me".to_string(),
      email: Some("me@example.com".to_string()),
    };
    Self::new(NotesApi::new(remote, Some(user)), QueryClient::new())
  }
}
