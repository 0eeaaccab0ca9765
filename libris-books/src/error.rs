use crate::forms::FieldErrors;
use libris::QueryError;

#[derive(Clone, Debug, thiserror::Error)]
pub enum LibraryError {
    /// The input was rejected locally; nothing was sent.
    #[error("invalid input: {0}")]
    Validation(FieldErrors),

    #[error(transparent)]
    Query(#[from] QueryError)
}

impl From<FieldErrors> for LibraryError {
    fn from(errors: FieldErrors) -> Self {
        LibraryError::Validation(errors)
    }
}

impl LibraryError {
    /// What to tell the user: the first field error, the server's message, or `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            LibraryError::Validation(errors) => errors
                .first()
                .map(ToOwned::to_owned)
                .unwrap_or_else(|| fallback.to_owned()),
            LibraryError::Query(e) => e.user_message(fallback)
        }
    }

    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            LibraryError::Validation(errors) => Some(errors),
            LibraryError::Query(_) => None
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, LibraryError::Query(e) if e.is_not_found())
    }
}
