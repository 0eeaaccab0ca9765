//! Short-lived success and failure messages for finished mutations.

use crate::{error::LibraryError, models::Ack};
use parking_lot::Mutex;
use std::{
    fmt,
    time::{Duration, Instant}
};

pub const ADD_FAILED: &str = "Failed to add book. Please try again.";
pub const UPDATE_FAILED: &str = "Failed to update book";
pub const DELETE_FAILED: &str = "Failed to delete book";
pub const BORROW_FAILED: &str = "Failed to borrow book. Please try again.";

pub const DEFAULT_TTL: Duration = Duration::from_secs(4);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    pub description: Option<String>
}

impl Notice {
    pub fn success<S: Into<String>>(message: S) -> Self {
        Notice {
            level: NoticeLevel::Success,
            message: message.into(),
            description: None
        }
    }

    pub fn error<S: Into<String>>(message: S) -> Self {
        Notice {
            level: NoticeLevel::Error,
            message: message.into(),
            description: None
        }
    }

    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn book_added(title: &str) -> Self {
        Notice::success(format!("Book \"{}\" added successfully!", title))
    }

    pub fn book_updated() -> Self {
        Notice::success("Book updated successfully!")
    }

    /// Uses the server's own message, falling back to a generic one.
    pub fn book_deleted(ack: &Ack, title: &str) -> Self {
        let message = ack
            .message
            .clone()
            .unwrap_or_else(|| "Book deleted".to_string());
        Notice::success(message)
            .with_description(format!("{} has been deleted successfully.", title))
    }

    pub fn book_borrowed(title: &str) -> Self {
        Notice::success(format!("\"{}\" successfully borrowed!", title))
    }

    pub fn failure(error: &LibraryError, fallback: &str) -> Self {
        Notice::error(error.user_message(fallback))
    }

    pub fn is_success(&self) -> bool {
        self.level == NoticeLevel::Success
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        if let Some(ref description) = self.description {
            write!(f, " ({})", description)?;
        }
        Ok(())
    }
}

/// Holds notices until their lifetime runs out.
pub struct NoticeBoard {
    ttl: Duration,
    notices: Mutex<Vec<(Instant, Notice)>>
}

impl Default for NoticeBoard {
    fn default() -> Self {
        NoticeBoard::new(DEFAULT_TTL)
    }
}

impl NoticeBoard {
    pub fn new(ttl: Duration) -> Self {
        NoticeBoard {
            ttl,
            notices: Mutex::new(Vec::new())
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn push(&self, notice: Notice) {
        self.push_at(notice, Instant::now())
    }

    pub fn push_at(&self, notice: Notice, now: Instant) {
        tracing::debug!(level = ?notice.level, message = %notice.message, "notice");
        self.notices.lock().push((now, notice));
    }

    pub fn active(&self) -> Vec<Notice> {
        self.active_at(Instant::now())
    }

    /// The notices still alive at `now`, oldest first. Expired ones are dropped.
    pub fn active_at(&self, now: Instant) -> Vec<Notice> {
        let mut notices = self.notices.lock();
        let ttl = self.ttl;
        notices.retain(|(posted, _)| now.saturating_duration_since(*posted) < ttl);
        notices.iter().map(|(_, notice)| notice.clone()).collect()
    }

    /// Take every notice posted so far, expired or not, leaving the board empty.
    pub fn drain(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .drain(..)
            .map(|(_, notice)| notice)
            .collect()
    }

    pub fn dismiss_all(&self) {
        self.notices.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::FieldErrors;
    use libris::QueryError;

    #[test]
    fn success_messages() {
        assert_eq!(
            Notice::book_added("Dune").message,
            "Book \"Dune\" added successfully!"
        );
        assert_eq!(
            Notice::book_borrowed("Dune").message,
            "\"Dune\" successfully borrowed!"
        );

        let ack = Ack {
            success: true,
            message: Some("Book deleted successfully".to_string())
        };
        let notice = Notice::book_deleted(&ack, "Dune");
        assert_eq!(notice.message, "Book deleted successfully");
        assert_eq!(
            notice.description.as_deref(),
            Some("Dune has been deleted successfully.")
        );
    }

    #[test]
    fn failures_prefer_the_server_message() {
        let error = LibraryError::Query(QueryError::Status {
            status: 409,
            message: Some("ISBN already exists".to_string())
        });
        assert_eq!(
            Notice::failure(&error, ADD_FAILED).message,
            "ISBN already exists"
        );

        let error = LibraryError::Query(QueryError::Status {
            status: 500,
            message: None
        });
        let notice = Notice::failure(&error, ADD_FAILED);
        assert_eq!(notice.level, NoticeLevel::Error);
        assert_eq!(notice.message, ADD_FAILED);

        let mut errors = FieldErrors::default();
        errors.add("isbn", "ISBN must be at least 10 characters");
        let notice = Notice::failure(&LibraryError::Validation(errors), ADD_FAILED);
        assert_eq!(notice.message, "ISBN must be at least 10 characters");
    }

    #[test]
    fn notices_expire() {
        let board = NoticeBoard::default();
        let start = Instant::now();
        board.push_at(Notice::book_updated(), start);
        board.push_at(Notice::error(UPDATE_FAILED), start + Duration::from_secs(3));

        assert_eq!(board.active_at(start + Duration::from_secs(1)).len(), 2);
        let remaining = board.active_at(start + Duration::from_secs(5));
        assert_eq!(remaining, vec![Notice::error(UPDATE_FAILED)]);
        assert!(board.active_at(start + Duration::from_secs(8)).is_empty());
    }

    #[test]
    fn drain_ignores_expiry() {
        let board = NoticeBoard::new(Duration::from_millis(0));
        board.push(Notice::error(ADD_FAILED));
        assert!(board.active().is_empty());

        assert_eq!(board.drain(), vec![Notice::error(ADD_FAILED)]);
        assert!(board.drain().is_empty());
    }
}
