//! Records exchanged with the library API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Genre {
    Fiction,
    NonFiction,
    Fantasy,
    Science,
    Biography,
    History,
    SelfHelp,
    Memoir,
    Psychology,
    Thriller,
    Romance
}

impl Genre {
    pub const ALL: [Genre; 11] = [
        Genre::Fiction,
        Genre::NonFiction,
        Genre::Fantasy,
        Genre::Science,
        Genre::Biography,
        Genre::History,
        Genre::SelfHelp,
        Genre::Memoir,
        Genre::Psychology,
        Genre::Thriller,
        Genre::Romance
    ];

    /// The wire name, e.g. `NON_FICTION`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Genre::Fiction => "FICTION",
            Genre::NonFiction => "NON_FICTION",
            Genre::Fantasy => "FANTASY",
            Genre::Science => "SCIENCE",
            Genre::Biography => "BIOGRAPHY",
            Genre::History => "HISTORY",
            Genre::SelfHelp => "SELF_HELP",
            Genre::Memoir => "MEMOIR",
            Genre::Psychology => "PSYCHOLOGY",
            Genre::Thriller => "THRILLER",
            Genre::Romance => "ROMANCE"
        }
    }

    /// The display name, e.g. `Non-Fiction`.
    pub fn label(&self) -> &'static str {
        match self {
            Genre::Fiction => "Fiction",
            Genre::NonFiction => "Non-Fiction",
            Genre::Fantasy => "Fantasy",
            Genre::Science => "Science",
            Genre::Biography => "Biography",
            Genre::History => "History",
            Genre::SelfHelp => "Self-Help",
            Genre::Memoir => "Memoir",
            Genre::Psychology => "Psychology",
            Genre::Thriller => "Thriller",
            Genre::Romance => "Romance"
        }
    }
}

impl fmt::Display for Genre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown genre `{0}`")]
pub struct UnknownGenre(pub String);

impl FromStr for Genre {
    type Err = UnknownGenre;

    /// Accepts wire names and display names, ignoring case, `-` and `_`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalize = |s: &str| {
            s.chars()
                .filter(|c| *c != '_' && *c != '-' && *c != ' ')
                .collect::<String>()
                .to_ascii_uppercase()
        };
        let wanted = normalize(s);
        Genre::ALL
            .iter()
            .copied()
            .find(|genre| normalize(genre.as_str()) == wanted)
            .ok_or_else(|| UnknownGenre(s.to_string()))
    }
}

/// A book record.
///
/// `available` is always `copies > 0`. It's derived when a book is constructed or
/// deserialized, whatever the server sent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "BookRecord", rename_all = "camelCase")]
pub struct Book {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub author: String,
    pub genre: Genre,
    pub isbn: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    copies: u32,
    available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>
}

/// The wire form of a book. Any `available` field is ignored.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BookRecord {
    #[serde(rename = "_id")]
    id: String,
    title: String,
    author: String,
    genre: Genre,
    isbn: String,
    #[serde(default)]
    description: Option<String>,
    copies: u32,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>
}

impl From<BookRecord> for Book {
    fn from(record: BookRecord) -> Self {
        Book {
            id: record.id,
            title: record.title,
            author: record.author,
            genre: record.genre,
            isbn: record.isbn,
            description: record.description,
            available: record.copies > 0,
            copies: record.copies,
            created_at: record.created_at,
            updated_at: record.updated_at
        }
    }
}

impl Book {
    pub fn new<S: Into<String>>(
        id: S,
        title: S,
        author: S,
        genre: Genre,
        isbn: S,
        copies: u32
    ) -> Self {
        Book {
            id: id.into(),
            title: title.into(),
            author: author.into(),
            genre,
            isbn: isbn.into(),
            description: None,
            copies,
            available: copies > 0,
            created_at: None,
            updated_at: None
        }
    }

    pub fn copies(&self) -> u32 {
        self.copies
    }

    pub fn is_available(&self) -> bool {
        self.available
    }

    pub fn set_copies(&mut self, copies: u32) {
        self.copies = copies;
        self.available = copies > 0;
    }
}

/// The book a create call echoes back.
///
/// Servers differ in how much of the new record they return, so only the title is required.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedBook {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<Genre>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copies: Option<u32>
}

/// A recorded borrow of some copies of one book.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Borrow {
    #[serde(rename = "_id")]
    pub id: String,
    /// The id of the borrowed book.
    pub book: String,
    pub quantity: u32,
    pub due_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub borrowed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryBook {
    pub title: String,
    pub isbn: String
}

/// Borrowed quantity of one title, aggregated by the server.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BorrowSummaryEntry {
    pub book: SummaryBook,
    pub total_quantity: u32
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total_pages: u32,
    pub total_books: u32,
    pub has_next_page: bool,
    pub has_prev_page: bool
}

/// The response envelope every endpoint except delete uses.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: T,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>
}

/// A bare acknowledgement, as returned by delete.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>
}
