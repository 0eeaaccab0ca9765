use libris_books::{
    models::{Book, BorrowSummaryEntry, Pagination},
    page_window, BorrowStats
};
use std::fmt::Write;

pub fn book_table(books: &[Book]) -> String {
    let mut out = format!(
        "{:<26} {:<32} {:<22} {:<14} {:>6}  {}\n",
        "ID", "TITLE", "AUTHOR", "GENRE", "COPIES", "STATUS"
    );
    for book in books {
        let _ = writeln!(
            out,
            "{:<26} {:<32} {:<22} {:<14} {:>6}  {}",
            book.id,
            truncate(&book.title, 32),
            truncate(&book.author, 22),
            book.genre.label(),
            book.copies(),
            availability(book)
        );
    }
    out
}

pub fn book_details(book: &Book) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", book.title);
    let _ = writeln!(out, "  by {}", book.author);
    let _ = writeln!(out, "  Genre:  {}", book.genre);
    let _ = writeln!(out, "  ISBN:   {}", book.isbn);
    let _ = writeln!(out, "  Copies: {} ({})", book.copies(), availability(book));
    if let Some(description) = &book.description {
        let _ = writeln!(out, "\n{}", description);
    }
    out
}

/// `Pages: 1 2 [3] 4 5 of 12`, or `None` when there is only one page.
pub fn page_links(current: u32, pagination: &Pagination, window: u32) -> Option<String> {
    if pagination.total_pages <= 1 {
        return None;
    }
    let current = current.max(1).min(pagination.total_pages);
    let pages: Vec<String> = page_window(current, pagination.total_pages, window)
        .map(|page| {
            if page == current {
                format!("[{}]", page)
            } else {
                page.to_string()
            }
        })
        .collect();
    Some(format!(
        "Pages: {} of {}",
        pages.join(" "),
        pagination.total_pages
    ))
}

pub fn summary_table(entries: &[BorrowSummaryEntry]) -> String {
    let mut out = format!("{:<32} {:<16} {:>8}\n", "TITLE", "ISBN", "BORROWED");
    for entry in entries {
        let _ = writeln!(
            out,
            "{:<32} {:<16} {:>8}",
            truncate(&entry.book.title, 32),
            entry.book.isbn,
            entry.total_quantity
        );
    }
    let stats = BorrowStats::from_entries(entries);
    let _ = write!(
        out,
        "\n{} copies borrowed across {} titles",
        stats.total_borrowed, stats.unique_titles
    );
    out
}

fn availability(book: &Book) -> &'static str {
    if book.is_available() {
        "Available"
    } else {
        "Unavailable"
    }
}

fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(width.saturating_sub(3)).collect();
        out.push_str("...");
        out
    }
}
