use anyhow::Context;
use chrono::{NaiveDate, TimeZone, Utc};
use clap::{Args, Parser, Subcommand};
use config::CliConfig;
use libris::Exchange;
use libris_books::{
    endpoints::BookQuery,
    forms::{BookChanges, BorrowForm, NewBook},
    models::Genre,
    notice::{
        Notice, NoticeBoard, NoticeLevel, ADD_FAILED, BORROW_FAILED, DELETE_FAILED, UPDATE_FAILED
    },
    LibraryApi
};
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod config;
mod render;

#[derive(Parser, Debug)]
#[command(name = "libris", version, about = "Browse and manage the library catalogue")]
struct Cli {
    /// Use this API instead of the configured one.
    #[arg(long, global = true)]
    api: Option<String>,

    #[command(subcommand)]
    command: Command
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List a page of books.
    Books {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long)]
        limit: Option<u32>
    },
    /// Show one book.
    Book { id: String },
    /// Add a book to the catalogue.
    Add(AddArgs),
    /// Change some fields of a book.
    Edit(EditArgs),
    /// Remove a book from the catalogue.
    Delete { id: String },
    /// Borrow copies of a book.
    Borrow {
        id: String,
        #[arg(long, default_value_t = 1)]
        quantity: u32,
        /// Due date as YYYY-MM-DD. Defaults to tomorrow.
        #[arg(long)]
        due: Option<NaiveDate>
    },
    /// Show how many copies of each title are out.
    Summary
}

#[derive(Args, Debug)]
struct AddArgs {
    #[arg(long)]
    title: String,
    #[arg(long)]
    author: String,
    #[arg(long)]
    genre: Genre,
    #[arg(long)]
    isbn: String,
    #[arg(long)]
    description: Option<String>,
    #[arg(long, default_value_t = 1)]
    copies: u32
}

#[derive(Args, Debug)]
struct EditArgs {
    id: String,
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    author: Option<String>,
    #[arg(long)]
    genre: Option<Genre>,
    #[arg(long)]
    isbn: Option<String>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    copies: Option<u32>
}

impl From<AddArgs> for NewBook {
    fn from(args: AddArgs) -> Self {
        NewBook {
            title: args.title,
            author: args.author,
            genre: args.genre,
            isbn: args.isbn,
            description: args.description,
            copies: args.copies
        }
    }
}

impl EditArgs {
    fn into_changes(self) -> (String, BookChanges) {
        let changes = BookChanges {
            title: self.title,
            author: self.author,
            genre: self.genre,
            isbn: self.isbn,
            description: self.description,
            copies: self.copies
        };
        (self.id, changes)
    }
}

fn init_tracing(config: &CliConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = CliConfig::load()?;
    if let Some(api) = cli.api {
        config.api_base_url = api;
        config.validate()?;
    }
    init_tracing(&config);
    tracing::debug!(api = %config.api_base_url, "connecting");

    let api = LibraryApi::connect(&config.api_base_url)
        .with_context(|| format!("Can't use {} as the API url", config.api_base_url))?;
    let board = NoticeBoard::new(config.notice_ttl());

    run(cli.command, &api, &config, &board).await?;

    // Everything this command posted, even if it outlived the notice lifetime
    let notices = board.drain();
    for notice in &notices {
        match notice.level {
            NoticeLevel::Success => println!("{}", notice),
            NoticeLevel::Error => eprintln!("{}", notice)
        }
    }
    if any_failed(&notices) {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn any_failed(notices: &[Notice]) -> bool {
    notices.iter().any(|notice| !notice.is_success())
}

/// Queries fail the whole command. Mutations report through the notice board.
async fn run<M: Exchange>(
    command: Command,
    api: &LibraryApi<M>,
    config: &CliConfig,
    board: &NoticeBoard
) -> anyhow::Result<()> {
    match command {
        Command::Books { page, limit } => {
            let books = api
                .books(BookQuery {
                    page: Some(page),
                    limit
                })
                .await?;
            print!("{}", render::book_table(&books.data));
            if let Some(links) = books
                .pagination
                .as_ref()
                .and_then(|pagination| render::page_links(page, pagination, config.page_window))
            {
                println!("\n{}", links);
            }
        }
        Command::Book { id } => {
            let book = api.book(&id).await?;
            print!("{}", render::book_details(&book));
        }
        Command::Add(args) => {
            let notice = match api.add_book(args.into()).await {
                Ok(book) => Notice::book_added(&book.title),
                Err(e) => Notice::failure(&e, ADD_FAILED)
            };
            board.push(notice);
        }
        Command::Edit(args) => {
            let (id, changes) = args.into_changes();
            if changes.is_empty() {
                anyhow::bail!("Nothing to change. Pass at least one field to edit.");
            }
            let notice = match api.update_book(&id, changes).await {
                Ok(_) => Notice::book_updated(),
                Err(e) => Notice::failure(&e, UPDATE_FAILED)
            };
            board.push(notice);
        }
        Command::Delete { id } => {
            let title = title_of(api, &id).await;
            let notice = match api.delete_book(&id).await {
                Ok(ack) => Notice::book_deleted(&ack, &title),
                Err(e) => Notice::failure(&e, DELETE_FAILED)
            };
            board.push(notice);
        }
        Command::Borrow { id, quantity, due } => {
            let title = title_of(api, &id).await;
            let mut form = BorrowForm {
                quantity,
                ..BorrowForm::new(id)
            };
            if let Some(due) = due {
                let midnight = due
                    .and_hms_opt(0, 0, 0)
                    .context("Due date has no midnight")?;
                form.due_date = Utc.from_utc_datetime(&midnight);
            }
            let notice = match api.borrow_book(form).await {
                Ok(_) => Notice::book_borrowed(&title),
                Err(e) => Notice::failure(&e, BORROW_FAILED)
            };
            board.push(notice);
        }
        Command::Summary => {
            let entries = api.borrow_summary().await?;
            println!("{}", render::summary_table(&entries));
        }
    }
    Ok(())
}

/// The title to put in notices. Falls back to the id when the book can't be read.
async fn title_of<M: Exchange>(api: &LibraryApi<M>, id: &str) -> String {
    match api.book(id).await {
        Ok(book) => book.title,
        Err(e) => {
            tracing::debug!(id, error = %e, "couldn't look up title");
            id.to_string()
        }
    }
}
