use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};

use libraryai_catalog::admin::{AdminOrchestrator, AdminOutcome, AdminState, PageSize};
use libraryai_catalog::app_config::{build_data_source, AppConfig};
use libraryai_catalog::book::{Book, BookDraft};
use libraryai_catalog::detail::{CheckoutOutcome, DetailOrchestrator, DetailView};
use libraryai_catalog::notifications::NotificationLog;
use libraryai_catalog::search::{SearchOrchestrator, SearchOutcome};
use libraryai_catalog::telemetry::init_telemetry;

#[derive(Parser)]
#[command(name = "libraryai", version, about = "Library catalog with AI search summaries")]
struct Cli {
    /// Config file, `libraryai.toml` in the working directory is used when present
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Search the catalog and show the AI summary of the results
    Search { query: String },

    /// List one page of the catalog
    List {
        #[arg(long, default_value = "1")]
        page: u32,
        /// One of 5, 10, 20, 50
        #[arg(long)]
        page_size: Option<u32>,
    },

    /// Show details of a book
    Show { book_id: String },

    /// Check out a book
    Checkout {
        book_id: String,
        /// Loan duration, defaults to `checkout_days` from the config
        #[arg(long)]
        days: Option<u32>,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },

    /// Add a book to the catalog
    Add(BookFields),

    /// Update a book, fields that are not given keep their current value
    Update {
        book_id: String,
        #[command(flatten)]
        fields: BookFields,
    },

    /// Remove a book from the catalog
    Delete {
        book_id: String,
        #[arg(long, default_value = "1")]
        page: u32,
        #[arg(long)]
        page_size: Option<u32>,
    },
}

#[derive(Args)]
struct BookFields {
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    author: Option<String>,
    #[arg(long)]
    genre: Option<String>,
    #[arg(long)]
    year: Option<i32>,
    #[arg(long)]
    isbn: Option<String>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    publisher: Option<String>,
    #[arg(long)]
    pages: Option<u32>,
    #[arg(long)]
    language: Option<String>,
    #[arg(long)]
    rating: Option<f32>,
}

impl BookFields {
    fn apply_to(self, mut draft: BookDraft) -> BookDraft {
        if let Some(title) = self.title {
            draft.title = title;
        }
        if let Some(author) = self.author {
            draft.author = author;
        }
        if let Some(genre) = self.genre {
            draft.genre = genre;
        }
        if let Some(year) = self.year {
            draft.published_year = year;
        }
        if let Some(isbn) = self.isbn {
            draft.isbn = isbn;
        }
        if let Some(description) = self.description {
            draft.description = description;
        }
        draft.publisher = self.publisher.or(draft.publisher);
        draft.pages = self.pages.or(draft.pages);
        draft.language = self.language.or(draft.language);
        draft.rating = self.rating.or(draft.rating);
        draft
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    init_telemetry("libraryai")?;
    let cli = Cli::parse();

    let app_config = AppConfig::load(cli.config.as_deref())?;
    let data_source = build_data_source(&app_config)?;
    let notifications = Arc::new(NotificationLog::default());

    let succeeded = match cli.command {
        Command::Search { query } => {
            let search = SearchOrchestrator::new(
                data_source,
                notifications.clone(),
                app_config.summary_policy,
            );
            let outcome = search.run_search(&query).await;
            let state = search.state();
            if let Some(summary) = &state.summary {
                println!("AI summary for \"{}\"\n{}\n", summary.query, summary.text);
            }
            for book in state.visible_books() {
                print_book_line(book);
            }
            match outcome {
                SearchOutcome::Rejected => {
                    eprintln!("Enter a search query");
                    false
                }
                SearchOutcome::Completed | SearchOutcome::PartiallyCompleted => {
                    if state.visible_books().is_empty() && state.summary.is_some() {
                        println!("No books found");
                    }
                    outcome == SearchOutcome::Completed
                }
                SearchOutcome::Failed | SearchOutcome::Superseded => false,
            }
        }
        Command::List { page, page_size } => {
            let page_size = resolve_page_size(page_size, &app_config)?;
            let admin = AdminOrchestrator::new(data_source, notifications.clone(), page_size);
            let outcome = admin.go_to_page(page).await;
            print_page(&admin.state());
            outcome != AdminOutcome::Failed
        }
        Command::Show { book_id } => {
            let detail = DetailOrchestrator::new(data_source, notifications.clone());
            match detail.load_detail(&book_id).await {
                DetailView::Loaded(book) => {
                    print_book_detail(&book);
                    true
                }
                DetailView::NotFound(book_id) => {
                    eprintln!("Book {book_id} not found");
                    false
                }
                _ => false,
            }
        }
        Command::Checkout { book_id, days, yes } => {
            let days = app_config.checkout_days_or(days)?;
            let detail = DetailOrchestrator::new(data_source, notifications.clone());
            if let DetailView::Loaded(book) = detail.load_detail(&book_id).await {
                if detail.open_checkout_confirmation() {
                    if yes || confirm(&book, days)? {
                        match detail.confirm_checkout(days).await {
                            CheckoutOutcome::CheckedOut(receipt) => {
                                println!(
                                    "Checked out \"{}\" on {}, due {}",
                                    book.title, receipt.checkout_date, receipt.due_date
                                );
                                true
                            }
                            _ => false,
                        }
                    } else {
                        detail.cancel_checkout();
                        println!("Checkout cancelled");
                        true
                    }
                } else {
                    eprintln!("\"{}\" is {}", book.title, book.status_label());
                    false
                }
            } else {
                false
            }
        }
        Command::Add(fields) => {
            let admin = AdminOrchestrator::new(
                data_source,
                notifications.clone(),
                app_config.default_page_size,
            );
            admin.add_book(fields.apply_to(BookDraft::default())).await == AdminOutcome::Applied
        }
        Command::Update { book_id, fields } => {
            let detail = DetailOrchestrator::new(data_source.clone(), notifications.clone());
            match detail.load_detail(&book_id).await {
                DetailView::Loaded(book) => {
                    let admin = AdminOrchestrator::new(
                        data_source,
                        notifications.clone(),
                        app_config.default_page_size,
                    );
                    admin.update_book(&book_id, fields.apply_to(book.draft())).await
                        == AdminOutcome::Applied
                }
                _ => false,
            }
        }
        Command::Delete {
            book_id,
            page,
            page_size,
        } => {
            let page_size = resolve_page_size(page_size, &app_config)?;
            let admin = AdminOrchestrator::new(data_source, notifications.clone(), page_size);
            admin.go_to_page(page).await;
            let outcome = admin.delete_book(&book_id).await;
            if outcome == AdminOutcome::Applied {
                print_page(&admin.state());
            }
            outcome == AdminOutcome::Applied
        }
    };

    for notification in notifications.drain() {
        if notification.is_error() {
            eprintln!("{}: {}", notification.title, notification.description);
        } else {
            println!("{}: {}", notification.title, notification.description);
        }
    }

    Ok(if succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn resolve_page_size(page_size: Option<u32>, app_config: &AppConfig) -> anyhow::Result<PageSize> {
    Ok(match page_size {
        Some(page_size) => PageSize::try_from(page_size)?,
        None => app_config.default_page_size,
    })
}

fn confirm(book: &Book, days: u32) -> anyhow::Result<bool> {
    print!("Check out \"{}\" for {} days? [y/N] ", book.title, days);
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

fn print_book_line(book: &Book) {
    println!(
        "[{}] {} by {} ({}, {}) {} {}",
        book.id,
        book.title,
        book.author,
        book.genre,
        book.published_year,
        book.rating_stars(),
        book.status_label()
    );
}

fn print_page(state: &AdminState) {
    for book in &state.books {
        print_book_line(book);
    }
    println!("{} | {}", state.range_label(), state.page_label());
}

fn print_book_detail(book: &Book) {
    println!("{}", book.title);
    println!("by {}", book.author);
    println!("{} {}", book.rating_stars(), book.status_label());
    if let (Some(checkout_date), Some(due_date)) = (book.checkout_date(), book.due_date()) {
        println!("Checked out {checkout_date}, due {due_date}");
    }
    println!();
    println!("{}", book.description);
    println!();
    println!("Genre:      {}", book.genre);
    println!("Published:  {}", book.published_year);
    println!("ISBN:       {}", book.isbn);
    if let Some(publisher) = book.publisher.as_deref().filter(|p| !p.is_empty()) {
        println!("Publisher:  {publisher}");
    }
    if let Some(pages) = book.pages.filter(|pages| *pages > 0) {
        println!("Pages:      {pages}");
    }
    if let Some(language) = &book.language {
        println!("Language:   {language}");
    }
    println!("Cover:      {}", book.cover_url);
}
