use std::sync::Arc;
use std::time::{Duration, UNIX_EPOCH};

use libraryai_catalog::admin::{AdminOrchestrator, AdminOutcome, PageSize};
use libraryai_catalog::book::{BookDraft, CheckoutStatus};
use libraryai_catalog::catalog_data_source::{
    CatalogDataSource, CatalogError, RemoteCatalogDataSource,
};
use libraryai_catalog::notifications::NotificationLog;
use libraryai_catalog::search::{SearchOrchestrator, SearchOutcome, SummaryFailurePolicy};

fn data_source() -> RemoteCatalogDataSource {
    RemoteCatalogDataSource::new(&crate::catalog_url(), Duration::from_secs(30))
        .expect("Failed to create client")
}

fn unique_title(prefix: &str) -> String {
    format!(
        "{} {}",
        prefix,
        std::time::SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    )
}

#[tokio::test]
/// Simple test for the catalog service
/// Creates a book
/// Gets the book
/// Updates the book
/// Finds the book by search and gets a summary
/// Checks the book out
/// Deletes the book
async fn catalog_e2e_test() {
    let data_source = data_source();
    let title = unique_title("System test book");

    let draft = BookDraft {
        title: title.clone(),
        author: "Author1".to_string(),
        description: "Description1".to_string(),
        genre: "Fiction".to_string(),
        published_year: 1999,
        isbn: "978-0000000001".to_string(),
        ..BookDraft::default()
    };

    // ADD BOOK
    let created = data_source
        .create(draft.clone())
        .await
        .expect("Failed to add book");
    assert_eq!(created.title, title);

    // GET BOOK
    let book = data_source
        .fetch_one(&created.id)
        .await
        .expect("Failed to get book");
    assert_eq!(book.author, "Author1");
    assert_eq!(book.published_year, 1999);
    assert!(!book.is_checked_out());

    // UPDATE BOOK
    let updated_title = unique_title("Updated system test book");
    data_source
        .update(
            &created.id,
            BookDraft {
                title: updated_title.clone(),
                ..book.draft()
            },
        )
        .await
        .expect("Failed to update book");
    let book = data_source
        .fetch_one(&created.id)
        .await
        .expect("Failed to get book");
    assert_eq!(book.title, updated_title);

    // SEARCH + SUMMARY
    let books = data_source
        .search(&updated_title)
        .await
        .expect("Failed to search books");
    assert!(books.iter().any(|b| b.id == created.id));
    let summary = data_source
        .fetch_summary(&updated_title)
        .await
        .expect("Failed to fetch summary");
    assert_eq!(summary.query, updated_title);

    // CHECKOUT
    let receipt = data_source
        .checkout(&created.id, 7)
        .await
        .expect("Failed to check out book");
    assert!(receipt.due_date > receipt.checkout_date);
    let book = data_source
        .fetch_one(&created.id)
        .await
        .expect("Failed to get book");
    assert!(matches!(book.status, CheckoutStatus::CheckedOut { .. }));

    // DELETE
    data_source
        .delete(&created.id)
        .await
        .expect("Failed to delete book");
    let deleted = data_source.fetch_one(&created.id).await;
    assert!(matches!(deleted, Err(CatalogError::NotFound(_))));
}

#[tokio::test]
/// Drives the admin and search flows against the running service
async fn orchestrators_e2e_test() {
    let data_source: Arc<dyn CatalogDataSource> = Arc::new(data_source());
    let notifications = Arc::new(NotificationLog::default());
    let admin = AdminOrchestrator::new(data_source.clone(), notifications.clone(), PageSize::Five);

    assert_eq!(admin.load().await, AdminOutcome::Applied);
    let total_before = admin.state().total;

    let title = unique_title("Orchestrated book");
    let outcome = admin
        .add_book(BookDraft {
            title: title.clone(),
            author: "Author2".to_string(),
            genre: "Mystery".to_string(),
            published_year: 2001,
            isbn: "978-0000000002".to_string(),
            description: "Description2".to_string(),
            ..BookDraft::default()
        })
        .await;
    assert_eq!(outcome, AdminOutcome::Applied);
    assert_eq!(admin.state().total, total_before + 1);
    let book_id = admin
        .state()
        .books
        .iter()
        .find(|b| b.title == title)
        .map(|b| b.id.clone())
        .expect("Added book not shown");

    let search = SearchOrchestrator::new(
        data_source.clone(),
        notifications.clone(),
        SummaryFailurePolicy::FailFast,
    );
    assert_eq!(search.run_search(&title).await, SearchOutcome::Completed);
    let state = search.state();
    assert!(state.books.iter().any(|b| b.id == book_id));
    assert_eq!(
        state.summary.map(|summary| summary.query),
        Some(title.clone())
    );

    assert_eq!(admin.delete_book(&book_id).await, AdminOutcome::Applied);
    assert!(notifications.entries().iter().all(|n| !n.is_error()));
}
