//! Print a short tour of a running bridge.
//!
//! ```text
//! ICLOUD_BRIDGE_URL=http://localhost:31337 cargo run -p icloud-bridge --example summary
//! ```

use icloud_bridge::{BridgeClient, BridgeConfig, BridgeError, PhotoQuery};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), BridgeError> {
    let client = BridgeClient::new(BridgeConfig::from_env()?);

    let health = client.health()?;
    println!("Server status: {}", health.status);

    let lists = client.lists()?;
    println!("\nFound {} reminder lists:", lists.len());
    for list in &lists {
        println!("  - {} ({} reminders)", list.title, list.reminder_count);
    }

    if let Some(first) = lists.first() {
        println!("\nIncomplete reminders in '{}':", first.title);
        for reminder in first.reminders(&client, false)? {
            let mark = if reminder.is_completed { "[x]" } else { "[ ]" };
            println!("  {mark} {}", reminder.title);
        }
    }

    let albums = client.albums()?;
    println!("\nFound {} photo albums:", albums.len());
    for album in &albums {
        println!(
            "  - {} ({} photos, {} videos)",
            album.title, album.photo_count, album.video_count
        );
    }

    if let Some(first) = albums.first() {
        let query = PhotoQuery {
            limit: 5,
            ..PhotoQuery::default()
        };
        let page = client.photo_page(&first.id, &query)?;
        println!("\nFirst 5 photos in '{}' (total: {}):", first.title, page.total);
        for photo in &page.photos {
            println!(
                "  - {} ({}x{}, {:?})",
                photo.filename.as_deref().unwrap_or(&photo.id),
                photo.width,
                photo.height,
                photo.kind
            );
        }
    }

    Ok(())
}
