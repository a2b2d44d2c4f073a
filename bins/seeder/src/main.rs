//! Database seeder for Tidepool development and testing.
//!
//! Seeds a test user (`test@example.com` / `password123`) and a few sample
//! items. Safe to run repeatedly.
//!
//! Usage: cargo run --bin seeder

use anyhow::Context;
use tidepool_core::auth::{AuthRepository as _, NewUser, hash_password, normalize_email};
use tidepool_core::items::{ItemRepository as _, NewItem};
use tidepool_db::{AuthRepository, ItemRepository};

const TEST_EMAIL: &str = "test@example.com";
const TEST_PASSWORD: &str = "password123";

const SAMPLE_ITEMS: [(&str, &str); 3] = [
    ("Sea glass", "Frosted green, found at low tide"),
    ("Hermit crab shell", "Vacant, medium size"),
    ("Kelp sample", "Bull kelp, dried"),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let database_url =
        std::env::var("DATABASE_URL").context("DATABASE_URL must be set in environment")?;

    println!("Connecting to database...");
    let db = tidepool_db::connect(&database_url)
        .await
        .context("failed to connect to database")?;

    println!("Seeding test user...");
    let auth = AuthRepository::new(db.clone());
    let email = normalize_email(TEST_EMAIL);
    let user = if let Some(user) = auth.find_user_by_email(&email).await? {
        println!("  Test user already exists, skipping...");
        user
    } else {
        let password_hash = hash_password(TEST_PASSWORD)?;
        let user = auth
            .create_user(
                NewUser {
                    name: "Test User".to_string(),
                    email,
                },
                password_hash,
            )
            .await?;
        println!("  Created {TEST_EMAIL} / {TEST_PASSWORD}");
        user
    };

    println!("Seeding items...");
    let items = ItemRepository::new(db.clone());
    if items.list().await?.is_empty() {
        for (name, description) in SAMPLE_ITEMS {
            items
                .create(NewItem {
                    name: name.to_string(),
                    description: Some(description.to_string()),
                    user_id: Some(user.id),
                })
                .await?;
        }
        println!("  Created {} items", SAMPLE_ITEMS.len());
    } else {
        println!("  Items already present, skipping...");
    }

    db.close().await?;
    println!("Seeding complete!");
    Ok(())
}
