//! Populates an empty database with the admin/staff accounts and demo data.

use resto_api::config::Settings;
use resto_api::db::seed::{seed, SeedOutcome};
use resto_api::db::SqlRepo;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    resto_api::init_tracing();

    let settings = Settings::from_env()?;
    let repo = SqlRepo::init(&settings).await?;

    match seed(&repo).await? {
        SeedOutcome::Seeded => println!("Seed completed."),
        SeedOutcome::Skipped => println!("Seed skipped: data already exists."),
    }
    Ok(())
}
