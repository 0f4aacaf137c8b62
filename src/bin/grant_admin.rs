//! Provisions a user profile and sets its role.
//!
//! ```text
//! grant-admin --user-id <uuid> --email <email> [--display-name <name>] [--revoke]
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use rent_reviews::{config::ConfigLoader, db, repositories::UserProfileRepository};
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "grant-admin", about = "Grant or revoke the admin role on a user profile")]
struct Args {
    /// Profile id as issued by the auth gateway
    #[arg(long)]
    user_id: Uuid,

    #[arg(long)]
    email: String,

    #[arg(long)]
    display_name: Option<String>,

    /// Downgrade the profile to a regular user instead
    #[arg(long)]
    revoke: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = ConfigLoader::new()
        .load()
        .context("loading configuration")?;

    let db = db::init_pool(&config)
        .await
        .context("initializing database connection pool")?;

    let profile = UserProfileRepository::new(&db)
        .upsert_profile(args.user_id, args.email.trim(), args.display_name, !args.revoke)
        .await
        .with_context(|| format!("updating profile {}", args.user_id))?;

    println!("Profile {} ({}) now has role '{}'", profile.id, profile.email, profile.role);

    Ok(())
}
