//! Administrative CLI for docshare user accounts.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

use docshare_db::Database;
use docshare_db::models::UserRow;
use docshare_server::config::DB_FILE;

#[derive(Parser)]
#[command(name = "docshare-admin")]
#[command(about = "Administrative CLI for docshare")]
#[command(version)]
struct Cli {
    /// Directory holding docshare.db
    #[arg(long, env = "DATA_DIR", default_value = "./data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an active user and print its API token
    CreateUser {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
    },
    /// Soft-delete a user; its API token stops working
    DeleteUser {
        #[arg(long)]
        id: String,
    },
}

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let cli = Cli::parse();

    let db_path = cli.data_dir.join(DB_FILE);
    if !db_path.exists() {
        bail!(
            "no database at {}; start the server once or pass --data-dir",
            db_path.display()
        );
    }
    let db = Database::open(&db_path)
        .with_context(|| format!("failed to open {}", db_path.display()))?;

    match cli.command {
        Commands::CreateUser { username, email } => create_user(&db, &username, &email),
        Commands::DeleteUser { id } => delete_user(&db, &id),
    }
}

fn create_user(db: &Database, username: &str, email: &str) -> Result<()> {
    let username = username.trim();
    let email = email.trim();
    if username.is_empty() || email.is_empty() {
        bail!("username and email must not be empty");
    }

    let now = docshare_db::now();
    let user = UserRow {
        id: docshare_crypto::user_id()?,
        username: username.to_string(),
        email: email.to_string(),
        api_token: docshare_crypto::api_token()?,
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    db.create_user(&user)
        .context("failed to create user (username or email taken?)")?;

    println!("User ID:   {}", user.id);
    println!("API token: {}", user.api_token);
    Ok(())
}

fn delete_user(db: &Database, id: &str) -> Result<()> {
    if !db.soft_delete_user(id, docshare_db::now())? {
        bail!("no live user with id {}", id);
    }
    println!("Deleted user {}", id);
    Ok(())
}
