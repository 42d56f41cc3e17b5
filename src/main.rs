use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::bail;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use prethesis::auth::AuthenticationMode;
use prethesis::config::ServerConfig;
use prethesis::server::{AppState, create_router};
use prethesis::store::{SqliteStore, Store};
use prethesis::sync::{HttpDirectoryClient, run_scheduler};
use prethesis::types::User;

#[derive(Parser)]
#[command(name = "prethesis")]
#[command(about = "A thesis supervision register", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Administrative commands
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },

    /// Start the server
    Serve {
        /// Path to a TOML configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(long, short)]
        port: Option<u16>,

        /// Data directory for the database
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Identity header mode: "proxy" or "mock"
        #[arg(long)]
        auth_mode: Option<String>,

        /// Base URL of the university directory API
        #[arg(long)]
        directory_url: Option<String>,
    },
}

#[derive(Subcommand)]
enum AdminCommands {
    /// Initialize the database and create the first admin user
    Init {
        /// Data directory for the database
        #[arg(long, default_value = "./data")]
        data_dir: PathBuf,

        /// Username granted the admin role at first login
        #[arg(long)]
        admin_username: String,
    },
}

fn run_init(data_dir: PathBuf, admin_username: String) -> anyhow::Result<()> {
    fs::create_dir_all(&data_dir)?;

    let store = SqliteStore::new(data_dir.join("prethesis.db"))?;
    store.initialize()?;

    if store.has_admin_user()? {
        bail!("Database already initialized: an admin user exists.");
    }

    let username = admin_username.trim();
    if username.is_empty() || username.contains(char::is_whitespace) {
        bail!("Admin username must be non-empty and contain no whitespace.");
    }

    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4().to_string(),
        username: username.to_string(),
        first_name: None,
        last_name: None,
        email: None,
        department_id: None,
        is_admin: true,
        is_manual_admin: true,
        created_at: now,
        updated_at: now,
    };
    store.create_user(&user)?;

    println!("Created admin user '{username}'.");
    println!("Database at: {}", data_dir.join("prethesis.db").display());

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("prethesis=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Admin { command } => match command {
            AdminCommands::Init {
                data_dir,
                admin_username,
            } => {
                run_init(data_dir, admin_username)?;
            }
        },
        Commands::Serve {
            config,
            host,
            port,
            data_dir,
            auth_mode,
            directory_url,
        } => {
            let mut config = match config {
                Some(path) => ServerConfig::load(&path)?,
                None => ServerConfig::default(),
            };
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            if let Some(data_dir) = data_dir {
                config.data_dir = data_dir;
            }
            if let Some(mode) = auth_mode {
                config.auth_mode = match AuthenticationMode::parse(&mode) {
                    Some(mode) => mode,
                    None => bail!("Unknown auth mode '{mode}' (expected 'proxy' or 'mock')"),
                };
            }
            if let Some(url) = directory_url {
                config.directory_base_url = Some(url);
            }

            fs::create_dir_all(&config.data_dir)?;
            let store = SqliteStore::new(config.db_path())?;
            store.initialize()?;

            let store: Arc<dyn Store> = Arc::new(store);

            if let Some(url) = config.directory_base_url.clone() {
                let client = HttpDirectoryClient::new(url);
                tokio::spawn(run_scheduler(
                    client,
                    Arc::clone(&store),
                    config.sync_interval_hours,
                ));
            } else {
                info!("No directory URL configured; directory sync disabled");
            }

            let addr = config.socket_addr()?;
            let state = Arc::new(AppState { store, config });
            let app = create_router(state);

            info!("Starting server on {}", addr);

            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}
