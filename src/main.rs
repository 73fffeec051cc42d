//! Voting Admin CLI
//!
//! Command-line front end for the voting app administration console:
//! - Log in and out
//! - Show the session dashboard (optionally refreshing)
//! - Show user locations
//! - Generate a config file

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use voting_admin::{App, Config, Credentials, LoggingConfig, OpenOptions, Route};

#[derive(Parser)]
#[command(name = "voting-admin")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Administration console for the voting app")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: ~/.config/voting-admin/config.toml, then ./config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Keep the session in memory only
    #[arg(long, global = true)]
    pub ephemeral: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Log in with NRP and password
    Login {
        /// Registration number
        #[arg(long)]
        nrp: String,
        /// Password (default: $VOTING_ADMIN_PASSWORD)
        #[arg(long)]
        password: Option<String>,
    },

    /// Log out and close the active session
    Logout,

    /// Show who is logged in
    Whoami,

    /// Open a page by path (/, /login, /dashboard, /locations)
    Open {
        path: String,
        /// Dashboard page
        #[arg(long)]
        page: Option<u64>,
        /// Maximum number of locations
        #[arg(long)]
        limit: Option<u64>,
    },

    /// Show the session dashboard
    Dashboard {
        /// Page number (1-based)
        #[arg(short, long, default_value = "1")]
        page: u64,
        /// Keep refreshing until Ctrl+C
        #[arg(short, long)]
        watch: bool,
    },

    /// Show user locations
    Locations {
        /// Maximum number of locations
        #[arg(short, long)]
        limit: Option<u64>,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Commands::Config { output } = &cli.command {
        let content = voting_admin::config::generate_default_config();
        match output {
            Some(path) => {
                std::fs::write(path, content)
                    .with_context(|| format!("writing {}", path.display()))?;
                println!("Wrote {}", path.display());
            }
            None => print!("{}", content),
        }
        return Ok(());
    }

    let config = Config::load_default(cli.config.as_deref())?;
    init_logging(&config.logging);
    tracing::debug!("Voting Admin v{}", env!("CARGO_PKG_VERSION"));

    let app = App::from_config(config, cli.ephemeral)?;

    match cli.command {
        Commands::Login { nrp, password } => {
            let password = match password.or_else(|| std::env::var("VOTING_ADMIN_PASSWORD").ok()) {
                Some(p) => p,
                None => {
                    eprintln!("Password required: pass --password or set VOTING_ADMIN_PASSWORD");
                    std::process::exit(2);
                }
            };

            match app
                .login_screen()
                .submit(&Credentials::new(nrp, password))
                .await
            {
                Ok(user) => println!("Logged in as {} (NRP {})", user.nama, user.nrp),
                Err(e) => {
                    eprintln!("{}", e.user_message());
                    std::process::exit(1);
                }
            }
        }

        Commands::Logout => {
            if app.session().is_authenticated() {
                app.login_screen().logout().await;
                println!("Logged out");
            } else {
                println!("Not logged in");
            }
        }

        Commands::Whoami => match app.session().current_user() {
            Some(user) => println!("{} (NRP {}, id {})", user.nama, user.nrp, user.id),
            None => println!("Not logged in"),
        },

        Commands::Open { path, page, limit } => {
            let rendered = app.open(&path, OpenOptions { page, limit }).await?;
            print!("{}", rendered.body);
        }

        Commands::Dashboard { page, watch: false } => {
            let rendered = app
                .open(Route::Dashboard.path(), OpenOptions { page: Some(page), limit: None })
                .await?;
            print!("{}", rendered.body);
        }

        Commands::Dashboard { page, watch: true } => watch_dashboard(&app, page).await?,

        Commands::Locations { limit } => {
            let rendered = app
                .open(Route::Locations.path(), OpenOptions { page: None, limit })
                .await?;
            print!("{}", rendered.body);
        }

        Commands::Config { .. } => unreachable!("handled before config is loaded"),
    }

    Ok(())
}

/// Re-render the dashboard on every refresh until Ctrl+C or logout
async fn watch_dashboard(app: &App, page: u64) -> anyhow::Result<()> {
    let mut navigator = app.navigator(Route::Dashboard);
    if navigator.current()? != Route::Dashboard {
        let rendered = app.open(Route::Dashboard.path(), OpenOptions::default()).await?;
        print!("{}", rendered.body);
        return Ok(());
    }

    let mut screen = app.dashboard_screen().starting_at(page);
    let mut refresh = app.watch_dashboard(page);

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            update = refresh.next() => {
                let Some(update) = update.map(|r| r.clone()) else { break };
                if let Some(result) = update {
                    screen.accept(result);
                    println!(
                        "\n== {} ==",
                        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
                    );
                    print!("{}", screen.render());
                }
            }
            Some(route) = navigator.changed() => {
                if route? != Route::Dashboard {
                    println!("Session ended");
                    break;
                }
            }
            _ = &mut shutdown => break,
        }
    }

    refresh.cancel();
    Ok(())
}

/// Wait for Ctrl+C
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install Ctrl+C handler: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("voting_admin={}", config.level)));

    let registry = tracing_subscriber::registry().with(filter);
    if config.format == "json" {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
