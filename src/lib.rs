//! # Voting Admin
//!
//! Administration console for a voting app: log in, watch who is logged in,
//! and see where users reported their position from. All data lives in a
//! hosted tables API; this crate keeps only the current session locally.
//!
//! ## Modules
//!
//! - [`session`]: Session store with a durable mirror
//! - [`router`]: Routes and the route guard
//! - [`backend`]: Tables API client and row types
//! - [`screens`]: Login, dashboard, and locations screens
//! - [`app`]: Wires the pieces together
//! - [`config`]: TOML + environment configuration
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use voting_admin::{App, Config, Credentials, OpenOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let app = App::from_config(Config::load_default(None)?, false)?;
//!
//!     app.login_screen()
//!         .submit(&Credentials::new("1001", "secret"))
//!         .await?;
//!
//!     let dashboard = app.open("/dashboard", OpenOptions::default()).await?;
//!     println!("{}", dashboard.body);
//!
//!     app.login_screen().logout().await;
//!     Ok(())
//! }
//! ```

pub mod app;
pub mod backend;
pub mod config;
pub mod router;
pub mod screens;
pub mod session;

// Re-export top-level types for convenience
pub use app::{App, AppError, OpenOptions, Rendered};

pub use backend::{
    BackendError, BackendResult, ClientConfig, Filter, LocationRow, PostgrestClient,
    QueryResponse, QueryService, SelectQuery, SessionRow, UserRow,
};

pub use config::{
    BackendConfig, Config, ConfigError, DashboardConfig, LocationsConfig, LoggingConfig,
    SessionConfig,
};

pub use router::{Navigation, Navigator, Route, RouteError, RouteGuard};

pub use screens::{
    Credentials, DashboardScreen, LoadState, LocationsScreen, LoginError, LoginScreen, MapView,
    Pager, Poller, RefreshHandle,
};

pub use session::{
    DurableStorage, FileStorage, MemoryStorage, SessionError, SessionState, SessionStore,
    StorageError, User,
};
