//! Application Composition
//!
//! Builds the session store and the tables client once and passes them
//! explicitly to every screen.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::backend::{BackendError, ClientConfig, PostgrestClient, QueryService};
use crate::config::Config;
use crate::router::{Navigator, Route, RouteError};
use crate::screens::{
    fetch_dashboard_page, DashboardPage, DashboardScreen, LocationsScreen, LoginScreen, Pager,
    Poller, RefreshHandle,
};
use crate::session::{DurableStorage, FileStorage, MemoryStorage, SessionStore};

/// Startup and navigation errors
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Route error: {0}")]
    Route(#[from] RouteError),
}

/// What a navigation produced
#[derive(Debug, Clone, PartialEq)]
pub struct Rendered {
    /// The route that was asked for
    pub requested: Route,
    /// The route that rendered after redirects
    pub route: Route,
    pub body: String,
}

impl Rendered {
    pub fn redirected(&self) -> bool {
        self.requested != self.route
    }
}

/// Options for `App::open`
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenOptions {
    /// Dashboard page, 1-based
    pub page: Option<u64>,
    /// Cap on location markers
    pub limit: Option<u64>,
}

/// The console: session store, tables client, and config
pub struct App {
    config: Config,
    session: SessionStore,
    backend: Arc<dyn QueryService>,
}

impl App {
    /// Assemble from already-built parts
    pub fn new(config: Config, session: SessionStore, backend: Arc<dyn QueryService>) -> Self {
        Self {
            config,
            session,
            backend,
        }
    }

    /// Build from config and hydrate the session from durable storage
    ///
    /// `ephemeral` keeps the session in memory only.
    pub fn from_config(config: Config, ephemeral: bool) -> Result<Self, AppError> {
        let storage: Arc<dyn DurableStorage> = if ephemeral {
            Arc::new(MemoryStorage::new())
        } else {
            Arc::new(FileStorage::new(&config.session.storage_dir))
        };
        let session = SessionStore::with_key(storage, config.session.storage_key.clone());
        session.restore();

        let client = PostgrestClient::new(ClientConfig::from(&config.backend))?;
        tracing::debug!(url = %client.config().base_url, "Tables client ready");

        Ok(Self::new(config, session, Arc::new(client)))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn login_screen(&self) -> LoginScreen {
        LoginScreen::new(Arc::clone(&self.backend), self.session.clone())
    }

    pub fn dashboard_screen(&self) -> DashboardScreen {
        DashboardScreen::new(Arc::clone(&self.backend), self.config.dashboard.page_size)
    }

    pub fn locations_screen(&self) -> LocationsScreen {
        LocationsScreen::new(Arc::clone(&self.backend), self.config.locations.clone())
    }

    pub fn navigator(&self, route: Route) -> Navigator {
        Navigator::new(&self.session, route)
    }

    /// Guard `path`, follow redirects, and render whatever ends up on screen
    pub async fn open(&self, path: &str, options: OpenOptions) -> Result<Rendered, AppError> {
        let requested = Route::parse(path)?;
        let route = self.navigator(requested).current()?;
        if route != requested {
            tracing::info!(from = %requested, to = %route, "Redirected");
        }

        let body = match route {
            Route::Login => self.render_login(),
            Route::Dashboard => {
                let mut screen = self.dashboard_screen();
                screen.go_to(options.page.unwrap_or(1)).await;
                screen.render()
            }
            Route::Locations => {
                let mut screen = self.locations_screen();
                screen.load(options.limit).await;
                screen.render()
            }
            // The guard never settles on the root
            Route::Root => String::new(),
        };

        Ok(Rendered {
            requested,
            route,
            body,
        })
    }

    /// Refresh one dashboard page on the configured interval
    pub fn watch_dashboard(&self, page: u64) -> RefreshHandle<DashboardPage> {
        let backend = Arc::clone(&self.backend);
        let mut pager = Pager::new(self.config.dashboard.page_size);
        pager.go_to(page);
        let every = Duration::from_secs(self.config.dashboard.refresh_interval_secs.max(1));

        Poller::spawn(every, move || {
            let backend = Arc::clone(&backend);
            async move { fetch_dashboard_page(backend.as_ref(), pager).await }
        })
    }

    fn render_login(&self) -> String {
        match self.session.current_user() {
            Some(user) => format!(
                "Login Voting App\n\nLogged in as {} (NRP {})\n",
                user.nama, user.nrp
            ),
            None => "Login Voting App\n\nNot logged in. Run `voting-admin login --nrp <NRP>`.\n"
                .to_string(),
        }
    }
}
