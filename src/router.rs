//! Routes and the Route Guard
//!
//! Navigation is a pure function of the requested route and the session
//! state. `Navigator` re-runs it every time the session store changes.

use std::fmt;
use thiserror::Error;
use tokio::sync::watch;

use crate::session::{SessionState, SessionStore};

/// Screen paths
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Root,
    Login,
    Dashboard,
    Locations,
}

impl Route {
    /// Parse a path such as `/dashboard` or `dashboard/`
    pub fn parse(path: &str) -> Result<Self, RouteError> {
        let trimmed = path.trim().trim_matches('/');
        match trimmed {
            "" => Ok(Route::Root),
            "login" => Ok(Route::Login),
            "dashboard" => Ok(Route::Dashboard),
            "locations" => Ok(Route::Locations),
            _ => Err(RouteError::NotFound(path.to_string())),
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            Route::Root => "/",
            Route::Login => "/login",
            Route::Dashboard => "/dashboard",
            Route::Locations => "/locations",
        }
    }

    /// Whether the route requires an authenticated session
    pub fn is_protected(&self) -> bool {
        matches!(self, Route::Dashboard | Route::Locations)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Outcome of guarding a route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    /// Show this screen
    Render(Route),
    /// Show nothing and go here instead
    Redirect(Route),
}

/// Routing errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RouteError {
    #[error("No such page: {0}")]
    NotFound(String),

    #[error("Redirect loop at {0}")]
    RedirectLoop(Route),
}

/// Admits or redirects navigation based on the session state
#[derive(Debug, Default, Clone, Copy)]
pub struct RouteGuard;

impl RouteGuard {
    pub fn new() -> Self {
        Self
    }

    /// Decide what happens when `route` is requested in `state`
    pub fn resolve(&self, route: Route, state: &SessionState) -> Navigation {
        match route {
            Route::Root if state.is_authenticated() => Navigation::Redirect(Route::Dashboard),
            Route::Root => Navigation::Redirect(Route::Login),
            r if r.is_protected() && !state.is_authenticated() => {
                Navigation::Redirect(Route::Login)
            }
            r => Navigation::Render(r),
        }
    }

    /// Follow redirects until a route renders
    pub fn settle(&self, route: Route, state: &SessionState) -> Result<Route, RouteError> {
        let mut current = route;
        // Four routes, so any chain longer than that is a loop
        for _ in 0..4 {
            match self.resolve(current, state) {
                Navigation::Render(r) => return Ok(r),
                Navigation::Redirect(next) => {
                    tracing::debug!(from = %current, to = %next, "Redirect");
                    current = next;
                }
            }
        }
        Err(RouteError::RedirectLoop(current))
    }
}

/// Keeps a requested route and re-guards it on every session change
pub struct Navigator {
    guard: RouteGuard,
    requested: Route,
    session: watch::Receiver<SessionState>,
}

impl Navigator {
    pub fn new(store: &SessionStore, requested: Route) -> Self {
        Self {
            guard: RouteGuard::new(),
            requested,
            session: store.subscribe(),
        }
    }

    /// Navigate to a new route
    pub fn navigate(&mut self, route: Route) -> Result<Route, RouteError> {
        self.requested = route;
        self.current()
    }

    /// The route that renders right now
    pub fn current(&mut self) -> Result<Route, RouteError> {
        let state = self.session.borrow_and_update().clone();
        self.guard.settle(self.requested, &state)
    }

    /// Wait for the next session change and return the route that renders after it
    ///
    /// Returns `None` once the session store is gone.
    pub async fn changed(&mut self) -> Option<Result<Route, RouteError>> {
        self.session.changed().await.ok()?;
        Some(self.current())
    }
}
