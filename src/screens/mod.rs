//! View Screens
//!
//! Each screen fetches rows through a `QueryService`, keeps them with a
//! simple load flag, and renders them as text:
//!
//! - **login**: credential check, session row upsert, session store login
//! - **dashboard**: paginated users joined with their newest session
//! - **locations**: GPS fixes with a map center and tile
//! - **poller**: periodic refresh with an explicit cancellation handle
//! - **table**: plain-text table rendering

pub mod dashboard;
pub mod locations;
pub mod login;
pub mod poller;
pub mod table;

pub use dashboard::{fetch_dashboard_page, DashboardPage, DashboardRow, DashboardScreen};
pub use locations::{fetch_locations, tile_for, LocationsScreen, MapView, TileCoord};
pub use login::{Credentials, LoginError, LoginScreen};
pub use poller::{Poller, RefreshHandle};
pub use table::{format_time, Table};

/// Load flag shared by all screens
#[derive(Debug, Clone, PartialEq, Default)]
pub enum LoadState<T> {
    #[default]
    Loading,
    Ready(T),
    Failed(String),
}

impl<T> LoadState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, LoadState::Loading)
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            LoadState::Ready(data) => Some(data),
            _ => None,
        }
    }

    /// Fold a fetch result in. A failure keeps data that was already shown.
    pub fn apply<E: std::fmt::Display>(&mut self, result: Result<T, E>, what: &str) {
        match result {
            Ok(data) => *self = LoadState::Ready(data),
            Err(e) => {
                tracing::error!("Error fetching {}: {}", what, e);
                if !matches!(self, LoadState::Ready(_)) {
                    *self = LoadState::Failed(e.to_string());
                }
            }
        }
    }
}

/// Highest page `Pager::go_to` will move to
pub const MAX_PAGE: u64 = 1_000_000;

/// Prior/next page counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pager {
    /// 1-based
    pub page: u64,
    pub per_page: u64,
    pub total: u64,
}

impl Pager {
    pub fn new(per_page: u64) -> Self {
        Self {
            page: 1,
            per_page: per_page.max(1),
            total: 0,
        }
    }

    pub fn total_pages(&self) -> u64 {
        self.total.div_ceil(self.per_page.max(1))
    }

    /// Inclusive row range of the current page
    pub fn range(&self) -> (u64, u64) {
        let from = self.page.saturating_sub(1).saturating_mul(self.per_page);
        (from, from.saturating_add(self.per_page.saturating_sub(1)))
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }

    pub fn next(&mut self) {
        self.page = self.page.saturating_add(1).min(self.total_pages().max(1));
    }

    pub fn prev(&mut self) {
        self.page = self.page.saturating_sub(1).max(1);
    }

    /// Jump to a page, clamped to `1..=MAX_PAGE`
    pub fn go_to(&mut self, page: u64) {
        self.page = page.clamp(1, MAX_PAGE);
    }

    pub fn footer(&self) -> String {
        format!("Page {} of {}", self.page, self.total_pages())
    }
}
