//! Dashboard Screen
//!
//! Paginated list of users, each joined with its most recent session row.

use std::collections::HashMap;
use std::sync::Arc;

use super::table::{format_time, Table};
use super::{LoadState, Pager};
use crate::backend::{
    BackendResult, QueryService, SelectQuery, SessionRow, UserRow, SESSIONS_TABLE, USERS_TABLE,
};

const PASSWORD_MASK: &str = "••••••••";

/// One user with their newest session, if any
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardRow {
    pub user: UserRow,
    pub session: Option<SessionRow>,
}

impl DashboardRow {
    pub fn is_active(&self) -> bool {
        self.session.as_ref().map(|s| s.is_active).unwrap_or(false)
    }

    pub fn status(&self) -> &'static str {
        if self.is_active() {
            "Logged in"
        } else {
            "Logged out"
        }
    }
}

/// One fetched page plus the total user count
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardPage {
    pub rows: Vec<DashboardRow>,
    pub total: u64,
}

/// Fetch one page of users ordered by name, then their sessions newest first
pub async fn fetch_dashboard_page(
    backend: &dyn QueryService,
    pager: Pager,
) -> BackendResult<DashboardPage> {
    let (from, to) = pager.range();
    let users_query = SelectQuery::table(USERS_TABLE)
        .range(from, to)
        .order("nama", true)
        .count_exact();
    let users_response = backend.select(&users_query).await?;
    let users: Vec<UserRow> = users_response.decode()?;
    let total = users_response.count.unwrap_or(users.len() as u64);

    if users.is_empty() {
        return Ok(DashboardPage {
            rows: Vec::new(),
            total,
        });
    }

    let sessions_query = SelectQuery::table(SESSIONS_TABLE)
        .in_list("user_id", users.iter().map(|u| u.id.as_str()))
        .order("login_time", false);
    let sessions: Vec<SessionRow> = backend.select(&sessions_query).await?.decode()?;

    // Sessions arrive newest first; keep the first seen per user
    let mut newest: HashMap<String, SessionRow> = HashMap::new();
    for session in sessions {
        if let Some(user_id) = session.user_id.clone() {
            newest.entry(user_id).or_insert(session);
        }
    }

    let rows = users
        .into_iter()
        .map(|user| {
            let session = newest.remove(&user.id);
            DashboardRow { user, session }
        })
        .collect();

    Ok(DashboardPage { rows, total })
}

/// Dashboard state: current page and the last fetch
pub struct DashboardScreen {
    backend: Arc<dyn QueryService>,
    pager: Pager,
    state: LoadState<Vec<DashboardRow>>,
}

impl DashboardScreen {
    pub fn new(backend: Arc<dyn QueryService>, page_size: u64) -> Self {
        Self {
            backend,
            pager: Pager::new(page_size),
            state: LoadState::Loading,
        }
    }

    /// Builder method: start on a page other than the first
    pub fn starting_at(mut self, page: u64) -> Self {
        self.pager.go_to(page);
        self
    }

    pub fn pager(&self) -> Pager {
        self.pager
    }

    pub fn state(&self) -> &LoadState<Vec<DashboardRow>> {
        &self.state
    }

    /// Fetch the current page
    pub async fn load(&mut self) {
        let result = fetch_dashboard_page(self.backend.as_ref(), self.pager).await;
        self.accept(result);
    }

    /// Fold a fetch result (from `load` or a poller) into the screen
    pub fn accept<E: std::fmt::Display>(&mut self, result: Result<DashboardPage, E>) {
        let result = result.map(|page| {
            self.pager.total = page.total;
            page.rows
        });
        self.state.apply(result, "dashboard");
    }

    pub async fn go_to(&mut self, page: u64) {
        self.pager.go_to(page);
        self.load().await;
    }

    pub async fn next_page(&mut self) {
        if self.pager.has_next() {
            self.pager.next();
            self.load().await;
        }
    }

    pub async fn prev_page(&mut self) {
        if self.pager.has_prev() {
            self.pager.prev();
            self.load().await;
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::from("User Dashboard\n\n");

        let rows = match &self.state {
            LoadState::Loading => {
                out.push_str("Loading...\n");
                return out;
            }
            LoadState::Failed(e) => {
                out.push_str(&format!("Loading... (last attempt failed: {})\n", e));
                return out;
            }
            LoadState::Ready(rows) => rows,
        };

        let mut table = Table::new([
            "NAMA",
            "NRP",
            "PASSWORD",
            "LOGIN TIME",
            "LOGOUT TIME",
            "STATUS",
        ]);
        for row in rows {
            let session = row.session.as_ref();
            table.push(vec![
                row.user.nama.clone(),
                row.user.nrp.to_string(),
                PASSWORD_MASK.to_string(),
                format_time(session.and_then(|s| s.login_time)),
                format_time(session.and_then(|s| s.logout_time)),
                row.status().to_string(),
            ]);
        }
        out.push_str(&table.render());

        out.push('\n');
        let prev = if self.pager.has_prev() { "[prev]" } else { " prev " };
        let next = if self.pager.has_next() { "[next]" } else { " next " };
        out.push_str(&format!("{}  {}  {}\n", prev, self.pager.footer(), next));
        out
    }
}
