// src/routes.rs

use crate::session::SessionStore;

/// Every screen of the portal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    Login,
    Register,
    VerifyEmail,
    ForgotPassword,
    Problems,
    Dashboard,
    Contests,
    TakeContest(String),
    ContestResults(String),
    Projects,
    Admin(AdminPage),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminPage {
    Overview,
    Announcements,
    Events,
    Badges,
    Contests,
    Students,
    Projects,
    Logs,
}

/// Who may see a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    /// Only when signed out (login, register, ...).
    GuestOnly,
    Authenticated,
    Admin,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Render,
    Redirect(Route),
}

impl Route {
    pub fn access(&self) -> Access {
        match self {
            Route::Home | Route::Problems => Access::Public,
            Route::Login | Route::Register | Route::VerifyEmail | Route::ForgotPassword => {
                Access::GuestOnly
            }
            Route::Dashboard
            | Route::Contests
            | Route::TakeContest(_)
            | Route::ContestResults(_)
            | Route::Projects => Access::Authenticated,
            Route::Admin(_) => Access::Admin,
        }
    }

    pub fn path(&self) -> String {
        match self {
            Route::Home => "/".to_string(),
            Route::Login => "/login".to_string(),
            Route::Register => "/register".to_string(),
            Route::VerifyEmail => "/verify-email".to_string(),
            Route::ForgotPassword => "/forgot-password".to_string(),
            Route::Problems => "/problems".to_string(),
            Route::Dashboard => "/dashboard".to_string(),
            Route::Contests => "/contests".to_string(),
            Route::TakeContest(id) => format!("/contests/{id}"),
            Route::ContestResults(id) => format!("/contests/{id}/results"),
            Route::Projects => "/projects".to_string(),
            Route::Admin(page) => match page {
                AdminPage::Overview => "/admin".to_string(),
                AdminPage::Announcements => "/admin/announcements".to_string(),
                AdminPage::Events => "/admin/events".to_string(),
                AdminPage::Badges => "/admin/badges".to_string(),
                AdminPage::Contests => "/admin/contests".to_string(),
                AdminPage::Students => "/admin/students".to_string(),
                AdminPage::Projects => "/admin/projects".to_string(),
                AdminPage::Logs => "/admin/logs".to_string(),
            },
        }
    }
}

/// Where a signed-in user lands after login.
pub fn home_for(session: &SessionStore) -> Route {
    if session.is_admin() {
        Route::Admin(AdminPage::Overview)
    } else {
        Route::Dashboard
    }
}

/// Route guard. Reads the session synchronously.
///
/// * Signed-out users asking for a protected route go to the login page.
/// * Students asking for an admin page go to their dashboard.
/// * Signed-in users asking for a guest page go to their home.
pub fn guard(route: &Route, session: &SessionStore) -> Decision {
    match route.access() {
        Access::Public => Decision::Render,
        Access::GuestOnly if session.is_authenticated() => Decision::Redirect(home_for(session)),
        Access::GuestOnly => Decision::Render,
        Access::Authenticated | Access::Admin if !session.is_authenticated() => {
            Decision::Redirect(Route::Login)
        }
        Access::Admin if !session.is_admin() => Decision::Redirect(Route::Dashboard),
        Access::Authenticated | Access::Admin => Decision::Render,
    }
}
