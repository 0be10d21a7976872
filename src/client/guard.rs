// src/client/guard.rs

//! Page routing rules: who may open which screen.

use uuid::Uuid;

use crate::models::auth::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    Dashboard,
    Users,
    User(Uuid),
    Quizzes,
    Quiz(Uuid),
    TakeQuiz(Uuid),
    Questions,
    Results,
    Result(Uuid),
}

impl Route {
    /// Unknown paths yield `None`.
    pub fn parse(path: &str) -> Option<Route> {
        let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
        let id = |raw: &str| Uuid::parse_str(raw).ok();

        match segments.as_slice() {
            ["login"] => Some(Route::Login),
            ["dashboard"] | [""] => Some(Route::Dashboard),
            ["users"] => Some(Route::Users),
            ["users", raw] => id(raw).map(Route::User),
            ["quizzes"] => Some(Route::Quizzes),
            ["quizzes", raw] => id(raw).map(Route::Quiz),
            ["quizzes", raw, "attempt"] => id(raw).map(Route::TakeQuiz),
            ["questions"] => Some(Route::Questions),
            ["results"] => Some(Route::Results),
            ["results", raw] => id(raw).map(Route::Result),
            _ => None,
        }
    }

    pub fn path(&self) -> String {
        match self {
            Route::Login => "/login".to_string(),
            Route::Dashboard => "/dashboard".to_string(),
            Route::Users => "/users".to_string(),
            Route::User(id) => format!("/users/{id}"),
            Route::Quizzes => "/quizzes".to_string(),
            Route::Quiz(id) => format!("/quizzes/{id}"),
            Route::TakeQuiz(id) => format!("/quizzes/{id}/attempt"),
            Route::Questions => "/questions".to_string(),
            Route::Results => "/results".to_string(),
            Route::Result(id) => format!("/results/{id}"),
        }
    }

    fn admin_only(&self) -> bool {
        matches!(self, Route::Users | Route::User(_) | Route::Questions)
    }
}

/// Who is looking, as far as routing cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Viewer {
    /// Session or profile still loading.
    Loading,
    Anonymous,
    SignedIn(Role),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Render(Route),
    Redirect(Route),
    /// Show a spinner until the session settles.
    Wait,
}

pub fn resolve(path: &str, viewer: Viewer) -> Navigation {
    let route = Route::parse(path);

    match (viewer, route) {
        (Viewer::Loading, _) => Navigation::Wait,
        (Viewer::Anonymous, Some(Route::Login)) => Navigation::Render(Route::Login),
        (Viewer::Anonymous, _) => Navigation::Redirect(Route::Login),
        (Viewer::SignedIn(_), Some(Route::Login) | None) => Navigation::Redirect(Route::Dashboard),
        (Viewer::SignedIn(role), Some(route)) if route.admin_only() && !role.is_admin() => {
            Navigation::Redirect(Route::Dashboard)
        }
        (Viewer::SignedIn(_), Some(route)) => Navigation::Render(route),
    }
}
