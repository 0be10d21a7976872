// src/services/mod.rs

//! Business rules shared by the handlers: role-aware reads, the activation
//! rule, the snapshot-and-scoring workflow and the multi-step sequences.

pub mod attempts;
pub mod auth;
pub mod profiles;
pub mod questions;
pub mod quizzes;

#[cfg(test)]
pub(crate) mod test_support;

use crate::{config::Config, repositories::Repositories};

pub use attempts::AttemptService;
pub use auth::AuthService;
pub use profiles::ProfileService;
pub use questions::QuestionService;
pub use quizzes::QuizService;

#[derive(Clone)]
pub struct Services {
    pub auth: AuthService,
    pub profiles: ProfileService,
    pub quizzes: QuizService,
    pub questions: QuestionService,
    pub attempts: AttemptService,
}

impl Services {
    pub fn new(repos: &Repositories, config: &Config) -> Self {
        Self {
            auth: AuthService::new(repos, config),
            profiles: ProfileService::new(repos),
            quizzes: QuizService::new(repos, config),
            questions: QuestionService::new(repos),
            attempts: AttemptService::new(repos),
        }
    }
}
