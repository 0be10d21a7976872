// src/handlers/mod.rs

pub mod attempts;
pub mod auth;
pub mod profiles;
pub mod questions;
pub mod quizzes;
pub mod realtime;

use serde::Deserialize;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// `?ids=a,b,c` on list endpoints: fetch a known set of rows by id.
#[derive(Debug, Default, Deserialize)]
pub struct IdsQuery {
    pub ids: Option<String>,
}

impl IdsQuery {
    pub fn parse(&self) -> AppResult<Option<Vec<Uuid>>> {
        let Some(raw) = &self.ids else {
            return Ok(None);
        };
        raw.split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(|id| {
                Uuid::parse_str(id).map_err(|_| AppError::BadRequest(format!("Invalid id: {id}")))
            })
            .collect::<AppResult<Vec<_>>>()
            .map(Some)
    }
}
