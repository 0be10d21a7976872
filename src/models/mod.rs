// src/models/mod.rs

pub mod answer;
pub mod auth;
pub mod profile;
pub mod question;
pub mod quiz;
pub mod quiz_attempt;
pub mod validation;
