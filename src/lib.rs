// src/lib.rs

pub mod app_dirs;
pub mod config;
pub mod constants;
pub mod database;
pub mod error;
pub mod export;
pub mod mastery;
pub mod models;
pub mod practice;
pub mod repository;
pub mod stats;

pub use error::{Error, Result};
pub use mastery::{apply_practice_outcome, review_interval_days};
pub use models::{Concept, ConceptMasteryRecord, MasteryTier, UpdateRule};
