// src/practice.rs

use crate::error::{Error, Result};
use crate::mastery;
use crate::models::{Concept, UpdateRule};
use crate::repository;
use chrono::{DateTime, Utc};
use log::{debug, info};
use rusqlite::Connection;

// --- Public Interface ---

/// Single practice attempt, scored with the EMA rule.
pub fn record_practice(conn: &Connection, id: i64, success: bool) -> Result<Concept> {
    apply_outcome(conn, id, success, UpdateRule::Ema, Utc::now())
}

/// Batch mastery update, scored with the success-ratio rule.
pub fn update_concept_mastery(conn: &Connection, id: i64, was_successful: bool) -> Result<Concept> {
    apply_outcome(conn, id, was_successful, UpdateRule::SuccessRatio, Utc::now())
}

/// Load, score and save one outcome as a single transaction.
pub fn apply_outcome(
    conn: &Connection,
    id: i64,
    success: bool,
    rule: UpdateRule,
    now: DateTime<Utc>,
) -> Result<Concept> {
    info!("Processing practice outcome for Concept ID: {}", id);
    let tx = conn.unchecked_transaction()?;

    let current = repository::load_mastery_record(&tx, id)?.ok_or(Error::NotFound(id))?;
    let next = mastery::apply_practice_outcome(&current, success, rule, now);
    repository::save_mastery_record(&tx, id, &next, now)?;

    let concept = repository::get_concept(&tx, id)?.ok_or(Error::NotFound(id))?;
    tx.commit()?;

    info!(
        "[Mastery Result] Concept {}: {:.3} -> {:.3} (Rule: {}, Attempts: {}, Review: {:?})",
        id,
        current.mastery_level,
        next.mastery_level,
        rule,
        next.times_encountered,
        next.next_review_date.map(|d| d.to_rfc3339())
    );
    Ok(concept)
}

/// Flags a concept for review immediately.
pub fn mark_for_review(conn: &Connection, id: i64) -> Result<Concept> {
    mark_for_review_at(conn, id, Utc::now())
}

pub fn mark_for_review_at(conn: &Connection, id: i64, now: DateTime<Utc>) -> Result<Concept> {
    let tx = conn.unchecked_transaction()?;
    let mut record = repository::load_mastery_record(&tx, id)?.ok_or(Error::NotFound(id))?;
    record.needs_review = true;
    record.next_review_date = Some(now);
    repository::save_mastery_record(&tx, id, &record, now)?;
    let concept = repository::get_concept(&tx, id)?.ok_or(Error::NotFound(id))?;
    tx.commit()?;

    debug!("Concept {} marked for review", id);
    Ok(concept)
}

/// Review queue: flagged or overdue concepts, weakest first.
pub fn concepts_needing_review(conn: &Connection) -> Result<Vec<Concept>> {
    repository::find_due_for_review(conn, Utc::now())
}
