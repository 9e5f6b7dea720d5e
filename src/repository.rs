// src/repository.rs

use crate::error::{Error, Result};
use crate::models::{
    Concept, ConceptFilter, ConceptMasteryRecord, ConceptPage, ConceptPatch, NewConcept,
    Pagination,
};
use chrono::{DateTime, Utc};
use log::debug;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, ToSql};

const CONCEPT_COLUMNS: &str = "id, name, category, description, mastery_level, \
     times_encountered, times_succeeded, times_failed, needs_review, next_review_date, \
     last_used, related_concepts, prerequisites, created_at, updated_at";

fn concept_from_row(row: &Row) -> rusqlite::Result<Concept> {
    Ok(Concept {
        id: row.get(0)?,
        name: row.get(1)?,
        category: row.get(2)?,
        description: row.get(3)?,
        mastery: ConceptMasteryRecord {
            mastery_level: row.get(4)?,
            times_encountered: row.get(5)?,
            times_succeeded: row.get(6)?,
            times_failed: row.get(7)?,
            needs_review: row.get(8)?,
            next_review_date: row.get(9)?,
            last_used: row.get(10)?,
        },
        related_concepts: id_list_from_column(row, 11)?,
        prerequisites: id_list_from_column(row, 12)?,
        created_at: row.get(13)?,
        updated_at: row.get(14)?,
    })
}

/// Id lists are stored as JSON text; NULL reads as empty.
fn id_list_from_column(row: &Row, idx: usize) -> rusqlite::Result<Vec<i64>> {
    let raw: Option<String> = row.get(idx)?;
    match raw {
        None => Ok(Vec::new()),
        Some(text) => serde_json::from_str(&text)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))),
    }
}

fn id_list_to_column(ids: &[i64]) -> Result<Option<String>> {
    if ids.is_empty() {
        return Ok(None);
    }
    Ok(Some(serde_json::to_string(ids)?))
}

// --- CRUD ---

/// Registers a new concept and returns it as stored.
pub fn create_concept(conn: &Connection, new: &NewConcept, now: DateTime<Utc>) -> Result<Concept> {
    new.validate()?;
    conn.execute(
        "INSERT INTO concepts (name, category, description, mastery_level, related_concepts, prerequisites, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        params![
            new.name,
            new.category,
            new.description,
            new.mastery_level,
            id_list_to_column(&new.related_concepts)?,
            id_list_to_column(&new.prerequisites)?,
            now,
            now
        ],
    )
    .map_err(|e| Error::from_write(e, &new.name))?;

    let id = conn.last_insert_rowid();
    debug!("[DB] Created concept {} (ID: {})", new.name, id);
    get_concept(conn, id)?.ok_or(Error::NotFound(id))
}

pub fn get_concept(conn: &Connection, id: i64) -> Result<Option<Concept>> {
    let sql = format!("SELECT {} FROM concepts WHERE id = ?", CONCEPT_COLUMNS);
    let concept = conn.query_row(&sql, [id], concept_from_row).optional()?;
    Ok(concept)
}

/// Paged listing, lowest mastery first.
pub fn list_concepts(conn: &Connection, filter: &ConceptFilter) -> Result<ConceptPage> {
    let page = filter.page.max(1);
    let limit = filter.limit.max(1);

    let mut clauses: Vec<&str> = Vec::new();
    let mut params: Vec<Box<dyn ToSql>> = Vec::new();
    if let Some(category) = &filter.category {
        clauses.push("category = ?");
        params.push(Box::new(category.clone()));
    }
    if filter.needs_review_only {
        clauses.push("needs_review = 1");
    }
    let where_sql = if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    };

    let total: u64 = conn.query_row(
        &format!("SELECT count(*) FROM concepts {}", where_sql),
        rusqlite::params_from_iter(params.iter()),
        |row| row.get::<_, i64>(0),
    )? as u64;

    let sql = format!(
        "SELECT {} FROM concepts {} ORDER BY mastery_level ASC, id ASC LIMIT ? OFFSET ?",
        CONCEPT_COLUMNS, where_sql
    );
    params.push(Box::new(i64::from(limit)));
    params.push(Box::new(i64::from(page - 1) * i64::from(limit)));

    let mut stmt = conn.prepare(&sql)?;
    let concepts = stmt
        .query_map(rusqlite::params_from_iter(params.iter()), concept_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(ConceptPage {
        concepts,
        pagination: Pagination {
            page,
            limit,
            total,
            total_pages: total.div_ceil(u64::from(limit)),
        },
    })
}

pub fn all_concepts(conn: &Connection) -> Result<Vec<Concept>> {
    let sql = format!("SELECT {} FROM concepts ORDER BY id ASC", CONCEPT_COLUMNS);
    let mut stmt = conn.prepare(&sql)?;
    let concepts = stmt
        .query_map([], concept_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(concepts)
}

pub fn update_concept(
    conn: &Connection,
    id: i64,
    patch: &ConceptPatch,
    now: DateTime<Utc>,
) -> Result<Concept> {
    patch.validate()?;
    let mut concept = get_concept(conn, id)?.ok_or(Error::NotFound(id))?;
    patch.apply(&mut concept, now);
    concept.mastery.check_counters()?;

    conn.execute(
        "UPDATE concepts SET name = ?, category = ?, description = ?, related_concepts = ?, prerequisites = ?
         WHERE id = ?",
        params![
            concept.name,
            concept.category,
            concept.description,
            id_list_to_column(&concept.related_concepts)?,
            id_list_to_column(&concept.prerequisites)?,
            id
        ],
    )
    .map_err(|e| Error::from_write(e, &concept.name))?;
    save_mastery_record(conn, id, &concept.mastery, now)?;

    Ok(concept)
}

pub fn delete_concept(conn: &Connection, id: i64) -> Result<()> {
    let deleted = conn.execute("DELETE FROM concepts WHERE id = ?", [id])?;
    if deleted == 0 {
        return Err(Error::NotFound(id));
    }
    debug!("[DB] Deleted concept {}", id);
    Ok(())
}

// --- Mastery State ---

/// Fetches the mastery slice of a concept.
pub fn load_mastery_record(conn: &Connection, id: i64) -> Result<Option<ConceptMasteryRecord>> {
    let record = conn
        .query_row(
            "SELECT mastery_level, times_encountered, times_succeeded, times_failed, needs_review, next_review_date, last_used
             FROM concepts WHERE id = ?",
            [id],
            |row| {
                Ok(ConceptMasteryRecord {
                    mastery_level: row.get(0)?,
                    times_encountered: row.get(1)?,
                    times_succeeded: row.get(2)?,
                    times_failed: row.get(3)?,
                    needs_review: row.get(4)?,
                    next_review_date: row.get(5)?,
                    last_used: row.get(6)?,
                })
            },
        )
        .optional()?;
    Ok(record)
}

/// Saves the mastery slice of a concept.
pub fn save_mastery_record(
    conn: &Connection,
    id: i64,
    record: &ConceptMasteryRecord,
    now: DateTime<Utc>,
) -> Result<()> {
    let updated = conn.execute(
        "UPDATE concepts SET mastery_level = ?, times_encountered = ?, times_succeeded = ?, times_failed = ?,
            needs_review = ?, next_review_date = ?, last_used = ?, updated_at = ?
         WHERE id = ?",
        params![
            record.mastery_level,
            record.times_encountered,
            record.times_succeeded,
            record.times_failed,
            record.needs_review,
            record.next_review_date,
            record.last_used,
            now,
            id
        ],
    )?;
    if updated == 0 {
        return Err(Error::NotFound(id));
    }
    Ok(())
}

// --- Queries for Review ---

/// Concepts flagged for review or whose review date has passed.
pub fn find_due_for_review(conn: &Connection, now: DateTime<Utc>) -> Result<Vec<Concept>> {
    let sql = format!(
        "SELECT {} FROM concepts
         WHERE needs_review = 1
            OR (next_review_date IS NOT NULL AND next_review_date <= ?)
         ORDER BY mastery_level ASC, id ASC",
        CONCEPT_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let concepts = stmt
        .query_map([now], concept_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    debug!("[DB] Found {} concepts due for review", concepts.len());
    Ok(concepts)
}

pub fn find_weak_concepts(conn: &Connection, threshold: f64) -> Result<Vec<Concept>> {
    let sql = format!(
        "SELECT {} FROM concepts WHERE mastery_level < ? ORDER BY mastery_level ASC, id ASC",
        CONCEPT_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let concepts = stmt
        .query_map([threshold], concept_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(concepts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::init_db;
    use chrono::{Duration, TimeZone};

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_db(&conn, false).unwrap();
        conn
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn add(conn: &Connection, name: &str, category: &str, level: f64) -> Concept {
        let mut c = NewConcept::new(name, category);
        c.mastery_level = level;
        create_concept(conn, &c, now()).unwrap()
    }

    #[test]
    fn create_and_fetch() {
        let conn = setup();
        let mut new = NewConcept::new("Closures", "Functional");
        new.description = Some("Functions capturing their environment".into());
        new.prerequisites = vec![7, 9];
        let created = create_concept(&conn, &new, now()).unwrap();

        let fetched = get_concept(&conn, created.id).unwrap().unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.prerequisites, vec![7, 9]);
        assert!(fetched.related_concepts.is_empty());
        assert_eq!(fetched.mastery.times_encountered, 0);
        assert_eq!(fetched.created_at, now());
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let conn = setup();
        add(&conn, "Loops", "Control Flow", 0.2);
        let err = create_concept(&conn, &NewConcept::new("Loops", "Other"), now()).unwrap_err();
        assert!(matches!(err, Error::Duplicate(name) if name == "Loops"));
    }

    #[test]
    fn list_filters_orders_and_pages() {
        let conn = setup();
        add(&conn, "A", "x", 0.9);
        add(&conn, "B", "x", 0.1);
        add(&conn, "C", "y", 0.5);
        add(&conn, "D", "x", 0.4);

        let filter = ConceptFilter {
            category: Some("x".into()),
            page: 1,
            limit: 2,
            ..ConceptFilter::default()
        };
        let page = list_concepts(&conn, &filter).unwrap();
        let names: Vec<_> = page.concepts.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["B", "D"]);
        assert_eq!(page.pagination.total, 3);
        assert_eq!(page.pagination.total_pages, 2);

        let page2 = list_concepts(&conn, &ConceptFilter { page: 2, ..filter }).unwrap();
        assert_eq!(page2.concepts.len(), 1);
        assert_eq!(page2.concepts[0].name, "A");
    }

    #[test]
    fn update_patches_fields_and_stamps_last_used() {
        let conn = setup();
        let c = add(&conn, "Loops", "Control Flow", 0.2);
        let later = now() + Duration::hours(3);
        let patch = ConceptPatch {
            description: Some("while and for".into()),
            mastery_level: Some(0.6),
            related_concepts: Some(vec![1]),
            ..ConceptPatch::default()
        };
        let updated = update_concept(&conn, c.id, &patch, later).unwrap();
        assert_eq!(updated.mastery.mastery_level, 0.6);
        assert_eq!(updated.mastery.last_used, Some(later));

        let stored = get_concept(&conn, c.id).unwrap().unwrap();
        assert_eq!(stored.description.as_deref(), Some("while and for"));
        assert_eq!(stored.related_concepts, vec![1]);
        assert_eq!(stored.updated_at, later);
    }

    #[test]
    fn update_rejects_counters_that_do_not_add_up() {
        let conn = setup();
        let c = add(&conn, "Loops", "Control Flow", 0.2);
        let patch = ConceptPatch {
            times_succeeded: Some(5),
            ..ConceptPatch::default()
        };
        let err = update_concept(&conn, c.id, &patch, now()).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));

        let stored = load_mastery_record(&conn, c.id).unwrap().unwrap();
        assert_eq!(stored.times_encountered, 0);
        assert_eq!(stored.times_succeeded, 0);

        // All three together keep the record consistent, and the ratio rule stays in range.
        let patch = ConceptPatch {
            times_encountered: Some(6),
            times_succeeded: Some(5),
            times_failed: Some(1),
            ..ConceptPatch::default()
        };
        update_concept(&conn, c.id, &patch, now()).unwrap();
        let concept = crate::practice::apply_outcome(
            &conn,
            c.id,
            true,
            crate::models::UpdateRule::SuccessRatio,
            now(),
        )
        .unwrap();
        assert_eq!(concept.mastery.mastery_level, 6.0 / 7.0);
    }

    #[test]
    fn update_and_delete_missing_concept() {
        let conn = setup();
        let err = update_concept(&conn, 42, &ConceptPatch::default(), now()).unwrap_err();
        assert!(matches!(err, Error::NotFound(42)));
        assert!(matches!(delete_concept(&conn, 42), Err(Error::NotFound(42))));
    }

    #[test]
    fn due_for_review_uses_flag_and_date() {
        let conn = setup();
        let flagged = add(&conn, "Flagged", "x", 0.6);
        let overdue = add(&conn, "Overdue", "x", 0.3);
        let future = add(&conn, "Future", "x", 0.1);
        add(&conn, "Untouched", "x", 0.0);

        let mut rec = load_mastery_record(&conn, flagged.id).unwrap().unwrap();
        rec.needs_review = true;
        save_mastery_record(&conn, flagged.id, &rec, now()).unwrap();

        let mut rec = load_mastery_record(&conn, overdue.id).unwrap().unwrap();
        rec.next_review_date = Some(now() - Duration::days(1));
        save_mastery_record(&conn, overdue.id, &rec, now()).unwrap();

        let mut rec = load_mastery_record(&conn, future.id).unwrap().unwrap();
        rec.next_review_date = Some(now() + Duration::days(1));
        save_mastery_record(&conn, future.id, &rec, now()).unwrap();

        let due = find_due_for_review(&conn, now()).unwrap();
        let names: Vec<_> = due.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Overdue", "Flagged"]);
    }

    #[test]
    fn weak_concepts_below_threshold() {
        let conn = setup();
        add(&conn, "Strong", "x", 0.9);
        add(&conn, "Weak", "x", 0.2);
        add(&conn, "Edge", "x", 0.5);
        let weak = find_weak_concepts(&conn, 0.5).unwrap();
        assert_eq!(weak.len(), 1);
        assert_eq!(weak[0].name, "Weak");
    }
}
