// src/database.rs

use crate::error::Result;
use crate::models::JsonConcept;
use chrono::Utc;
use log::{debug, info};
use rusqlite::{params, Connection};

pub fn init_db(conn: &Connection, seed: bool) -> Result<()> {
    debug!("init_db: Checking database schema...");

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS concepts (
            id INTEGER PRIMARY KEY,
            name TEXT UNIQUE NOT NULL,
            category TEXT NOT NULL,
            description TEXT,
            mastery_level REAL NOT NULL DEFAULT 0.0
                CHECK (mastery_level >= 0.0 AND mastery_level <= 1.0),
            times_encountered INTEGER NOT NULL DEFAULT 0,
            times_succeeded INTEGER NOT NULL DEFAULT 0,
            times_failed INTEGER NOT NULL DEFAULT 0,
            needs_review INTEGER NOT NULL DEFAULT 0,
            next_review_date TEXT,
            last_used TEXT,
            related_concepts TEXT,
            prerequisites TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_concepts_category ON concepts(category);
        CREATE INDEX IF NOT EXISTS idx_concepts_mastery ON concepts(mastery_level);
        ",
    )?;

    let count: i64 = conn.query_row("SELECT count(*) FROM concepts", [], |row| row.get(0))?;
    if count == 0 && seed {
        info!("init_db: Table empty. Seeding sample concepts...");
        seed_data(conn)?;
    }

    Ok(())
}

fn seed_data(conn: &Connection) -> Result<()> {
    let data = include_str!("data/sample_concepts.json");
    let concepts: Vec<JsonConcept> = serde_json::from_str(data)?;
    let now = Utc::now();

    let mut stmt = conn.prepare(
        "INSERT OR IGNORE INTO concepts (name, category, description, mastery_level, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?)",
    )?;
    for c in &concepts {
        stmt.execute(params![c.name, c.category, c.description, c.mastery_level, now, now])?;
    }

    debug!("init_db: Seeded {} concepts", concepts.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeds_sample_concepts_once() {
        let conn = Connection::open_in_memory().unwrap();
        init_db(&conn, true).unwrap();
        init_db(&conn, true).unwrap();
        let count: i64 = conn
            .query_row("SELECT count(*) FROM concepts", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 10);
    }

    #[test]
    fn skip_seed_leaves_table_empty() {
        let conn = Connection::open_in_memory().unwrap();
        init_db(&conn, false).unwrap();
        let count: i64 = conn
            .query_row("SELECT count(*) FROM concepts", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
