// src/export.rs

use crate::error::Result;
use crate::models::Concept;
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use std::io::Write;

const CSV_HEADER: [&str; 15] = [
    "id",
    "name",
    "category",
    "description",
    "mastery_level",
    "times_encountered",
    "times_succeeded",
    "times_failed",
    "needs_review",
    "next_review_date",
    "last_used",
    "related_concepts",
    "prerequisites",
    "created_at",
    "updated_at",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Csv,
    Json,
}

pub fn export_concepts<W: Write>(concepts: &[Concept], format: ExportFormat, writer: W) -> Result<()> {
    match format {
        ExportFormat::Csv => write_csv(concepts, writer),
        ExportFormat::Json => {
            serde_json::to_writer_pretty(writer, concepts)?;
            Ok(())
        }
    }
}

fn write_csv<W: Write>(concepts: &[Concept], writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(CSV_HEADER)?;
    for c in concepts {
        let m = &c.mastery;
        wtr.write_record([
            c.id.to_string(),
            c.name.clone(),
            c.category.clone(),
            c.description.clone().unwrap_or_default(),
            m.mastery_level.to_string(),
            m.times_encountered.to_string(),
            m.times_succeeded.to_string(),
            m.times_failed.to_string(),
            m.needs_review.to_string(),
            optional_date(m.next_review_date),
            optional_date(m.last_used),
            join_ids(&c.related_concepts),
            join_ids(&c.prerequisites),
            c.created_at.to_rfc3339(),
            c.updated_at.to_rfc3339(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

fn optional_date(date: Option<DateTime<Utc>>) -> String {
    date.map(|d| d.to_rfc3339()).unwrap_or_default()
}

fn join_ids(ids: &[i64]) -> String {
    ids.iter().map(i64::to_string).collect::<Vec<_>>().join(";")
}
