// src/stats.rs

use crate::error::Result;
use crate::models::{Concept, MasteryTier};
use crate::repository;
use rusqlite::Connection;
use serde::Serialize;
use std::collections::HashMap;

/// Distribution buckets: (label, lower bound inclusive).
const DISTRIBUTION_BUCKETS: [(&str, f64); 5] = [
    ("0-20%", 0.0),
    ("20-40%", 0.2),
    ("40-60%", 0.4),
    ("60-80%", 0.6),
    ("80-100%", 0.8),
];

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CategoryBreakdown {
    pub category: String,
    pub count: usize,
    pub avg_mastery: f64,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct DistributionBucket {
    pub range: String,
    pub count: usize,
}

/// Dashboard aggregates across all concepts.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct MasteryStats {
    pub total_concepts: usize,
    pub mastered_count: usize,
    pub learning_count: usize,
    pub new_count: usize,
    pub average_mastery: f64,
    pub review_due_count: usize,
    pub category_breakdown: Vec<CategoryBreakdown>,
    pub mastery_distribution: Vec<DistributionBucket>,
}

impl MasteryStats {
    pub fn from_concepts(concepts: &[Concept]) -> Self {
        let total = concepts.len();
        let mut tiers: HashMap<MasteryTier, usize> = HashMap::new();
        let mut categories: HashMap<&str, (usize, f64)> = HashMap::new();
        let mut buckets = [0usize; DISTRIBUTION_BUCKETS.len()];
        let mut mastery_sum = 0.0;
        let mut review_due = 0;

        for c in concepts {
            let level = c.mastery.mastery_level;
            mastery_sum += level;
            *tiers.entry(MasteryTier::from_level(level)).or_default() += 1;
            if c.mastery.needs_review {
                review_due += 1;
            }

            let entry = categories.entry(c.category.as_str()).or_default();
            entry.0 += 1;
            entry.1 += level;

            let idx = DISTRIBUTION_BUCKETS
                .iter()
                .rposition(|(_, lower)| level >= *lower)
                .unwrap_or(0);
            buckets[idx] += 1;
        }

        let mut category_breakdown: Vec<CategoryBreakdown> = categories
            .into_iter()
            .map(|(category, (count, sum))| CategoryBreakdown {
                category: category.to_string(),
                count,
                avg_mastery: sum / count as f64,
            })
            .collect();
        category_breakdown.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then_with(|| a.category.cmp(&b.category))
        });

        let mastery_distribution = DISTRIBUTION_BUCKETS
            .iter()
            .zip(buckets)
            .map(|((range, _), count)| DistributionBucket {
                range: range.to_string(),
                count,
            })
            .collect();

        let tier = |t: MasteryTier| tiers.get(&t).copied().unwrap_or(0);
        MasteryStats {
            total_concepts: total,
            mastered_count: tier(MasteryTier::Mastered),
            learning_count: tier(MasteryTier::Learning),
            new_count: tier(MasteryTier::New),
            average_mastery: if total > 0 {
                mastery_sum / total as f64
            } else {
                0.0
            },
            review_due_count: review_due,
            category_breakdown,
            mastery_distribution,
        }
    }
}

pub fn mastery_stats(conn: &Connection) -> Result<MasteryStats> {
    let concepts = repository::all_concepts(conn)?;
    Ok(MasteryStats::from_concepts(&concepts))
}
