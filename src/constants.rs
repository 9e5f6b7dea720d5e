// src/constants.rs

// --- Time Constants ---
pub const DAY_SECONDS: i64 = 86400;

// --- Mastery Bounds ---
pub const MASTERY_MIN: f64 = 0.0;
pub const MASTERY_MAX: f64 = 1.0;
pub const MASTERY_DEFAULT: f64 = 0.0;

// --- Rule A (EMA-style) Parameters ---
pub const EMA_SUCCESS_GAIN: f64 = 0.1; // Fraction of the remaining gap to 1.0
pub const EMA_FAILURE_DECAY: f64 = 0.9; // Multiplier on failure

// Review tiers (Days)
pub const EMA_TIER_HIGH_THRESHOLD: f64 = 0.8;
pub const EMA_TIER_MID_THRESHOLD: f64 = 0.5;
pub const EMA_INTERVAL_HIGH: i64 = 30;
pub const EMA_INTERVAL_MID: i64 = 7;
pub const EMA_INTERVAL_LOW: i64 = 1;

// --- Rule B (Success Ratio) Parameters ---
pub const RATIO_REVIEW_THRESHOLD: f64 = 0.7;
pub const RATIO_INTERVAL_SCALE: f64 = 14.0; // Days at full mastery
pub const RATIO_INTERVAL_MIN: i64 = 1;

// --- Mastery Tiers (dashboard buckets) ---
pub const TIER_MASTERED_THRESHOLD: f64 = 0.8;
pub const TIER_LEARNING_THRESHOLD: f64 = 0.3;
pub const WEAK_THRESHOLD_DEFAULT: f64 = 0.5;

// --- Listing ---
pub const PAGE_DEFAULT: u32 = 1;
pub const PAGE_SIZE_DEFAULT: u32 = 50;
