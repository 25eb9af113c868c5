use chrono::Weekday;

/// Words that read as time-sensitive, matched case-insensitively anywhere in
/// the text.
pub const TIMELY_KEYWORDS: &[&str] = &["new", "now", "today", "breaking", "update", "trending"];

const BASE_SCORE: i32 = 60;
const TIMELY_BONUS: i32 = 20;
const MIDWEEK_BONUS: i32 = 10;

/// Timing relevance. The weekday is passed in so callers decide what "now"
/// means; midweek posting earns a small bonus.
pub fn score_timing(text: &str, weekday: Weekday) -> i32 {
    let mut score = BASE_SCORE;

    let lower = text.to_lowercase();
    if TIMELY_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
        score += TIMELY_BONUS;
    }

    if matches!(weekday, Weekday::Tue | Weekday::Wed | Weekday::Thu) {
        score += MIDWEEK_BONUS;
    }

    score.min(100)
}
