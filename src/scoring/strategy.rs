use crate::platform::Platform;
use crate::proposer::{HashtagSuggestion, DATA_PROVENANCE_MARKER};

const BASE_SCORE: i32 = 50;
const IDEAL_BAND_BONUS: i32 = 25;
const ACCEPTABLE_BAND_BONUS: i32 = 15;
const OFF_BAND_PENALTY: i32 = 15;
const DATA_BACKED_STEP: i32 = 5;
const DATA_BACKED_CAP: i32 = 15;

/// Hashtag strategy score: count band, mean relevance, and how many tags are
/// backed by tracked aggregate data. An empty proposal scores zero outright.
pub fn score_hashtag_strategy(suggestions: &[HashtagSuggestion], platform: Platform) -> i32 {
    if suggestions.is_empty() {
        return 0;
    }

    let mut score = BASE_SCORE;
    let count = suggestions.len();

    match platform {
        Platform::Twitter => {
            if (1..=3).contains(&count) {
                score += IDEAL_BAND_BONUS;
            } else {
                score -= OFF_BAND_PENALTY;
            }
        }
        Platform::Instagram => {
            if (8..=15).contains(&count) {
                score += IDEAL_BAND_BONUS;
            } else if (5..8).contains(&count) {
                score += ACCEPTABLE_BAND_BONUS;
            }
        }
    }

    let mean_relevance =
        suggestions.iter().map(|s| s.relevance as f64).sum::<f64>() / count as f64;
    score += ((mean_relevance - 50.0) / 2.0).floor() as i32;

    let data_backed = suggestions
        .iter()
        .filter(|s| s.reason.contains(DATA_PROVENANCE_MARKER))
        .count() as i32;
    score += (data_backed * DATA_BACKED_STEP).min(DATA_BACKED_CAP);

    score.clamp(0, 100)
}
