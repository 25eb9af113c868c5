use crate::db::LearningInsights;
use crate::platform::Platform;
use crate::proposer::HashtagSuggestion;
use crate::scoring::{score_content_quality, score_hashtag_strategy, score_timing};
use chrono::Weekday;
use strum::Display;

pub const WEIGHT_CONTENT: f64 = 0.35;
pub const WEIGHT_STRATEGY: f64 = 0.35;
pub const WEIGHT_TIMING: f64 = 0.20;
pub const WEIGHT_CONFIDENCE: f64 = 0.10;

/// The four sub-scores and their weighted composite, all 0-100 integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PerformanceScores {
    pub content_quality: i32,
    pub hashtag_strategy: i32,
    pub timing_relevance: i32,
    pub data_confidence: i32,
    pub engagement_potential: i32,
}

/// How much the learned statistics can be trusted, bucketed by the number of
/// outcome-backed posts behind them.
#[derive(Debug, Clone, Copy, PartialEq, Display)]
pub enum ConfidenceTier {
    #[strum(serialize = "Building")]
    Building,
    #[strum(serialize = "Growing")]
    Growing,
    #[strum(serialize = "High")]
    High,
}

impl ConfidenceTier {
    pub const HIGH_THRESHOLD: i32 = 75;
    pub const GROWING_THRESHOLD: i32 = 50;

    pub fn from_score(score: i32) -> Self {
        if score >= Self::HIGH_THRESHOLD {
            ConfidenceTier::High
        } else if score >= Self::GROWING_THRESHOLD {
            ConfidenceTier::Growing
        } else {
            ConfidenceTier::Building
        }
    }
}

pub fn score_data_confidence(tracked_posts: i64) -> i32 {
    if tracked_posts == 0 {
        30
    } else if tracked_posts < 10 {
        50
    } else if tracked_posts < 50 {
        75
    } else {
        95
    }
}

/// Weighted composite. Rounds half away from zero (`f64::round`), so a raw
/// 67.5 becomes 68.
pub fn compose(
    content_quality: i32,
    hashtag_strategy: i32,
    timing_relevance: i32,
    data_confidence: i32,
) -> PerformanceScores {
    let weighted = content_quality as f64 * WEIGHT_CONTENT
        + hashtag_strategy as f64 * WEIGHT_STRATEGY
        + timing_relevance as f64 * WEIGHT_TIMING
        + data_confidence as f64 * WEIGHT_CONFIDENCE;

    PerformanceScores {
        content_quality,
        hashtag_strategy,
        timing_relevance,
        data_confidence,
        engagement_potential: weighted.round() as i32,
    }
}

/// Full evaluation of a drafted post against what the store has learned.
pub fn evaluate(
    text: &str,
    suggestions: &[HashtagSuggestion],
    platform: Platform,
    insights: &LearningInsights,
    weekday: Weekday,
) -> PerformanceScores {
    compose(
        score_content_quality(text, platform, insights.optimal_length),
        score_hashtag_strategy(suggestions, platform),
        score_timing(text, weekday),
        score_data_confidence(insights.tracked_posts),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_buckets() {
        assert_eq!(score_data_confidence(0), 30);
        assert_eq!(score_data_confidence(1), 50);
        assert_eq!(score_data_confidence(9), 50);
        assert_eq!(score_data_confidence(10), 75);
        assert_eq!(score_data_confidence(49), 75);
        assert_eq!(score_data_confidence(50), 95);
        assert_eq!(score_data_confidence(500), 95);
    }

    #[test]
    fn test_confidence_tiers() {
        assert_eq!(ConfidenceTier::from_score(95), ConfidenceTier::High);
        assert_eq!(ConfidenceTier::from_score(75), ConfidenceTier::High);
        assert_eq!(ConfidenceTier::from_score(50), ConfidenceTier::Growing);
        assert_eq!(ConfidenceTier::from_score(30), ConfidenceTier::Building);
    }

    #[test]
    fn test_composite_weighting() {
        let scores = compose(65, 95, 80, 30);
        // 22.75 + 33.25 + 16.0 + 3.0 = 75.0
        assert_eq!(scores.engagement_potential, 75);
    }

    #[test]
    fn test_composite_rounds_half_away_from_zero() {
        // 22.75 + 29.75 + 12.0 + 3.0 = 67.5 -> 68
        let scores = compose(65, 85, 60, 30);
        assert_eq!(scores.engagement_potential, 68);
    }

    #[test]
    fn test_evaluate_uses_learned_optimum() {
        let insights = LearningInsights {
            total_posts: 20,
            tracked_posts: 12,
            avg_engagement: 4.0,
            best_hashtag: None,
            optimal_length: Some(20),
        };
        let text = "Exactly twenty chars";
        let scores = evaluate(text, &[], crate::platform::Platform::Twitter, &insights, Weekday::Mon);

        // Content: 50 + 25 (deviation 0) + 5 (uppercase) = 80; strategy 0;
        // timing 60; confidence 75.
        assert_eq!(scores.content_quality, 80);
        assert_eq!(scores.hashtag_strategy, 0);
        assert_eq!(scores.timing_relevance, 60);
        assert_eq!(scores.data_confidence, 75);
        assert_eq!(scores.engagement_potential, 48);
    }
}
