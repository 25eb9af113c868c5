pub mod content;
pub mod score;
pub mod strategy;
pub mod timing;

pub use content::{char_count, contains_emoji, contains_question, score_content_quality, EMOJI_SET};
pub use score::{
    compose, evaluate, score_data_confidence, ConfidenceTier, PerformanceScores, WEIGHT_CONFIDENCE,
    WEIGHT_CONTENT, WEIGHT_STRATEGY, WEIGHT_TIMING,
};
pub use strategy::score_hashtag_strategy;
pub use timing::{score_timing, TIMELY_KEYWORDS};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::LearningInsights;
    use crate::platform::Platform;
    use crate::proposer::{HashtagSuggestion, PopularityTier};
    use chrono::Weekday;

    fn no_learning() -> LearningInsights {
        LearningInsights {
            total_posts: 0,
            tracked_posts: 0,
            avg_engagement: 0.0,
            best_hashtag: None,
            optimal_length: None,
        }
    }

    #[test]
    fn test_cold_store_evaluation() {
        let tags: Vec<HashtagSuggestion> = ["launch", "product", "startup"]
            .iter()
            .enumerate()
            .map(|(i, t)| HashtagSuggestion {
                tag: t.to_string(),
                relevance: 85 - (i as i32 * 5),
                popularity: PopularityTier::Medium,
                reason: "Extracted from content keywords".to_string(),
            })
            .collect();

        let scores = evaluate(
            "Just launched our new product! Check it out 🚀",
            &tags,
            Platform::Twitter,
            &no_learning(),
            Weekday::Mon,
        );

        // Content: 50 + 5 (uppercase first char); strategy: 50 + 25 +
        // floor((80-50)/2); timing: 60 + 20 ("new"); confidence: 30.
        assert_eq!(scores.content_quality, 55);
        assert_eq!(scores.hashtag_strategy, 90);
        assert_eq!(scores.timing_relevance, 80);
        assert_eq!(scores.data_confidence, 30);
        assert_eq!(scores.engagement_potential, 70);
    }

    #[test]
    fn test_all_sub_scores_bounded() {
        let tags: Vec<HashtagSuggestion> = (0..3)
            .map(|_| HashtagSuggestion {
                tag: "max".to_string(),
                relevance: 100,
                popularity: PopularityTier::High,
                reason: format!("top {} 9.9% avg]", crate::proposer::DATA_PROVENANCE_MARKER),
            })
            .collect();

        let insights = LearningInsights {
            total_posts: 100,
            tracked_posts: 80,
            avg_engagement: 6.0,
            best_hashtag: None,
            optimal_length: Some(40),
        };

        let scores = evaluate(
            "Update today? New drop is trending now! 🔥",
            &tags,
            Platform::Twitter,
            &insights,
            Weekday::Wed,
        );

        for s in [
            scores.content_quality,
            scores.hashtag_strategy,
            scores.timing_relevance,
            scores.data_confidence,
            scores.engagement_potential,
        ] {
            assert!((0..=100).contains(&s), "score {s} out of range");
        }
    }
}
