use crate::db::LearningInsights;
use crate::platform::Platform;
use crate::scoring::{char_count, ConfidenceTier, PerformanceScores};

const LENGTH_DEVIATION_NOTE_THRESHOLD: i32 = 100;

/// Turns scores and learned aggregates into operator-facing recommendations.
/// Rules run top to bottom and fire independently; output order is part of
/// the contract.
pub fn generate_insights(
    text: &str,
    platform: Platform,
    scores: &PerformanceScores,
    learning: &LearningInsights,
) -> Vec<String> {
    let mut result = Vec::new();

    match ConfidenceTier::from_score(scores.data_confidence) {
        ConfidenceTier::High => result.push(format!(
            "High Confidence: Based on {} tracked posts",
            learning.tracked_posts
        )),
        ConfidenceTier::Growing => result.push(format!(
            "Growing Dataset: Learning from {} posts",
            learning.tracked_posts
        )),
        ConfidenceTier::Building => {
            result.push("Building Knowledge: Track posts to unlock insights!".to_string())
        }
    }

    if let Some(optimal) = learning.optimal_length {
        let deviation = (char_count(text) as i32 - optimal).abs();
        if deviation > LENGTH_DEVIATION_NOTE_THRESHOLD {
            result.push(format!(
                "Data shows ~{optimal} chars perform best on {platform}"
            ));
        }
    }

    if let Some(best) = &learning.best_hashtag {
        result.push(format!(
            "Top performer: #{} ({:.1}% avg)",
            best.tag, best.avg_engagement
        ));
    }

    if scores.engagement_potential >= 80 {
        result.push("Excellent! Optimized for high engagement".to_string());
    } else if scores.engagement_potential >= 65 {
        result.push("Good post! Minor tweaks could help".to_string());
    } else {
        result.push("Needs optimization for better engagement".to_string());
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::BestHashtag;
    use crate::scoring::compose;

    fn learning(
        tracked: i64,
        best: Option<BestHashtag>,
        optimal: Option<i32>,
    ) -> LearningInsights {
        LearningInsights {
            total_posts: tracked * 2,
            tracked_posts: tracked,
            avg_engagement: 3.0,
            best_hashtag: best,
            optimal_length: optimal,
        }
    }

    #[test]
    fn test_cold_store_messages() {
        let scores = compose(50, 50, 60, 30);
        let messages = generate_insights("short", Platform::Twitter, &scores, &learning(0, None, None));
        assert_eq!(
            messages,
            vec![
                "Building Knowledge: Track posts to unlock insights!",
                "Needs optimization for better engagement",
            ]
        );
    }

    #[test]
    fn test_golden_full_rule_order() {
        let scores = compose(90, 95, 80, 95);
        assert_eq!(scores.engagement_potential, 90);

        let messages = generate_insights(
            "tiny",
            Platform::Instagram,
            &scores,
            &learning(
                60,
                Some(BestHashtag {
                    tag: "studio".to_string(),
                    avg_engagement: 6.55,
                }),
                Some(400),
            ),
        );

        assert_eq!(
            messages,
            vec![
                "High Confidence: Based on 60 tracked posts",
                "Data shows ~400 chars perform best on Instagram",
                "Top performer: #studio (6.5% avg)",
                "Excellent! Optimized for high engagement",
            ]
        );
    }

    #[test]
    fn test_growing_tier_and_good_post() {
        let scores = compose(70, 70, 60, 50);
        assert_eq!(scores.engagement_potential, 66);

        let messages =
            generate_insights("medium", Platform::Twitter, &scores, &learning(5, None, None));
        assert_eq!(
            messages,
            vec![
                "Growing Dataset: Learning from 5 posts",
                "Good post! Minor tweaks could help",
            ]
        );
    }

    #[test]
    fn test_length_note_needs_large_deviation() {
        let scores = compose(50, 50, 60, 30);
        // Deviation of exactly 100 stays quiet.
        let text = "a".repeat(300);
        let messages = generate_insights(
            &text,
            Platform::Twitter,
            &scores,
            &learning(0, None, Some(400)),
        );
        assert_eq!(messages.len(), 2);

        let messages = generate_insights(
            &text,
            Platform::Twitter,
            &scores,
            &learning(0, None, Some(401)),
        );
        assert!(messages
            .iter()
            .any(|m| m == "Data shows ~401 chars perform best on Twitter"));
    }
}
