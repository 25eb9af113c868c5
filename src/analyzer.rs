use crate::db::{self, LearningInsights, SimilarPost};
use crate::error::StoreError;
use crate::insights::generate_insights;
use crate::oracle::OracleClient;
use crate::platform::Platform;
use crate::proposer::{self, HashtagSuggestion};
use crate::scoring::{self, PerformanceScores};
use crate::settings::settings;
use chrono::{Datelike, Utc};
use diesel::sqlite::SqliteConnection;

/// Everything one analysis request produces. The post id points at the
/// recorded prediction so an outcome can be attached later.
#[derive(Debug)]
pub struct AnalysisReport {
    pub post_id: i32,
    pub hashtags: Vec<HashtagSuggestion>,
    pub scores: PerformanceScores,
    pub insights: Vec<String>,
    pub similar_posts: Vec<SimilarPost>,
    pub learning: LearningInsights,
}

/// Runs one full analysis: learned context out of the store, hashtags from
/// the proposer, scores, insights, and finally the prediction written back.
/// The write happens before the report is returned, never after.
pub async fn analyze(
    conn: &mut SqliteConnection,
    oracle: &OracleClient,
    text: &str,
    platform: Platform,
) -> Result<AnalysisReport, StoreError> {
    let s = settings();

    let top = db::top_hashtags(conn, platform, s.learning.top_hashtags_limit)?;
    let similar =
        db::similar_successful_posts(conn, text, platform, s.learning.similar_posts_limit)?;
    let learning = db::learning_insights(conn, platform)?;

    let hashtags = proposer::propose(oracle, text, platform, &top, &similar).await;

    let scores = scoring::evaluate(text, &hashtags, platform, &learning, Utc::now().weekday());
    let insights = generate_insights(text, platform, &scores, &learning);

    let assignments: Vec<(String, i32)> = hashtags
        .iter()
        .map(|h| (h.tag.clone(), h.relevance))
        .collect();
    let post_id = db::record_prediction(
        conn,
        platform,
        text,
        &assignments,
        scores.engagement_potential,
    )?;

    Ok(AnalysisReport {
        post_id,
        hashtags,
        scores,
        insights,
        similar_posts: similar,
        learning,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use diesel::prelude::*;
    use std::time::Duration;

    fn unreachable_oracle() -> OracleClient {
        OracleClient::new(
            "http://127.0.0.1:59999",
            "llama3.2:3b",
            0.7,
            0.9,
            Duration::from_millis(50),
            Duration::from_millis(50),
        )
    }

    #[tokio::test]
    async fn test_analyze_records_before_returning() {
        let mut conn = SqliteConnection::establish(":memory:").unwrap();
        db::run_migrations(&mut conn);

        let report = analyze(
            &mut conn,
            &unreachable_oracle(),
            "Shipping a fresh build of the editor today",
            Platform::Twitter,
        )
        .await
        .unwrap();

        // Oracle is down, so the fallback chain supplied exactly three tags.
        assert_eq!(report.hashtags.len(), 3);
        assert!(report.scores.engagement_potential > 0);
        assert!(!report.insights.is_empty());

        // The prediction and its assignments are already durable.
        use crate::schema::{hashtags, posts};
        let stored_platform: String = posts::table
            .find(report.post_id)
            .select(posts::platform)
            .first(&mut conn)
            .unwrap();
        assert_eq!(stored_platform, "Twitter");

        let stored_tags: i64 = hashtags::table
            .filter(hashtags::post_id.eq(report.post_id))
            .count()
            .get_result(&mut conn)
            .unwrap();
        assert_eq!(stored_tags, 3);
    }

    #[tokio::test]
    async fn test_analyze_then_track_round_trip() {
        let mut conn = SqliteConnection::establish(":memory:").unwrap();
        db::run_migrations(&mut conn);

        let report = analyze(
            &mut conn,
            &unreachable_oracle(),
            "Question for everyone: what should we build next?",
            Platform::Twitter,
        )
        .await
        .unwrap();

        let rate = db::report_outcome(
            &mut conn,
            report.post_id,
            db::OutcomeMetrics {
                likes: 45,
                comments: 8,
                shares: 12,
                impressions: 2500,
            },
        )
        .unwrap();
        assert!((rate - 2.6).abs() < 1e-9);

        let learning = db::learning_insights(&mut conn, Platform::Twitter).unwrap();
        assert_eq!(learning.tracked_posts, 1);
        assert!((learning.avg_engagement - 2.6).abs() < 1e-9);
    }
}
