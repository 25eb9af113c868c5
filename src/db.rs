use crate::error::StoreError;
use crate::platform::Platform;
use crate::schema::{hashtag_stats, hashtags, performance, posts};
use crate::scoring::{char_count, contains_emoji, contains_question};
use crate::settings::settings;
use chrono::Utc;
use diesel::connection::SimpleConnection;
use diesel::dsl::{avg, count_distinct, count_star};
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::sqlite::SqliteConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

/// Aggregates need at least this many observations before they are offered
/// as "top" hashtags, and one more before one can be called the best.
pub const MIN_USES_FOR_TOP: i32 = 2;
pub const MIN_USES_FOR_BEST: i32 = 3;

const EXCERPT_CHARS: usize = 100;

static SIMILARITY_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[a-zA-Z]{4,}\b").unwrap());

pub fn establish_pool(database_url: &str) -> DbPool {
    let manager = ConnectionManager::<SqliteConnection>::new(database_url);
    Pool::builder()
        .max_size(5)
        .build(manager)
        .expect("Failed to create pool")
}

pub fn configure_connection(conn: &mut SqliteConnection) -> QueryResult<()> {
    conn.batch_execute("PRAGMA busy_timeout = 2000;")?;
    conn.batch_execute("PRAGMA journal_mode = WAL;")?;
    conn.batch_execute("PRAGMA synchronous = NORMAL;")?;
    conn.batch_execute("PRAGMA foreign_keys = ON;")?;
    Ok(())
}

pub fn run_migrations(conn: &mut SqliteConnection) {
    conn.run_pending_migrations(MIGRATIONS)
        .expect("Failed to run migrations");
}

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = posts)]
pub struct Post {
    pub id: i32,
    pub platform: String,
    pub content: String,
    pub created_at: i64,
    pub content_length: i32,
    pub has_question: i32,
    pub has_emoji: i32,
    pub predicted_score: i32,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = posts)]
struct NewPost<'a> {
    platform: String,
    content: &'a str,
    created_at: i64,
    content_length: i32,
    has_question: i32,
    has_emoji: i32,
    predicted_score: i32,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = hashtags)]
struct NewHashtag<'a> {
    post_id: i32,
    hashtag: &'a str,
    predicted_relevance: i32,
}

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = performance)]
pub struct Performance {
    pub id: i32,
    pub post_id: i32,
    pub likes: i32,
    pub comments: i32,
    pub shares: i32,
    pub impressions: i32,
    pub engagement_rate: f64,
    pub updated_at: i64,
}

#[derive(Insertable, AsChangeset, Debug)]
#[diesel(table_name = performance)]
struct OutcomeUpsert {
    post_id: i32,
    likes: i32,
    comments: i32,
    shares: i32,
    impressions: i32,
    engagement_rate: f64,
    updated_at: i64,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = hashtag_stats)]
struct NewHashtagStat<'a> {
    hashtag: &'a str,
    platform: String,
    total_uses: i32,
    avg_engagement: f64,
    last_used: i64,
}

/// Reported outcome metrics for one post.
#[derive(Debug, Clone, Copy)]
pub struct OutcomeMetrics {
    pub likes: i32,
    pub comments: i32,
    pub shares: i32,
    pub impressions: i32,
}

impl OutcomeMetrics {
    /// Engagement rate in percent. Only defined for positive impressions.
    pub fn engagement_rate(&self) -> f64 {
        (self.likes + self.comments + self.shares) as f64 / self.impressions as f64 * 100.0
    }
}

#[derive(Debug, Clone)]
pub struct TopHashtag {
    pub hashtag: String,
    pub total_uses: i32,
    pub avg_engagement: f64,
}

#[derive(Debug, Clone)]
pub struct SimilarPost {
    pub post_id: i32,
    pub content: String,
    pub engagement_rate: f64,
    pub hashtags: String,
    pub similarity: f64,
}

#[derive(Debug, Clone)]
pub struct BestHashtag {
    pub tag: String,
    pub avg_engagement: f64,
}

#[derive(Debug, Clone)]
pub struct LearningInsights {
    pub total_posts: i64,
    pub tracked_posts: i64,
    pub avg_engagement: f64,
    pub best_hashtag: Option<BestHashtag>,
    pub optimal_length: Option<i32>,
}

/// A fully known historical post, used by bulk import.
#[derive(Debug, Clone)]
pub struct ImportedPost {
    pub platform: Platform,
    pub content: String,
    pub hashtags: Vec<String>,
    pub metrics: OutcomeMetrics,
    pub predicted_score: i32,
    pub created_at: i64,
}

/// Persists one prediction: the post row plus every hashtag assignment, in a
/// single transaction. Returns the generated post id.
pub fn record_prediction(
    conn: &mut SqliteConnection,
    platform: Platform,
    text: &str,
    tags: &[(String, i32)],
    predicted_score: i32,
) -> Result<i32, StoreError> {
    let now = Utc::now().timestamp();
    conn.immediate_transaction(|conn| {
        let post_id = insert_post(conn, platform, text, predicted_score, now)?;
        insert_assignments(conn, post_id, tags)?;
        Ok(post_id)
    })
}

fn insert_post(
    conn: &mut SqliteConnection,
    platform: Platform,
    text: &str,
    predicted_score: i32,
    created_at: i64,
) -> QueryResult<i32> {
    let new_post = NewPost {
        platform: platform.to_string(),
        content: text,
        created_at,
        content_length: char_count(text) as i32,
        has_question: contains_question(text) as i32,
        has_emoji: contains_emoji(text) as i32,
        predicted_score,
    };

    diesel::insert_into(posts::table)
        .values(&new_post)
        .returning(posts::id)
        .get_result::<i32>(conn)
}

fn insert_assignments(
    conn: &mut SqliteConnection,
    post_id: i32,
    tags: &[(String, i32)],
) -> QueryResult<()> {
    if tags.is_empty() {
        return Ok(());
    }

    let rows: Vec<NewHashtag> = tags
        .iter()
        .map(|(tag, relevance)| NewHashtag {
            post_id,
            hashtag: tag,
            predicted_relevance: *relevance,
        })
        .collect();

    diesel::insert_into(hashtags::table)
        .values(&rows)
        .execute(conn)?;
    Ok(())
}

/// Records (or replaces) the observed outcome for a post and folds one
/// observation into every distinct assigned hashtag's running aggregate.
/// The whole write is one transaction: either the outcome row and every
/// aggregate update land, or none do.
pub fn report_outcome(
    conn: &mut SqliteConnection,
    post_id: i32,
    metrics: OutcomeMetrics,
) -> Result<f64, StoreError> {
    if metrics.impressions <= 0 {
        return Err(StoreError::InvalidMetrics);
    }

    let rate = metrics.engagement_rate();
    let now = Utc::now().timestamp();

    conn.immediate_transaction(|conn| {
        let platform: String = posts::table
            .find(post_id)
            .select(posts::platform)
            .first(conn)
            .optional()?
            .ok_or(StoreError::PostNotFound(post_id))?;

        upsert_outcome(conn, post_id, metrics, rate, now)?;

        for tag in distinct_post_tags(conn, post_id)? {
            upsert_hashtag_stat(conn, &tag, &platform, rate, now)?;
        }

        Ok(rate)
    })
}

fn upsert_outcome(
    conn: &mut SqliteConnection,
    post_id: i32,
    metrics: OutcomeMetrics,
    rate: f64,
    now: i64,
) -> QueryResult<()> {
    let entry = OutcomeUpsert {
        post_id,
        likes: metrics.likes,
        comments: metrics.comments,
        shares: metrics.shares,
        impressions: metrics.impressions,
        engagement_rate: rate,
        updated_at: now,
    };

    diesel::insert_into(performance::table)
        .values(&entry)
        .on_conflict(performance::post_id)
        .do_update()
        .set(&entry)
        .execute(conn)?;
    Ok(())
}

fn distinct_post_tags(conn: &mut SqliteConnection, post_id: i32) -> QueryResult<Vec<String>> {
    let all: Vec<String> = hashtags::table
        .filter(hashtags::post_id.eq(post_id))
        .select(hashtags::hashtag)
        .load(conn)?;

    let mut seen = HashSet::new();
    Ok(all.into_iter().filter(|t| seen.insert(t.clone())).collect())
}

/// Incremental mean update for one (tag, platform) aggregate. Never
/// recomputes from scratch: a fresh aggregate starts at (1, rate), an
/// existing one absorbs the new rate as its n-th observation.
fn upsert_hashtag_stat(
    conn: &mut SqliteConnection,
    tag: &str,
    platform: &str,
    rate: f64,
    now: i64,
) -> QueryResult<()> {
    let existing: Option<(i32, f64)> = hashtag_stats::table
        .find((tag, platform))
        .select((hashtag_stats::total_uses, hashtag_stats::avg_engagement))
        .first(conn)
        .optional()?;

    match existing {
        Some((uses, avg_rate)) => {
            let new_uses = uses + 1;
            let new_avg = (avg_rate * uses as f64 + rate) / new_uses as f64;
            diesel::update(hashtag_stats::table.find((tag, platform)))
                .set((
                    hashtag_stats::total_uses.eq(new_uses),
                    hashtag_stats::avg_engagement.eq(new_avg),
                    hashtag_stats::last_used.eq(now),
                ))
                .execute(conn)?;
        }
        None => {
            diesel::insert_into(hashtag_stats::table)
                .values(&NewHashtagStat {
                    hashtag: tag,
                    platform: platform.to_string(),
                    total_uses: 1,
                    avg_engagement: rate,
                    last_used: now,
                })
                .execute(conn)?;
        }
    }
    Ok(())
}

/// Historically best aggregates for a platform. Requires at least
/// [`MIN_USES_FOR_TOP`] observations; an empty store yields an empty list.
pub fn top_hashtags(
    conn: &mut SqliteConnection,
    platform: Platform,
    limit: usize,
) -> QueryResult<Vec<TopHashtag>> {
    let rows: Vec<(String, i32, f64)> = hashtag_stats::table
        .filter(hashtag_stats::platform.eq(platform.to_string()))
        .filter(hashtag_stats::total_uses.ge(MIN_USES_FOR_TOP))
        .order(hashtag_stats::avg_engagement.desc())
        .limit(limit as i64)
        .select((
            hashtag_stats::hashtag,
            hashtag_stats::total_uses,
            hashtag_stats::avg_engagement,
        ))
        .load(conn)?;

    Ok(rows
        .into_iter()
        .map(|(hashtag, total_uses, avg_engagement)| TopHashtag {
            hashtag,
            total_uses,
            avg_engagement,
        })
        .collect())
}

/// Lowercase alphabetic tokens of length >= 4, used for similarity matching.
pub fn token_set(text: &str) -> HashSet<String> {
    let lower = text.to_lowercase();
    SIMILARITY_TOKEN
        .find_iter(&lower)
        .map(|m| m.as_str().to_string())
        .collect()
}

pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

/// Outcome-backed posts on the platform that beat the success cutoff and
/// share enough vocabulary with the query text. Candidates are pulled
/// best-first, capped at twice the requested count, then filtered by Jaccard
/// similarity over their token sets.
pub fn similar_successful_posts(
    conn: &mut SqliteConnection,
    text: &str,
    platform: Platform,
    limit: usize,
) -> QueryResult<Vec<SimilarPost>> {
    let s = settings();
    let query_tokens = token_set(text);

    let candidates: Vec<(i32, String, f64)> = posts::table
        .inner_join(performance::table)
        .filter(posts::platform.eq(platform.to_string()))
        .filter(performance::engagement_rate.gt(s.learning.success_engagement_rate))
        .order(performance::engagement_rate.desc())
        .limit((limit * 2) as i64)
        .select((posts::id, posts::content, performance::engagement_rate))
        .load(conn)?;

    let mut results = Vec::new();
    for (post_id, content, engagement_rate) in candidates {
        let similarity = jaccard(&query_tokens, &token_set(&content));
        if similarity <= s.learning.similarity_threshold {
            continue;
        }

        let tags: Vec<String> = hashtags::table
            .filter(hashtags::post_id.eq(post_id))
            .select(hashtags::hashtag)
            .load(conn)?;

        results.push(SimilarPost {
            post_id,
            content: excerpt(&content),
            engagement_rate,
            hashtags: tags.join(", "),
            similarity,
        });
    }

    // Candidates arrive rate-descending; the sort is stable so retrieval
    // order breaks ties.
    results.sort_by(|a, b| {
        b.engagement_rate
            .partial_cmp(&a.engagement_rate)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    results.truncate(limit);
    Ok(results)
}

fn excerpt(content: &str) -> String {
    if char_count(content) > EXCERPT_CHARS {
        let cut: String = content.chars().take(EXCERPT_CHARS).collect();
        format!("{}...", cut)
    } else {
        content.to_string()
    }
}

/// Aggregate view of what the store has learned about one platform.
pub fn learning_insights(
    conn: &mut SqliteConnection,
    platform: Platform,
) -> QueryResult<LearningInsights> {
    let platform_str = platform.to_string();

    let total_posts: i64 = posts::table
        .filter(posts::platform.eq(&platform_str))
        .count()
        .get_result(conn)?;

    let tracked_posts: i64 = posts::table
        .inner_join(performance::table)
        .filter(posts::platform.eq(&platform_str))
        .count()
        .get_result(conn)?;

    let avg_engagement: f64 = posts::table
        .inner_join(performance::table)
        .filter(posts::platform.eq(&platform_str))
        .select(avg(performance::engagement_rate))
        .first::<Option<f64>>(conn)?
        .unwrap_or(0.0);

    let best_hashtag = hashtag_stats::table
        .filter(hashtag_stats::platform.eq(&platform_str))
        .filter(hashtag_stats::total_uses.ge(MIN_USES_FOR_BEST))
        .order(hashtag_stats::avg_engagement.desc())
        .select((hashtag_stats::hashtag, hashtag_stats::avg_engagement))
        .first::<(String, f64)>(conn)
        .optional()?
        .map(|(tag, avg_engagement)| BestHashtag {
            tag,
            avg_engagement,
        });

    let optimal_length = optimal_content_length(conn, &platform_str)?;

    Ok(LearningInsights {
        total_posts,
        tracked_posts,
        avg_engagement,
        best_hashtag,
        optimal_length,
    })
}

/// Mean content length of the platform's outcome-backed posts that beat the
/// store-wide mean engagement rate. The baseline is deliberately computed
/// over every platform's outcomes, not just this one's.
fn optimal_content_length(
    conn: &mut SqliteConnection,
    platform_str: &str,
) -> QueryResult<Option<i32>> {
    let store_mean: Option<f64> = performance::table
        .select(avg(performance::engagement_rate))
        .first(conn)?;

    let Some(store_mean) = store_mean else {
        return Ok(None);
    };

    let lengths: Vec<i32> = posts::table
        .inner_join(performance::table)
        .filter(posts::platform.eq(platform_str))
        .filter(performance::engagement_rate.gt(store_mean))
        .select(posts::content_length)
        .load(conn)?;

    if lengths.is_empty() {
        return Ok(None);
    }

    let mean = lengths.iter().map(|l| *l as f64).sum::<f64>() / lengths.len() as f64;
    Ok(Some(mean as i32))
}

/// Imports one fully known historical post: the post row, its assignments,
/// its outcome, and the aggregate updates, all in a single transaction.
pub fn record_historical_post(
    conn: &mut SqliteConnection,
    imported: &ImportedPost,
) -> Result<i32, StoreError> {
    if imported.metrics.impressions <= 0 {
        return Err(StoreError::InvalidMetrics);
    }

    let rate = imported.metrics.engagement_rate();
    let platform_str = imported.platform.to_string();

    conn.immediate_transaction(|conn| {
        let new_post = NewPost {
            platform: platform_str.clone(),
            content: &imported.content,
            created_at: imported.created_at,
            content_length: char_count(&imported.content) as i32,
            has_question: contains_question(&imported.content) as i32,
            has_emoji: contains_emoji(&imported.content) as i32,
            predicted_score: imported.predicted_score,
        };
        let post_id = diesel::insert_into(posts::table)
            .values(&new_post)
            .returning(posts::id)
            .get_result::<i32>(conn)?;

        let assignments: Vec<(String, i32)> = imported
            .hashtags
            .iter()
            .map(|t| (t.clone(), crate::proposer::DEFAULT_IMPORT_RELEVANCE))
            .collect();
        insert_assignments(conn, post_id, &assignments)?;

        upsert_outcome(conn, post_id, imported.metrics, rate, imported.created_at)?;
        for tag in &imported.hashtags {
            upsert_hashtag_stat(conn, tag, &platform_str, rate, imported.created_at)?;
        }

        Ok(post_id)
    })
}

// --- maintenance surface ---

#[derive(Debug, Clone)]
pub struct StoreStats {
    pub total_posts: i64,
    pub posts_by_platform: Vec<(String, i64)>,
    pub tracked_posts: i64,
    pub avg_engagement: Option<f64>,
    pub best_post: Option<(String, f64)>,
    pub unique_hashtags: i64,
    pub top_hashtags: Vec<TopHashtag>,
}

pub fn store_stats(conn: &mut SqliteConnection) -> QueryResult<StoreStats> {
    let total_posts: i64 = posts::table.count().get_result(conn)?;

    let posts_by_platform: Vec<(String, i64)> = posts::table
        .group_by(posts::platform)
        .select((posts::platform, count_star()))
        .load(conn)?;

    let tracked_posts: i64 = performance::table.count().get_result(conn)?;

    let avg_engagement: Option<f64> = performance::table
        .select(avg(performance::engagement_rate))
        .first(conn)?;

    let best_post = posts::table
        .inner_join(performance::table)
        .order(performance::engagement_rate.desc())
        .select((posts::content, performance::engagement_rate))
        .first::<(String, f64)>(conn)
        .optional()?;

    let unique_hashtags: i64 = hashtags::table
        .select(count_distinct(hashtags::hashtag))
        .get_result(conn)?;

    let top: Vec<(String, i32, f64)> = hashtag_stats::table
        .filter(hashtag_stats::total_uses.ge(MIN_USES_FOR_TOP))
        .order(hashtag_stats::avg_engagement.desc())
        .limit(5)
        .select((
            hashtag_stats::hashtag,
            hashtag_stats::total_uses,
            hashtag_stats::avg_engagement,
        ))
        .load(conn)?;

    Ok(StoreStats {
        total_posts,
        posts_by_platform,
        tracked_posts,
        avg_engagement,
        best_post,
        unique_hashtags,
        top_hashtags: top
            .into_iter()
            .map(|(hashtag, total_uses, avg_engagement)| TopHashtag {
                hashtag,
                total_uses,
                avg_engagement,
            })
            .collect(),
    })
}

fn untracked_post_ids(conn: &mut SqliteConnection, cutoff: i64) -> QueryResult<Vec<i32>> {
    posts::table
        .left_join(performance::table)
        .filter(performance::id.is_null())
        .filter(posts::created_at.lt(cutoff))
        .select(posts::id)
        .load(conn)
}

pub fn count_untracked_posts(conn: &mut SqliteConnection, cutoff: i64) -> QueryResult<usize> {
    Ok(untracked_post_ids(conn, cutoff)?.len())
}

/// Deletes outcome-less posts created before the cutoff, assignments first.
pub fn clean_untracked_posts(
    conn: &mut SqliteConnection,
    cutoff: i64,
) -> Result<usize, StoreError> {
    conn.immediate_transaction(|conn| {
        let stale = untracked_post_ids(conn, cutoff)?;
        if stale.is_empty() {
            return Ok(0);
        }

        diesel::delete(hashtags::table.filter(hashtags::post_id.eq_any(&stale))).execute(conn)?;
        let deleted =
            diesel::delete(posts::table.filter(posts::id.eq_any(&stale))).execute(conn)?;
        Ok(deleted)
    })
}

#[derive(Debug, Clone)]
pub struct ExportRow {
    pub post: Post,
    pub outcome: Option<Performance>,
    pub hashtags: String,
}

/// Flattened view of the whole store, newest posts first.
pub fn export_rows(conn: &mut SqliteConnection) -> QueryResult<Vec<ExportRow>> {
    let rows: Vec<(Post, Option<Performance>)> = posts::table
        .left_join(performance::table)
        .order(posts::created_at.desc())
        .select((Post::as_select(), Option::<Performance>::as_select()))
        .load(conn)?;

    let mut out = Vec::with_capacity(rows.len());
    for (post, outcome) in rows {
        let tags: Vec<String> = hashtags::table
            .filter(hashtags::post_id.eq(post.id))
            .select(hashtags::hashtag)
            .load(conn)?;
        out.push(ExportRow {
            post,
            outcome,
            hashtags: tags.join(", "),
        });
    }
    Ok(out)
}

pub fn vacuum(conn: &mut SqliteConnection) -> QueryResult<()> {
    conn.batch_execute("VACUUM;")?;
    Ok(())
}
