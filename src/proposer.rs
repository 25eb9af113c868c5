use crate::db::{SimilarPost, TopHashtag};
use crate::oracle::{OracleClient, OracleReply};
use crate::platform::Platform;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use strum::Display;
use tracing::debug;

/// Appended to a suggestion's reason when its relevance was boosted by a
/// tracked aggregate. The scorer counts tags as data-backed by looking for
/// this exact prefix.
pub const DATA_PROVENANCE_MARKER: &str = "[✓ Data:";

/// Relevance assigned to hashtags that arrive via bulk import, where no
/// prediction ever happened.
pub const DEFAULT_IMPORT_RELEVANCE: i32 = 85;

const EXTRACTED_RELEVANCE_START: i32 = 85;
const EXTRACTED_RELEVANCE_STEP: i32 = 5;
const PROVEN_RELEVANCE: i32 = 90;
const GENERIC_RELEVANCE: i32 = 70;
const HISTORY_BOOST: i32 = 10;

/// Common words that make useless hashtags.
const STOP_WORDS: &[&str] = &[
    "this", "that", "with", "from", "have", "been", "were", "their", "would", "about", "when",
    "just", "like", "some", "what", "your", "will", "they", "them", "into", "than", "more",
    "very", "can",
];

/// Last-resort pool once content tokens and tracked aggregates run dry.
const GENERIC_TAGS: &[&str] = &[
    "content",
    "socialmedia",
    "marketing",
    "community",
    "growth",
    "tips",
    "inspiration",
    "motivation",
    "business",
    "success",
    "trending",
    "viral",
    "engage",
    "share",
    "follow",
];

static CONTENT_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[a-zA-Z]{3,}\b").unwrap());
static CODE_FENCE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"```json\s*|\s*```").unwrap());
static BRACKETED_LIST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\[\s*\{.*?\}\s*\]").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
pub enum PopularityTier {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HashtagSuggestion {
    pub tag: String,
    pub relevance: i32,
    pub popularity: PopularityTier,
    pub reason: String,
}

/// Produces the platform's exact hashtag count: oracle output when it is
/// present and well formed, the deterministic fallback chain otherwise.
/// Oracle trouble is recovered here and never surfaces to the caller.
pub async fn propose(
    oracle: &OracleClient,
    text: &str,
    platform: Platform,
    top_hashtags: &[TopHashtag],
    similar_posts: &[SimilarPost],
) -> Vec<HashtagSuggestion> {
    let target = platform.hashtag_target();
    let system_prompt = build_system_prompt(platform, top_hashtags, similar_posts);
    let user_prompt = build_user_prompt(text, platform);

    match oracle.generate(&user_prompt, &system_prompt).await {
        OracleReply::Text(response) => match parse_candidates(&response, target) {
            Some(mut candidates) => {
                boost_with_history(&mut candidates, top_hashtags);
                candidates
            }
            None => {
                debug!("oracle response malformed or short, using fallback");
                fallback_suggestions(text, platform, top_hashtags)
            }
        },
        OracleReply::Unavailable => {
            debug!("oracle unavailable, using fallback");
            fallback_suggestions(text, platform, top_hashtags)
        }
    }
}

/// Summarizes learned performance data for the oracle's system prompt.
pub fn build_system_prompt(
    platform: Platform,
    top_hashtags: &[TopHashtag],
    similar_posts: &[SimilarPost],
) -> String {
    let mut learned_context = String::new();

    if !top_hashtags.is_empty() {
        learned_context.push_str("\n\nTOP PERFORMING HASHTAGS:\n");
        let lines: Vec<String> = top_hashtags
            .iter()
            .take(5)
            .map(|t| format!("#{} (avg engagement: {:.1}%)", t.hashtag, t.avg_engagement))
            .collect();
        learned_context.push_str(&lines.join("\n"));
    }

    if !similar_posts.is_empty() {
        learned_context.push_str("\n\nSIMILAR SUCCESSFUL POSTS:\n");
        for post in similar_posts.iter().take(3) {
            learned_context.push_str(&format!(
                "- '{}' ({:.1}%) used: {}\n",
                post.content, post.engagement_rate, post.hashtags
            ));
        }
    }

    let platform_context = match platform {
        Platform::Twitter => "Twitter posts perform best with 1-3 highly relevant hashtags.",
        Platform::Instagram => "Instagram posts can use 8-15 hashtags effectively.",
    };

    format!(
        "You are a social media expert specializing in {platform}.\n{platform_context}\n\n\
         You have REAL PERFORMANCE DATA from previous posts. Use this to inform \
         recommendations.{learned_context}\n\nPrioritize hashtags that have historically \
         performed well."
    )
}

pub fn build_user_prompt(text: &str, platform: Platform) -> String {
    let target = platform.hashtag_target();
    match platform {
        Platform::Twitter => format!(
            "Analyze this Twitter post and suggest hashtags:\n\n\
             Post: \"{text}\"\n\n\
             YOU MUST PROVIDE EXACTLY 3 HASHTAGS. NO MORE, NO LESS.\n\n\
             Return ONLY this JSON array with 3 entries:\n\
             [\n\
             {{\"tag\": \"hashtag1\", \"relevance\": 95, \"popularity\": \"High\", \"reason\": \"why this works\"}},\n\
             {{\"tag\": \"hashtag2\", \"relevance\": 90, \"popularity\": \"Medium\", \"reason\": \"why this works\"}},\n\
             {{\"tag\": \"hashtag3\", \"relevance\": 85, \"popularity\": \"Medium\", \"reason\": \"why this works\"}}\n\
             ]\n\n\
             Return ONLY the JSON array. Nothing else."
        ),
        Platform::Instagram => format!(
            "Analyze this Instagram post and suggest hashtags:\n\n\
             Post: \"{text}\"\n\n\
             Provide EXACTLY {target} hashtags. Format as JSON array:\n\
             [\n\
             {{\"tag\": \"example\", \"relevance\": 95, \"popularity\": \"High\", \"reason\": \"explanation\"}},\n\
             {{\"tag\": \"sample\", \"relevance\": 90, \"popularity\": \"Medium\", \"reason\": \"explanation\"}}\n\
             ]\n\n\
             IMPORTANT: Return ONLY the JSON array with exactly {target} hashtags, nothing else."
        ),
    }
}

/// Pulls the first bracketed record list out of the oracle's free text and
/// decodes it. `None` means malformed or too short; a longer list is
/// truncated to the target.
pub fn parse_candidates(response: &str, target: usize) -> Option<Vec<HashtagSuggestion>> {
    let mut cleaned = response.trim().to_string();
    if cleaned.starts_with("```") {
        cleaned = CODE_FENCE.replace_all(&cleaned, "").trim().to_string();
    }

    let json_block = BRACKETED_LIST.find(&cleaned)?.as_str();
    let mut candidates: Vec<HashtagSuggestion> = serde_json::from_str(json_block).ok()?;

    for candidate in &mut candidates {
        candidate.tag = candidate.tag.trim().trim_start_matches('#').to_string();
        if candidate.tag.is_empty() {
            return None;
        }
        candidate.relevance = candidate.relevance.clamp(0, 100);
    }

    if candidates.len() < target {
        debug!(
            got = candidates.len(),
            want = target,
            "oracle returned too few hashtags"
        );
        return None;
    }

    candidates.truncate(target);
    Some(candidates)
}

/// Bumps relevance for tags the store has real numbers on, and stamps the
/// provenance note the scorer looks for.
pub fn boost_with_history(suggestions: &mut [HashtagSuggestion], top_hashtags: &[TopHashtag]) {
    for suggestion in suggestions {
        if let Some(tracked) = top_hashtags
            .iter()
            .find(|t| t.hashtag.eq_ignore_ascii_case(&suggestion.tag))
        {
            suggestion.relevance = (suggestion.relevance + HISTORY_BOOST).min(100);
            suggestion.reason.push_str(&format!(
                " {DATA_PROVENANCE_MARKER} {:.1}% avg]",
                tracked.avg_engagement
            ));
        }
    }
}

/// Deterministic fallback: content tokens, then proven aggregates, then the
/// generic pool, until the platform target is met. The pool can in theory
/// run dry, in which case fewer tags come back.
pub fn fallback_suggestions(
    text: &str,
    platform: Platform,
    top_hashtags: &[TopHashtag],
) -> Vec<HashtagSuggestion> {
    let target = platform.hashtag_target();
    let mut suggestions: Vec<HashtagSuggestion> = Vec::with_capacity(target);

    let contains_tag = |list: &[HashtagSuggestion], tag: &str| {
        list.iter().any(|s| s.tag.eq_ignore_ascii_case(tag))
    };

    for (rank, keyword) in extract_keywords(text).into_iter().enumerate() {
        if suggestions.len() >= target {
            break;
        }
        suggestions.push(HashtagSuggestion {
            tag: keyword,
            relevance: EXTRACTED_RELEVANCE_START - (rank as i32 * EXTRACTED_RELEVANCE_STEP),
            popularity: PopularityTier::Medium,
            reason: "Extracted from content keywords".to_string(),
        });
    }

    for tracked in top_hashtags {
        if suggestions.len() >= target {
            break;
        }
        if contains_tag(&suggestions, &tracked.hashtag) {
            continue;
        }
        suggestions.push(HashtagSuggestion {
            tag: tracked.hashtag.clone(),
            relevance: PROVEN_RELEVANCE,
            popularity: PopularityTier::High,
            reason: format!("Proven performer: {:.1}% avg", tracked.avg_engagement),
        });
    }

    for generic in GENERIC_TAGS {
        if suggestions.len() >= target {
            break;
        }
        if contains_tag(&suggestions, generic) {
            continue;
        }
        suggestions.push(HashtagSuggestion {
            tag: generic.to_string(),
            relevance: GENERIC_RELEVANCE,
            popularity: PopularityTier::Medium,
            reason: "General engagement hashtag".to_string(),
        });
    }

    suggestions.truncate(target);
    suggestions
}

/// Lowercase alphabetic tokens of length >= 3, stop words removed,
/// de-duplicated in first-seen order.
fn extract_keywords(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    let mut seen = std::collections::HashSet::new();
    CONTENT_TOKEN
        .find_iter(&lower)
        .map(|m| m.as_str().to_string())
        .filter(|word| !STOP_WORDS.contains(&word.as_str()))
        .filter(|word| seen.insert(word.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracked(tag: &str, avg: f64) -> TopHashtag {
        TopHashtag {
            hashtag: tag.to_string(),
            total_uses: 5,
            avg_engagement: avg,
        }
    }

    #[test]
    fn test_parse_plain_json_array() {
        let response = r#"[
            {"tag": "rust", "relevance": 95, "popularity": "High", "reason": "fits"},
            {"tag": "coding", "relevance": 90, "popularity": "Medium", "reason": "fits"},
            {"tag": "dev", "relevance": 85, "popularity": "Low", "reason": "fits"}
        ]"#;
        let parsed = parse_candidates(response, 3).unwrap();
        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed[0].tag, "rust");
        assert_eq!(parsed[2].popularity, PopularityTier::Low);
    }

    #[test]
    fn test_parse_strips_code_fences_and_prose() {
        let response = "```json\n[{\"tag\": \"one\", \"relevance\": 80, \"popularity\": \"High\", \"reason\": \"r\"}, {\"tag\": \"two\", \"relevance\": 70, \"popularity\": \"Medium\", \"reason\": \"r\"}, {\"tag\": \"three\", \"relevance\": 60, \"popularity\": \"Low\", \"reason\": \"r\"}]\n```";
        let parsed = parse_candidates(response, 3).unwrap();
        assert_eq!(parsed.len(), 3);

        let chatty = format!("Sure! Here are my picks:\n{}", "[{\"tag\": \"a\", \"relevance\": 1, \"popularity\": \"Low\", \"reason\": \"r\"}, {\"tag\": \"b\", \"relevance\": 2, \"popularity\": \"Low\", \"reason\": \"r\"}, {\"tag\": \"c\", \"relevance\": 3, \"popularity\": \"Low\", \"reason\": \"r\"}]");
        assert!(parse_candidates(&chatty, 3).is_some());
    }

    #[test]
    fn test_parse_rejects_short_list() {
        let response = r#"[{"tag": "only", "relevance": 95, "popularity": "High", "reason": "r"}]"#;
        assert!(parse_candidates(response, 3).is_none());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_candidates("no json here", 3).is_none());
        assert!(parse_candidates("[1, 2, 3]", 3).is_none());
        assert!(parse_candidates("", 3).is_none());
    }

    #[test]
    fn test_parse_truncates_long_list() {
        let entries: Vec<String> = (0..6)
            .map(|i| {
                format!(
                    "{{\"tag\": \"tag{i}\", \"relevance\": 90, \"popularity\": \"High\", \"reason\": \"r\"}}"
                )
            })
            .collect();
        let response = format!("[{}]", entries.join(", "));
        let parsed = parse_candidates(&response, 3).unwrap();
        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed[2].tag, "tag2");
    }

    #[test]
    fn test_parse_normalizes_leading_hash() {
        let response = r##"[
            {"tag": "#rust", "relevance": 95, "popularity": "High", "reason": "r"},
            {"tag": " #coding ", "relevance": 90, "popularity": "Medium", "reason": "r"},
            {"tag": "dev", "relevance": 85, "popularity": "Low", "reason": "r"}
        ]"##;
        let parsed = parse_candidates(response, 3).unwrap();
        assert_eq!(parsed[0].tag, "rust");
        assert_eq!(parsed[1].tag, "coding");
    }

    #[test]
    fn test_parse_rejects_empty_tag() {
        let response = r##"[
            {"tag": "#", "relevance": 95, "popularity": "High", "reason": "r"},
            {"tag": "b", "relevance": 90, "popularity": "Medium", "reason": "r"},
            {"tag": "c", "relevance": 85, "popularity": "Low", "reason": "r"}
        ]"##;
        assert!(parse_candidates(response, 3).is_none());
    }

    #[test]
    fn test_boost_marks_tracked_tags() {
        let mut suggestions = vec![
            HashtagSuggestion {
                tag: "GameDev".to_string(),
                relevance: 95,
                popularity: PopularityTier::High,
                reason: "fits the content".to_string(),
            },
            HashtagSuggestion {
                tag: "untracked".to_string(),
                relevance: 80,
                popularity: PopularityTier::Medium,
                reason: "fits".to_string(),
            },
        ];
        boost_with_history(&mut suggestions, &[tracked("gamedev", 4.25)]);

        assert_eq!(suggestions[0].relevance, 100);
        assert!(suggestions[0].reason.contains(DATA_PROVENANCE_MARKER));
        assert!(suggestions[0].reason.contains("4.2% avg"));
        assert_eq!(suggestions[1].relevance, 80);
        assert!(!suggestions[1].reason.contains(DATA_PROVENANCE_MARKER));
    }

    #[test]
    fn test_fallback_twitter_exact_count_from_tokens() {
        let suggestions =
            fallback_suggestions("launch announcement for indie game", Platform::Twitter, &[]);
        assert_eq!(suggestions.len(), 3);
        assert_eq!(suggestions[0].tag, "launch");
        assert_eq!(suggestions[0].relevance, 85);
        assert_eq!(suggestions[1].relevance, 80);
        assert_eq!(suggestions[2].relevance, 75);
        assert!(suggestions
            .iter()
            .all(|s| s.reason == "Extracted from content keywords"));
    }

    #[test]
    fn test_fallback_excludes_stop_words() {
        let suggestions = fallback_suggestions("this that with launch", Platform::Twitter, &[]);
        assert_eq!(suggestions[0].tag, "launch");
    }

    #[test]
    fn test_fallback_fills_from_history_then_generic_pool() {
        let suggestions = fallback_suggestions(
            "hi",
            Platform::Twitter,
            &[tracked("proven", 5.5), tracked("also", 4.0)],
        );
        assert_eq!(suggestions.len(), 3);
        assert_eq!(suggestions[0].tag, "proven");
        assert_eq!(suggestions[0].relevance, 90);
        assert_eq!(suggestions[0].reason, "Proven performer: 5.5% avg");
        assert_eq!(suggestions[1].tag, "also");
        assert_eq!(suggestions[2].tag, "content");
        assert_eq!(suggestions[2].relevance, 70);
    }

    #[test]
    fn test_fallback_instagram_reaches_twelve() {
        let suggestions = fallback_suggestions("short note", Platform::Instagram, &[]);
        assert_eq!(suggestions.len(), 12);

        let mut tags: Vec<String> = suggestions.iter().map(|s| s.tag.clone()).collect();
        tags.sort();
        tags.dedup();
        assert_eq!(tags.len(), 12, "all tags distinct");
    }

    #[test]
    fn test_fallback_deduplicates_across_sources() {
        // "marketing" appears as a content token and in the generic pool.
        let suggestions = fallback_suggestions(
            "marketing marketing growth",
            Platform::Twitter,
            &[tracked("growth", 3.5)],
        );
        assert_eq!(suggestions.len(), 3);
        let marketing_count = suggestions
            .iter()
            .filter(|s| s.tag.eq_ignore_ascii_case("marketing"))
            .count();
        let growth_count = suggestions
            .iter()
            .filter(|s| s.tag.eq_ignore_ascii_case("growth"))
            .count();
        assert_eq!(marketing_count, 1);
        assert_eq!(growth_count, 1);
    }

    #[test]
    fn test_fallback_repeated_text_still_exact_count() {
        let suggestions = fallback_suggestions(
            "launch launch launch launch",
            Platform::Twitter,
            &[],
        );
        assert_eq!(suggestions.len(), 3);
        assert_eq!(suggestions[0].tag, "launch");
        assert_eq!(suggestions[1].tag, "content");
    }

    #[test]
    fn test_system_prompt_carries_learned_context() {
        let prompt = build_system_prompt(
            Platform::Twitter,
            &[tracked("gamedev", 4.2)],
            &[SimilarPost {
                post_id: 1,
                content: "shipping the demo".to_string(),
                engagement_rate: 5.1,
                hashtags: "demo, indie".to_string(),
                similarity: 0.4,
            }],
        );
        assert!(prompt.contains("TOP PERFORMING HASHTAGS:"));
        assert!(prompt.contains("#gamedev (avg engagement: 4.2%)"));
        assert!(prompt.contains("SIMILAR SUCCESSFUL POSTS:"));
        assert!(prompt.contains("- 'shipping the demo' (5.1%) used: demo, indie"));
        assert!(prompt.contains("1-3 highly relevant hashtags"));
    }

    #[test]
    fn test_user_prompt_demands_exact_counts() {
        let twitter = build_user_prompt("my post", Platform::Twitter);
        assert!(twitter.contains("EXACTLY 3 HASHTAGS"));
        let instagram = build_user_prompt("my post", Platform::Instagram);
        assert!(instagram.contains("EXACTLY 12 hashtags"));
    }
}
