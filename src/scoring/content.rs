use crate::platform::Platform;

/// Emoji whose presence counts as an "engagement element" in content.
pub const EMOJI_SET: &[char] = &['😊', '🔥', '💯', '❤', '👍', '🎉', '✨', '💪', '🙌'];

const BASE_SCORE: i32 = 50;
const NEAR_OPTIMAL_BONUS: i32 = 25;
const CLOSE_OPTIMAL_BONUS: i32 = 15;
const FAR_OPTIMAL_BONUS: i32 = 5;
const CANONICAL_RANGE_BONUS: i32 = 20;
const QUESTION_BONUS: i32 = 10;
const EMOJI_BONUS: i32 = 10;
const UPPERCASE_BONUS: i32 = 5;

/// Content length in Unicode scalar values.
pub fn char_count(text: &str) -> usize {
    text.chars().count()
}

pub fn contains_question(text: &str) -> bool {
    text.contains('?')
}

pub fn contains_emoji(text: &str) -> bool {
    text.chars().any(|c| EMOJI_SET.contains(&c))
}

/// Content quality score. When a learned optimal length exists the distance
/// to it dominates; otherwise the platform's canonical range stands in.
pub fn score_content_quality(
    text: &str,
    platform: Platform,
    optimal_length: Option<i32>,
) -> i32 {
    let mut score = BASE_SCORE;
    let length = char_count(text) as i32;

    match optimal_length {
        Some(optimal) => {
            let deviation = (length - optimal).abs();
            score += if deviation < 50 {
                NEAR_OPTIMAL_BONUS
            } else if deviation < 100 {
                CLOSE_OPTIMAL_BONUS
            } else {
                FAR_OPTIMAL_BONUS
            };
        }
        None => {
            let (lo, hi) = platform.canonical_length_range();
            if (lo as i32..=hi as i32).contains(&length) {
                score += CANONICAL_RANGE_BONUS;
            }
        }
    }

    if contains_question(text) {
        score += QUESTION_BONUS;
    }
    if contains_emoji(text) {
        score += EMOJI_BONUS;
    }
    if text.chars().next().is_some_and(char::is_uppercase) {
        score += UPPERCASE_BONUS;
    }

    score.clamp(0, 100)
}
