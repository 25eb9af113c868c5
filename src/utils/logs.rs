use console::{measure_text_width, Style};

use crate::db::{LearningInsights, SimilarPost, StoreStats, TopHashtag};
use crate::proposer::HashtagSuggestion;
use crate::scoring::{ConfidenceTier, PerformanceScores};

pub const TREE_BRANCH: char = '\u{251C}';
pub const TREE_END: char = '\u{2514}';
pub const TREE_HORIZ: char = '\u{2500}';

const VALUE_COLUMN: usize = 25;

pub fn dim() -> Style {
    Style::new().dim()
}

fn cyan() -> Style {
    Style::new().cyan()
}

fn green() -> Style {
    Style::new().green()
}

fn red() -> Style {
    Style::new().red()
}

fn yellow() -> Style {
    Style::new().yellow()
}

fn magenta() -> Style {
    Style::new().magenta()
}

fn bold() -> Style {
    Style::new().bold()
}

fn db_prefix() -> String {
    cyan().apply_to("[DB]").to_string()
}

fn oracle_prefix() -> String {
    yellow().apply_to("[ORACLE]").to_string()
}

fn analyze_prefix() -> String {
    magenta().apply_to("[ANALYZE]").to_string()
}

fn tree_branch() -> String {
    dim()
        .apply_to(format!("{}{}{} ", TREE_BRANCH, TREE_HORIZ, TREE_HORIZ))
        .to_string()
}

fn tree_end() -> String {
    dim()
        .apply_to(format!("{}{}{} ", TREE_END, TREE_HORIZ, TREE_HORIZ))
        .to_string()
}

pub fn pad_label(label: &str) -> String {
    let current_width = measure_text_width(label);
    if current_width < VALUE_COLUMN {
        format!("{}{}", label, " ".repeat(VALUE_COLUMN - current_width))
    } else {
        format!("{} ", label)
    }
}

fn score_style(score: i32) -> Style {
    if score >= 75 {
        green()
    } else if score >= 50 {
        yellow()
    } else {
        red()
    }
}

pub fn log_db_ready(database_url: &str) {
    println!(
        "{} store ready at {}.",
        db_prefix(),
        cyan().apply_to(database_url)
    );
}

pub fn log_db_error(msg: &str) {
    eprintln!("{} {}", red().apply_to("[DB]"), msg);
}

pub fn log_generic_error(prefix: &str, msg: &str) {
    eprintln!("{} {}", red().apply_to(prefix), msg);
}

pub fn log_oracle_status(available: bool, model: &str) {
    if available {
        println!(
            "{} {} is {}.",
            oracle_prefix(),
            model,
            green().apply_to("reachable")
        );
    } else {
        println!(
            "{} {} — falling back to deterministic suggestions.",
            oracle_prefix(),
            yellow().apply_to("unreachable")
        );
    }
}

pub fn log_analysis_header(platform: &str, text: &str) {
    println!(
        "{} scoring {} post ({} chars):",
        analyze_prefix(),
        bold().apply_to(platform),
        text.chars().count()
    );
    println!("{}", dim().apply_to(format!("  \"{}\"", text)));
    println!();
}

pub fn log_scores(scores: &PerformanceScores) {
    println!("{}", bold().apply_to("Performance prediction"));

    let rows = [
        ("content quality", scores.content_quality),
        ("hashtag strategy", scores.hashtag_strategy),
        ("timing relevance", scores.timing_relevance),
        ("data confidence", scores.data_confidence),
    ];
    for (label, value) in rows {
        println!(
            "{}{}{}",
            tree_branch(),
            pad_label(label),
            score_style(value).apply_to(value)
        );
    }

    let tier = ConfidenceTier::from_score(scores.data_confidence);
    println!(
        "{}{}{} {}",
        tree_end(),
        pad_label("engagement potential"),
        score_style(scores.engagement_potential)
            .apply_to(format!("{}", scores.engagement_potential)),
        dim().apply_to(format!("({tier} confidence)"))
    );
    println!();
}

pub fn log_suggestions(suggestions: &[HashtagSuggestion]) {
    println!("{}", bold().apply_to("Recommended hashtags"));

    let line: Vec<String> = suggestions.iter().map(|s| format!("#{}", s.tag)).collect();
    println!("  {}", cyan().apply_to(line.join(" ")));

    for (i, suggestion) in suggestions.iter().enumerate() {
        let connector = if i + 1 == suggestions.len() {
            tree_end()
        } else {
            tree_branch()
        };
        println!(
            "{}{}{}  {}",
            connector,
            pad_label(&format!("#{}", suggestion.tag)),
            score_style(suggestion.relevance).apply_to(format!("{:>3}", suggestion.relevance)),
            dim().apply_to(format!("{} — {}", suggestion.popularity, suggestion.reason))
        );
    }
    println!();
}

pub fn log_similar_posts(posts: &[SimilarPost]) {
    if posts.is_empty() {
        return;
    }
    println!("{}", bold().apply_to("Similar high performers"));
    for post in posts {
        println!(
            "{}{} {}",
            tree_branch(),
            green().apply_to(format!("{:.1}%", post.engagement_rate)),
            dim().apply_to(&post.content)
        );
    }
    println!();
}

pub fn log_insights(insights: &[String]) {
    println!("{}", bold().apply_to("Insights"));
    for (i, insight) in insights.iter().enumerate() {
        let connector = if i + 1 == insights.len() {
            tree_end()
        } else {
            tree_branch()
        };
        println!("{}{}", connector, insight);
    }
    println!();
}

pub fn log_prediction_saved(post_id: i32) {
    println!(
        "{} prediction saved as post {} — report real metrics later with `track {}`.",
        db_prefix(),
        bold().apply_to(post_id),
        post_id
    );
}

pub fn log_outcome_saved(post_id: i32, engagement_rate: f64) {
    println!(
        "{} outcome recorded for post {}: {} engagement.",
        db_prefix(),
        bold().apply_to(post_id),
        green().apply_to(format!("{:.2}%", engagement_rate))
    );
}

pub fn log_learning_overview(platform: &str, insights: &LearningInsights) {
    println!("{}", bold().apply_to(format!("Learning state for {platform}")));
    println!("{}{}{}", tree_branch(), pad_label("total posts"), insights.total_posts);
    println!(
        "{}{}{}",
        tree_branch(),
        pad_label("tracked posts"),
        insights.tracked_posts
    );
    println!(
        "{}{}{}",
        tree_branch(),
        pad_label("avg engagement"),
        format!("{:.2}%", insights.avg_engagement)
    );
    match &insights.best_hashtag {
        Some(best) => println!(
            "{}{}#{} ({:.1}% avg)",
            tree_branch(),
            pad_label("best hashtag"),
            best.tag,
            best.avg_engagement
        ),
        None => println!(
            "{}{}{}",
            tree_branch(),
            pad_label("best hashtag"),
            dim().apply_to("not enough data")
        ),
    }
    match insights.optimal_length {
        Some(len) => println!("{}{}~{} chars", tree_end(), pad_label("optimal length"), len),
        None => println!(
            "{}{}{}",
            tree_end(),
            pad_label("optimal length"),
            dim().apply_to("not enough data")
        ),
    }
    println!();
}

pub fn log_top_hashtags(platform: &str, top: &[TopHashtag]) {
    if top.is_empty() {
        println!(
            "{} no hashtag aggregates for {} yet — track some outcomes first.",
            db_prefix(),
            platform
        );
        return;
    }

    println!("{}", bold().apply_to(format!("Top hashtags for {platform}")));
    for (i, tag) in top.iter().enumerate() {
        let connector = if i + 1 == top.len() {
            tree_end()
        } else {
            tree_branch()
        };
        println!(
            "{}{}{} {}",
            connector,
            pad_label(&format!("#{}", tag.hashtag)),
            green().apply_to(format!("{:.2}% avg", tag.avg_engagement)),
            dim().apply_to(format!("({} uses)", tag.total_uses))
        );
    }
    println!();
}

pub fn log_store_stats(stats: &StoreStats) {
    println!("{}", bold().apply_to("Store statistics"));
    println!("{}{}{}", tree_branch(), pad_label("total posts"), stats.total_posts);
    for (platform, count) in &stats.posts_by_platform {
        println!(
            "{}{}{}",
            tree_branch(),
            pad_label(&format!("  {platform}")),
            count
        );
    }
    println!(
        "{}{}{}",
        tree_branch(),
        pad_label("tracked posts"),
        stats.tracked_posts
    );
    if let Some(avg) = stats.avg_engagement {
        println!(
            "{}{}{:.2}%",
            tree_branch(),
            pad_label("avg engagement"),
            avg
        );
    }
    if let Some((content, rate)) = &stats.best_post {
        let excerpt: String = content.chars().take(60).collect();
        println!(
            "{}{}{:.2}% {}",
            tree_branch(),
            pad_label("best post"),
            rate,
            dim().apply_to(format!("\"{}\"", excerpt))
        );
    }
    println!(
        "{}{}{}",
        tree_end(),
        pad_label("unique hashtags"),
        stats.unique_hashtags
    );

    if !stats.top_hashtags.is_empty() {
        println!();
        println!("{}", bold().apply_to("Top 5 hashtags"));
        for (i, tag) in stats.top_hashtags.iter().enumerate() {
            let connector = if i + 1 == stats.top_hashtags.len() {
                tree_end()
            } else {
                tree_branch()
            };
            println!(
                "{}{}{:.2}% avg ({} uses)",
                connector,
                pad_label(&format!("#{}", tag.hashtag)),
                tag.avg_engagement,
                tag.total_uses
            );
        }
    }
    println!();
}

pub fn log_import_row(row_num: usize, excerpt: &str, engagement_rate: f64) {
    let marker = if engagement_rate >= 3.0 {
        green().apply_to("strong").to_string()
    } else if engagement_rate >= 1.5 {
        yellow().apply_to("solid").to_string()
    } else {
        dim().apply_to("quiet").to_string()
    };
    println!(
        "{} row {}: {} ({:.2}% engagement, {})",
        db_prefix(),
        row_num,
        dim().apply_to(excerpt),
        engagement_rate,
        marker
    );
}

pub fn log_import_summary(imported: usize, skipped: usize, errors: &[String]) {
    println!();
    println!("{}", bold().apply_to("Import summary"));
    println!(
        "{}{}{}",
        tree_branch(),
        pad_label("imported"),
        green().apply_to(imported)
    );
    println!(
        "{}{}{}",
        tree_end(),
        pad_label("skipped"),
        if skipped > 0 {
            yellow().apply_to(skipped)
        } else {
            dim().apply_to(skipped)
        }
    );

    if !errors.is_empty() {
        println!();
        println!("{}", yellow().apply_to("Errors:"));
        for error in errors.iter().take(10) {
            println!("  - {error}");
        }
        if errors.len() > 10 {
            println!("  ... and {} more", errors.len() - 10);
        }
    }
}

pub fn log_success(msg: &str) {
    println!("{} {}", green().apply_to("[OK]"), msg);
}

pub fn log_warning(msg: &str) {
    println!("{} {}", yellow().apply_to("[WARN]"), msg);
}
