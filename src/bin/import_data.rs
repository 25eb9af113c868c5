use chrono::{NaiveDate, Utc};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use hashtag_optimizer::db::{self, ImportedPost, OutcomeMetrics};
use hashtag_optimizer::platform::Platform;
use hashtag_optimizer::utils::{
    log_db_ready, log_generic_error, log_import_row, log_import_summary, log_success,
};
use regex::Regex;
use std::collections::HashMap;
use std::env;
use std::fs;
use std::process;
use std::str::FromStr;
use std::sync::LazyLock;

const REQUIRED_FIELDS: &[&str] = &[
    "platform",
    "content",
    "likes",
    "comments",
    "shares",
    "impressions",
];

/// Emoji subset the baseline estimator counts as an engagement element.
const BASELINE_EMOJI: &[char] = &['😊', '🔥', '💯', '❤', '👍', '🎉'];

static INLINE_HASHTAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"#(\w+)").unwrap());

const SAMPLE_CSV: &str = r#"platform,content,likes,comments,shares,impressions,hashtags,date
Twitter,"Just launched our new product! Check it out 🚀 #startup #innovation #tech",45,8,12,2500,"startup,innovation,tech",2025-09-15
Instagram,"Behind the scenes of our creative process. Swipe to see the journey! 📸 #behindthescenes #creative #process",230,15,20,5800,"behindthescenes,creative,process,photography",2025-09-16
Twitter,"Hot take: AI will transform content creation in ways we can't imagine yet 🤖",89,25,18,3200,"AI,contentcreation,future",2025-09-17
Instagram,"New blog post is live! Link in bio. Sharing our top tips for social media growth 📈 #socialmedia #marketing #tips",180,12,15,4200,"socialmedia,marketing,tips,growth,contentmarketing",2025-09-18
Twitter,"Question for my followers: What's your biggest challenge with content creation? 🤔",35,42,8,1800,"content,question,community",2025-09-19
"#;

fn print_usage() {
    eprintln!("Usage: import-data <csv_file>");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  import-data sample     Create sample_import.csv for reference");
    eprintln!("  import-data data.csv   Import historical rows from data.csv");
    eprintln!();
    eprintln!("CSV format:");
    eprintln!("  platform,content,likes,comments,shares,impressions[,hashtags][,date]");
}

/// Minimal CSV reader: comma separators, double-quoted fields, doubled
/// quotes as escapes, newlines allowed inside quoted fields. Plenty for the
/// import contract; anything fancier belongs in the producing tool.
fn parse_csv(input: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' => {
                    if chars.peek() == Some(&'"') {
                        chars.next();
                        field.push('"');
                    } else {
                        in_quotes = false;
                    }
                }
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' => in_quotes = true,
            ',' => record.push(std::mem::take(&mut field)),
            '\r' => {}
            '\n' => {
                record.push(std::mem::take(&mut field));
                if record.len() > 1 || !record[0].is_empty() {
                    records.push(std::mem::take(&mut record));
                } else {
                    record.clear();
                }
            }
            _ => field.push(c),
        }
    }

    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }

    records
}

fn extract_inline_hashtags(content: &str) -> Vec<String> {
    INLINE_HASHTAG
        .captures_iter(content)
        .map(|c| c[1].to_string())
        .collect()
}

/// What a heuristics-only model would have predicted for this post, recorded
/// so imported rows fit the same shape as live predictions.
fn estimate_baseline_score(content: &str, platform: Platform, num_hashtags: usize) -> i32 {
    let mut score = 60;
    let length = content.chars().count();

    let (lo, hi) = platform.canonical_length_range();
    if (lo..=hi).contains(&length) {
        score += 15;
    }

    let (band_lo, band_hi) = platform.ideal_hashtag_range();
    if (band_lo..=band_hi).contains(&num_hashtags) {
        score += 10;
    }

    if content.contains('?') {
        score += 5;
    }
    if content.chars().any(|c| BASELINE_EMOJI.contains(&c)) {
        score += 5;
    }

    score.min(100)
}

struct HeaderMap(HashMap<String, usize>);

impl HeaderMap {
    fn new(header: &[String]) -> Self {
        Self(
            header
                .iter()
                .enumerate()
                .map(|(i, name)| (name.trim().to_string(), i))
                .collect(),
        )
    }

    fn missing_required(&self) -> Vec<&'static str> {
        REQUIRED_FIELDS
            .iter()
            .filter(|f| !self.0.contains_key(**f))
            .copied()
            .collect()
    }

    fn get<'a>(&self, record: &'a [String], field: &str) -> Option<&'a str> {
        self.0
            .get(field)
            .and_then(|&i| record.get(i))
            .map(String::as_str)
    }
}

fn parse_row(header: &HeaderMap, record: &[String]) -> Result<ImportedPost, String> {
    let platform_raw = header.get(record, "platform").unwrap_or("").trim();
    let platform = Platform::from_str(platform_raw).map_err(|_| {
        format!("Platform must be 'Twitter' or 'Instagram', got '{platform_raw}'")
    })?;

    let content = header.get(record, "content").unwrap_or("").trim().to_string();
    if content.is_empty() {
        return Err("Content cannot be empty".to_string());
    }

    let parse_metric = |field: &str| -> Result<i32, String> {
        header
            .get(record, field)
            .unwrap_or("")
            .trim()
            .parse()
            .map_err(|_| "Likes, comments, shares, and impressions must be numbers".to_string())
    };
    let metrics = OutcomeMetrics {
        likes: parse_metric("likes")?,
        comments: parse_metric("comments")?,
        shares: parse_metric("shares")?,
        impressions: parse_metric("impressions")?,
    };
    if metrics.impressions <= 0 {
        return Err("Impressions must be greater than 0".to_string());
    }

    let mut hashtags = extract_inline_hashtags(&content);
    if let Some(column) = header.get(record, "hashtags") {
        hashtags.extend(
            column
                .split(',')
                .map(|t| t.trim().trim_start_matches('#').to_string())
                .filter(|t| !t.is_empty()),
        );
    }
    let mut seen = std::collections::HashSet::new();
    hashtags.retain(|t| seen.insert(t.clone()));

    let created_at = header
        .get(record, "date")
        .and_then(|d| NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d").ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or_else(|| Utc::now().timestamp());

    let predicted_score = estimate_baseline_score(&content, platform, hashtags.len());

    Ok(ImportedPost {
        platform,
        content,
        hashtags,
        metrics,
        predicted_score,
        created_at,
    })
}

fn import_file(conn: &mut SqliteConnection, csv_file: &str) -> Result<(), String> {
    let input = fs::read_to_string(csv_file)
        .map_err(|e| format!("Could not read '{csv_file}': {e}"))?;

    let records = parse_csv(&input);
    let Some((header_record, rows)) = records.split_first() else {
        return Err(format!("'{csv_file}' is empty"));
    };

    let header = HeaderMap::new(header_record);
    let missing = header.missing_required();
    if !missing.is_empty() {
        return Err(format!(
            "CSV must have these columns: {} (missing: {})",
            REQUIRED_FIELDS.join(", "),
            missing.join(", ")
        ));
    }

    let mut imported = 0;
    let mut errors: Vec<String> = Vec::new();

    for (i, record) in rows.iter().enumerate() {
        let row_num = i + 1;
        match parse_row(&header, record) {
            Ok(post) => {
                let rate = post.metrics.engagement_rate();
                match db::record_historical_post(conn, &post) {
                    Ok(_) => {
                        let excerpt: String = post.content.chars().take(50).collect();
                        log_import_row(row_num, &excerpt, rate);
                        imported += 1;
                    }
                    Err(e) => errors.push(format!("Row {row_num}: {e}")),
                }
            }
            Err(reason) => errors.push(format!("Row {row_num}: {reason}")),
        }
    }

    log_import_summary(imported, errors.len(), &errors);
    if imported > 0 {
        log_success("Import complete. Learned aggregates are up to date.");
    }
    Ok(())
}

fn main() {
    dotenvy::dotenv().ok();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    if args[1] == "sample" {
        if let Err(e) = fs::write("sample_import.csv", SAMPLE_CSV) {
            log_generic_error("[ERROR]", &format!("Could not write sample: {e}"));
            process::exit(1);
        }
        log_success("Created sample_import.csv — edit it, then run: import-data sample_import.csv");
        process::exit(0);
    }

    let database_url =
        env::var("DATABASE_URL").unwrap_or_else(|_| "hashtag_performance.db".to_string());
    let mut conn = SqliteConnection::establish(&database_url)
        .unwrap_or_else(|e| {
            log_generic_error("[ERROR]", &format!("Could not open store: {e}"));
            process::exit(1);
        });
    db::configure_connection(&mut conn).expect("Failed to configure SQLite connection");
    db::run_migrations(&mut conn);
    log_db_ready(&database_url);

    if let Err(e) = import_file(&mut conn, &args[1]) {
        log_generic_error("[ERROR]", &e);
        process::exit(1);
    }
}
