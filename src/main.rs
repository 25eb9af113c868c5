use anyhow::Result;
use hashtag_optimizer::analyzer;
use hashtag_optimizer::db::{self, configure_connection, establish_pool, OutcomeMetrics};
use hashtag_optimizer::error::StoreError;
use hashtag_optimizer::oracle::OracleClient;
use hashtag_optimizer::platform::Platform;
use hashtag_optimizer::settings::settings;
use hashtag_optimizer::utils::{
    log_analysis_header, log_db_ready, log_generic_error, log_insights, log_learning_overview,
    log_oracle_status, log_outcome_saved, log_prediction_saved, log_scores, log_similar_posts,
    log_suggestions, log_top_hashtags,
};
use std::env;
use std::process;
use std::str::FromStr;
use tracing::subscriber::set_global_default;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn print_usage() {
    eprintln!("Usage: hashtag-optimizer <command> [args]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  analyze <platform> <text...>                       Score a draft post and record the prediction");
    eprintln!("  track <post_id> <likes> <comments> <shares> <impressions>");
    eprintln!("                                                     Report observed metrics for a recorded post");
    eprintln!("  insights <platform>                                Show what the store has learned");
    eprintln!("  top <platform> [limit]                             Show the best tracked hashtags");
    eprintln!();
    eprintln!("Platforms: Twitter, Instagram");
}

fn parse_platform(arg: &str) -> Platform {
    match Platform::from_str(arg) {
        Ok(platform) => platform,
        Err(_) => {
            log_generic_error(
                "[ERROR]",
                &format!("unknown platform '{arg}', expected Twitter or Instagram"),
            );
            process::exit(1);
        }
    }
}

fn parse_number(arg: &str, label: &str) -> i32 {
    match arg.parse() {
        Ok(n) => n,
        Err(_) => {
            log_generic_error("[ERROR]", &format!("{label} must be a number, got '{arg}'"));
            process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let subscriber = tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive("hashtag_optimizer=info".parse()?))
        .with(
            fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        );
    set_global_default(subscriber).expect("Failed to set tracing subscriber");

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let database_url =
        env::var("DATABASE_URL").unwrap_or_else(|_| "hashtag_performance.db".to_string());
    let pool = establish_pool(&database_url);
    let mut conn = pool.get().expect("Failed to get initial connection");
    configure_connection(&mut conn).expect("Failed to configure SQLite connection");
    db::run_migrations(&mut conn);
    log_db_ready(&database_url);

    match args[1].as_str() {
        "analyze" => {
            if args.len() < 4 {
                print_usage();
                process::exit(1);
            }
            let platform = parse_platform(&args[2]);
            let text = args[3..].join(" ");

            let oracle = OracleClient::from_settings();
            log_oracle_status(oracle.available().await, &settings().oracle.model);
            log_analysis_header(&platform.to_string(), &text);

            let report = analyzer::analyze(&mut conn, &oracle, &text, platform).await?;

            log_scores(&report.scores);
            log_suggestions(&report.hashtags);
            log_similar_posts(&report.similar_posts);
            log_insights(&report.insights);
            log_prediction_saved(report.post_id);
        }
        "track" => {
            if args.len() != 7 {
                print_usage();
                process::exit(1);
            }
            let post_id = parse_number(&args[2], "post_id");
            let metrics = OutcomeMetrics {
                likes: parse_number(&args[3], "likes"),
                comments: parse_number(&args[4], "comments"),
                shares: parse_number(&args[5], "shares"),
                impressions: parse_number(&args[6], "impressions"),
            };

            match db::report_outcome(&mut conn, post_id, metrics) {
                Ok(rate) => log_outcome_saved(post_id, rate),
                Err(e @ (StoreError::InvalidMetrics | StoreError::PostNotFound(_))) => {
                    log_generic_error("[ERROR]", &e.to_string());
                    process::exit(1);
                }
                Err(e) => return Err(e.into()),
            }
        }
        "insights" => {
            if args.len() != 3 {
                print_usage();
                process::exit(1);
            }
            let platform = parse_platform(&args[2]);
            let insights = db::learning_insights(&mut conn, platform)?;
            log_learning_overview(&platform.to_string(), &insights);
        }
        "top" => {
            if args.len() < 3 {
                print_usage();
                process::exit(1);
            }
            let platform = parse_platform(&args[2]);
            let limit = args
                .get(3)
                .map(|l| parse_number(l, "limit") as usize)
                .unwrap_or(20);
            let top = db::top_hashtags(&mut conn, platform, limit)?;
            log_top_hashtags(&platform.to_string(), &top);
        }
        other => {
            log_generic_error("[ERROR]", &format!("unknown command '{other}'"));
            print_usage();
            process::exit(1);
        }
    }

    Ok(())
}
