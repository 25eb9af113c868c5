use chrono::{DateTime, Local, Utc};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use hashtag_optimizer::db;
use hashtag_optimizer::settings::settings;
use hashtag_optimizer::utils::{log_generic_error, log_store_stats, log_success, log_warning};
use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;

fn print_usage() {
    eprintln!("Usage: manage-db <command>");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  backup              Create a timestamped backup of the store");
    eprintln!("  list                List available backups");
    eprintln!("  restore <file>      Restore from a backup (backs up the live store first)");
    eprintln!("  stats               Show store statistics");
    eprintln!("  clean [days]        Delete untracked predictions older than N days (default 30)");
    eprintln!("  export [file]       Export the store to CSV (default export_data.csv)");
    eprintln!("  vacuum              Reclaim unused space");
}

fn database_path() -> PathBuf {
    PathBuf::from(
        env::var("DATABASE_URL").unwrap_or_else(|_| "hashtag_performance.db".to_string()),
    )
}

fn file_size_mb(path: &Path) -> f64 {
    fs::metadata(path)
        .map(|m| m.len() as f64 / (1024.0 * 1024.0))
        .unwrap_or(0.0)
}

fn backup_stem(db_path: &Path) -> String {
    db_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("hashtag_performance")
        .to_string()
}

fn backup_database(db_path: &Path, backup_dir: &Path) -> Result<PathBuf, String> {
    if !db_path.exists() {
        return Err(format!("Database not found: {}", db_path.display()));
    }

    fs::create_dir_all(backup_dir)
        .map_err(|e| format!("Could not create {}: {e}", backup_dir.display()))?;

    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let backup_path = backup_dir.join(format!("{}_{timestamp}.db", backup_stem(db_path)));

    fs::copy(db_path, &backup_path).map_err(|e| format!("Backup failed: {e}"))?;
    Ok(backup_path)
}

fn list_backups(db_path: &Path, backup_dir: &Path) -> Vec<PathBuf> {
    let prefix = format!("{}_", backup_stem(db_path));
    let mut backups: Vec<PathBuf> = fs::read_dir(backup_dir)
        .map(|entries| {
            entries
                .flatten()
                .map(|e| e.path())
                .filter(|p| {
                    p.extension().is_some_and(|ext| ext == "db")
                        && p.file_name()
                            .and_then(|n| n.to_str())
                            .is_some_and(|n| n.starts_with(&prefix))
                })
                .collect()
        })
        .unwrap_or_default();
    backups.sort();
    backups.reverse();
    backups
}

fn restore_database(db_path: &Path, backup_file: &Path, backup_dir: &Path) -> Result<(), String> {
    if !backup_file.exists() {
        return Err(format!("Backup file not found: {}", backup_file.display()));
    }

    if db_path.exists() {
        let safety = backup_database(db_path, backup_dir)?;
        log_warning(&format!(
            "Backed up current database to {}",
            safety.display()
        ));
    }

    fs::copy(backup_file, db_path).map_err(|e| format!("Restore failed: {e}"))?;
    Ok(())
}

fn csv_escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn export_csv(conn: &mut SqliteConnection, output_file: &str) -> Result<usize, String> {
    let rows = db::export_rows(conn).map_err(|e| format!("Export query failed: {e}"))?;

    let mut out = String::from(
        "ID,Platform,Content,Date,Predicted Score,Likes,Comments,Shares,Impressions,Engagement Rate,Hashtags\n",
    );
    for row in &rows {
        let date = DateTime::<Utc>::from_timestamp(row.post.created_at, 0)
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default();
        let (likes, comments, shares, impressions, rate) = match &row.outcome {
            Some(o) => (
                o.likes.to_string(),
                o.comments.to_string(),
                o.shares.to_string(),
                o.impressions.to_string(),
                format!("{:.4}", o.engagement_rate),
            ),
            None => Default::default(),
        };
        out.push_str(&format!(
            "{},{},{},{},{},{},{},{},{},{},{}\n",
            row.post.id,
            csv_escape(&row.post.platform),
            csv_escape(&row.post.content),
            date,
            row.post.predicted_score,
            likes,
            comments,
            shares,
            impressions,
            rate,
            csv_escape(&row.hashtags),
        ));
    }

    fs::write(output_file, out).map_err(|e| format!("Could not write '{output_file}': {e}"))?;
    Ok(rows.len())
}

fn open_store(db_path: &Path) -> SqliteConnection {
    let mut conn = SqliteConnection::establish(&db_path.display().to_string())
        .unwrap_or_else(|e| {
            log_generic_error("[ERROR]", &format!("Could not open store: {e}"));
            process::exit(1);
        });
    db::configure_connection(&mut conn).expect("Failed to configure SQLite connection");
    db::run_migrations(&mut conn);
    conn
}

fn confirm(prompt: &str) -> bool {
    print!("{prompt}");
    io::stdout().flush().ok();
    let mut answer = String::new();
    if io::stdin().read_line(&mut answer).is_err() {
        return false;
    }
    answer.trim().eq_ignore_ascii_case("yes")
}

fn main() {
    dotenvy::dotenv().ok();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let db_path = database_path();
    let backup_dir = PathBuf::from(&settings().maintenance.backup_dir);

    match args[1].as_str() {
        "backup" => match backup_database(&db_path, &backup_dir) {
            Ok(path) => {
                log_success(&format!(
                    "Backup created: {} ({:.2} MB)",
                    path.display(),
                    file_size_mb(&path)
                ));
            }
            Err(e) => {
                log_generic_error("[ERROR]", &e);
                process::exit(1);
            }
        },
        "list" => {
            let backups = list_backups(&db_path, &backup_dir);
            if backups.is_empty() {
                println!("No backups found in {}", backup_dir.display());
                return;
            }
            println!("Available backups:");
            for (i, backup) in backups.iter().enumerate() {
                let modified = fs::metadata(backup)
                    .and_then(|m| m.modified())
                    .map(|t| DateTime::<Local>::from(t).format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_default();
                println!(
                    "{}. {} ({:.2} MB, {})",
                    i + 1,
                    backup.display(),
                    file_size_mb(backup),
                    modified
                );
            }
        }
        "restore" => {
            if args.len() < 3 {
                log_generic_error("[ERROR]", "Please specify a backup file (see `manage-db list`)");
                process::exit(1);
            }
            match restore_database(&db_path, Path::new(&args[2]), &backup_dir) {
                Ok(()) => log_success(&format!("Database restored from {}", args[2])),
                Err(e) => {
                    log_generic_error("[ERROR]", &e);
                    process::exit(1);
                }
            }
        }
        "stats" => {
            if !db_path.exists() {
                log_generic_error(
                    "[ERROR]",
                    &format!("Database not found: {}", db_path.display()),
                );
                process::exit(1);
            }
            let mut conn = open_store(&db_path);
            match db::store_stats(&mut conn) {
                Ok(stats) => {
                    log_store_stats(&stats);
                    println!("Database size: {:.2} MB", file_size_mb(&db_path));
                }
                Err(e) => {
                    log_generic_error("[ERROR]", &format!("Stats query failed: {e}"));
                    process::exit(1);
                }
            }
        }
        "clean" => {
            let days: i64 = args
                .get(2)
                .and_then(|d| d.parse().ok())
                .unwrap_or(settings().maintenance.clean_after_days);
            let cutoff = Utc::now().timestamp() - days * 86_400;

            let mut conn = open_store(&db_path);
            let count = db::count_untracked_posts(&mut conn, cutoff).unwrap_or(0);
            if count == 0 {
                println!("No untracked predictions older than {days} days.");
                return;
            }

            log_warning(&format!(
                "Found {count} predictions older than {days} days without tracking"
            ));
            if !confirm("Delete these predictions? (yes/no): ") {
                println!("Cleanup cancelled.");
                return;
            }

            match db::clean_untracked_posts(&mut conn, cutoff) {
                Ok(deleted) => log_success(&format!("Cleaned {deleted} old predictions")),
                Err(e) => {
                    log_generic_error("[ERROR]", &format!("Cleanup failed: {e}"));
                    process::exit(1);
                }
            }
        }
        "export" => {
            let output_file = args
                .get(2)
                .cloned()
                .unwrap_or_else(|| "export_data.csv".to_string());
            let mut conn = open_store(&db_path);
            match export_csv(&mut conn, &output_file) {
                Ok(count) => log_success(&format!("Exported {count} posts to {output_file}")),
                Err(e) => {
                    log_generic_error("[ERROR]", &e);
                    process::exit(1);
                }
            }
        }
        "vacuum" => {
            let before = file_size_mb(&db_path);
            let mut conn = open_store(&db_path);
            match db::vacuum(&mut conn) {
                Ok(()) => {
                    let after = file_size_mb(&db_path);
                    log_success(&format!(
                        "Vacuum done: {before:.2} MB -> {after:.2} MB (saved {:.2} MB)",
                        before - after
                    ));
                }
                Err(e) => {
                    log_generic_error("[ERROR]", &format!("Vacuum failed: {e}"));
                    process::exit(1);
                }
            }
        }
        other => {
            log_generic_error("[ERROR]", &format!("Unknown command: {other}"));
            print_usage();
            process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hashtag_optimizer::db::OutcomeMetrics;
    use hashtag_optimizer::platform::Platform;

    #[test]
    fn test_backup_and_restore_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("perf.db");
        let backup_dir = dir.path().join("backups");
        fs::write(&db_path, b"original bytes").unwrap();

        let backup = backup_database(&db_path, &backup_dir).unwrap();
        assert!(backup.exists());
        assert!(backup
            .file_name()
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("perf_"));

        fs::write(&db_path, b"changed bytes").unwrap();
        restore_database(&db_path, &backup, &backup_dir).unwrap();
        assert_eq!(fs::read(&db_path).unwrap(), b"original bytes");

        // Restoring also backed up the "changed" copy first.
        assert!(list_backups(&db_path, &backup_dir).len() >= 2);
    }

    #[test]
    fn test_backup_missing_database() {
        let dir = tempfile::tempdir().unwrap();
        let err = backup_database(&dir.path().join("absent.db"), dir.path()).unwrap_err();
        assert!(err.contains("Database not found"));
    }

    #[test]
    fn test_csv_escape() {
        assert_eq!(csv_escape("plain"), "plain");
        assert_eq!(csv_escape("a,b"), "\"a,b\"");
        assert_eq!(csv_escape("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_export_csv_writes_all_posts() {
        let dir = tempfile::tempdir().unwrap();
        let out_path = dir.path().join("export.csv");

        let mut conn = SqliteConnection::establish(":memory:").unwrap();
        db::run_migrations(&mut conn);

        let id = db::record_prediction(
            &mut conn,
            Platform::Twitter,
            "exported, with a comma",
            &[("alpha".to_string(), 85)],
            70,
        )
        .unwrap();
        db::report_outcome(
            &mut conn,
            id,
            OutcomeMetrics {
                likes: 5,
                comments: 1,
                shares: 1,
                impressions: 200,
            },
        )
        .unwrap();

        let count = export_csv(&mut conn, out_path.to_str().unwrap()).unwrap();
        assert_eq!(count, 1);

        let written = fs::read_to_string(&out_path).unwrap();
        let mut lines = written.lines();
        assert!(lines.next().unwrap().starts_with("ID,Platform,Content"));
        let row = lines.next().unwrap();
        assert!(row.contains("\"exported, with a comma\""));
        assert!(row.contains("3.5000"));
        assert!(row.contains("alpha"));
    }
}
