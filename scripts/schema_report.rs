#![allow(clippy::expect_used)]

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use serde::Serialize;
use similar::TextDiff;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};

/// Read-only schema inspector: summarises tables, foreign-key actions and
/// indexes, emits a normalized dump, and can gate CI against a baseline.
#[derive(Parser)]
#[command(name = "schema_report", about = "Inspect a rentdesk database schema")]
struct Args {
    /// Database path; falls back to DATABASE_URL / RENTDESK_DB, then the
    /// per-user data directory
    #[arg(long)]
    db: Option<PathBuf>,

    /// Emit the full report as JSON
    #[arg(long)]
    json: bool,

    /// Print the normalized schema dump instead of the summary
    #[arg(long)]
    dump: bool,

    /// Golden schema file to compare the live database against
    #[arg(long)]
    baseline: Option<PathBuf>,

    /// Rewrite the baseline from the live database
    #[arg(long)]
    update: bool,
}

#[derive(Serialize)]
struct ColumnReport {
    name: String,
    kind: String,
    notnull: bool,
    default: Option<String>,
    pk: bool,
}

#[derive(Serialize)]
struct ForeignKeyReport {
    from: String,
    table: String,
    to: String,
    on_delete: String,
}

#[derive(Serialize)]
struct IndexReport {
    name: String,
    unique: bool,
    columns: Vec<String>,
}

#[derive(Serialize)]
struct TableReport {
    name: String,
    columns: Vec<ColumnReport>,
    foreign_keys: Vec<ForeignKeyReport>,
    indexes: Vec<IndexReport>,
}

#[derive(Serialize)]
struct SchemaReport {
    fingerprint: String,
    tables: Vec<TableReport>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let db_path = args
        .db
        .clone()
        .or_else(rentdesk::db::database_path_from_env)
        .unwrap_or_else(rentdesk::db::default_db_path);

    let pool = open_pool(&db_path).await?;
    let dumped = load_dump(&pool).await?;

    if let Some(baseline) = &args.baseline {
        if args.update {
            fs::write(baseline, &dumped)
                .with_context(|| format!("write baseline {}", baseline.display()))?;
            println!("baseline updated");
            return Ok(());
        }
        let golden_raw = fs::read_to_string(baseline)
            .with_context(|| format!("read baseline {}", baseline.display()))?;
        let golden = normalize_lines(&golden_raw);
        if golden == dumped {
            println!("schema OK");
            return Ok(());
        }
        print!("{}", unified_diff(&golden, &dumped));
        return Err(anyhow!("schema mismatch"));
    }

    if args.dump {
        print!("{dumped}");
        return Ok(());
    }

    let report = load_report(&pool).await?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("fingerprint {}", report.fingerprint);
    for table in &report.tables {
        println!(
            "{} ({} columns, {} foreign keys, {} indexes)",
            table.name,
            table.columns.len(),
            table.foreign_keys.len(),
            table.indexes.len()
        );
        for fk in &table.foreign_keys {
            println!(
                "  fk {} -> {}.{} on_delete={}",
                fk.from, fk.table, fk.to, fk.on_delete
            );
        }
        for idx in &table.indexes {
            let marker = if idx.unique { " unique" } else { "" };
            println!("  idx{} {} ({})", marker, idx.name, idx.columns.join(", "));
        }
    }
    Ok(())
}

async fn open_pool(path: &Path) -> Result<SqlitePool> {
    if !path.exists() {
        return Err(anyhow!(
            "database not found at {} (run migrate first)",
            path.display()
        ));
    }
    let abs = path.canonicalize().context("canonicalize db path")?;
    let opts = SqliteConnectOptions::new().filename(&abs).read_only(true);
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(opts)
        .await
        .with_context(|| format!("open {} read-only", abs.display()))
}

async fn load_report(pool: &SqlitePool) -> Result<SchemaReport> {
    let fingerprint = rentdesk::db::schema_fingerprint(pool).await?;

    let names: Vec<String> = sqlx::query_scalar(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )
    .fetch_all(pool)
    .await?;

    let mut tables = Vec::with_capacity(names.len());
    for name in names {
        let columns = sqlx::query(&format!("SELECT * FROM pragma_table_info('{name}')"))
            .fetch_all(pool)
            .await?
            .into_iter()
            .map(|row| ColumnReport {
                name: row.get("name"),
                kind: row.get("type"),
                notnull: row.get::<i64, _>("notnull") != 0,
                default: row.try_get("dflt_value").ok().flatten(),
                pk: row.get::<i64, _>("pk") != 0,
            })
            .collect();

        let foreign_keys = sqlx::query(&format!("SELECT * FROM pragma_foreign_key_list('{name}')"))
            .fetch_all(pool)
            .await?
            .into_iter()
            .map(|row| ForeignKeyReport {
                from: row.get("from"),
                table: row.get("table"),
                to: row.try_get("to").ok().flatten().unwrap_or_else(|| "id".into()),
                on_delete: row.get("on_delete"),
            })
            .collect();

        let index_rows = sqlx::query(&format!("SELECT * FROM pragma_index_list('{name}')"))
            .fetch_all(pool)
            .await?;
        let mut indexes = Vec::new();
        for row in index_rows {
            let idx_name: String = row.get("name");
            if idx_name.starts_with("sqlite_autoindex") {
                continue;
            }
            let columns: Vec<String> =
                sqlx::query(&format!("SELECT * FROM pragma_index_info('{idx_name}')"))
                    .fetch_all(pool)
                    .await?
                    .into_iter()
                    .filter_map(|info| info.try_get::<Option<String>, _>("name").ok().flatten())
                    .collect();
            indexes.push(IndexReport {
                name: idx_name,
                unique: row.get::<i64, _>("unique") != 0,
                columns,
            });
        }

        tables.push(TableReport {
            name,
            columns,
            foreign_keys,
            indexes,
        });
    }

    Ok(SchemaReport {
        fingerprint,
        tables,
    })
}

/// Every schema object's DDL, one normalized statement per line, in the
/// same order the fingerprint hashes them.
async fn load_dump(pool: &SqlitePool) -> Result<String> {
    let stmts: Vec<String> = sqlx::query_scalar(
        "SELECT sql FROM sqlite_master\n         WHERE sql IS NOT NULL AND name NOT LIKE 'sqlite_%'\n         ORDER BY type, name",
    )
    .fetch_all(pool)
    .await?;

    let mut out = String::new();
    for stmt in stmts {
        let mut n = normalize_stmt(&stmt);
        if !n.ends_with(';') {
            n.push(';');
        }
        out.push_str(&n);
        out.push('\n');
    }
    Ok(out)
}

fn normalize_lines(input: &str) -> String {
    let mut out = String::new();
    for line in input.lines() {
        let mut n = normalize_stmt(line);
        if n.is_empty() {
            continue;
        }
        if !n.ends_with(';') {
            n.push(';');
        }
        out.push_str(&n);
        out.push('\n');
    }
    out
}

/// Collapses runs of whitespace outside quoted regions so formatting
/// differences never read as schema drift.
fn normalize_stmt(input: &str) -> String {
    #[derive(PartialEq)]
    enum State {
        Normal,
        InSingle,
        InDouble,
    }
    let mut out = String::new();
    let mut state = State::Normal;
    let mut chars = input.chars().peekable();
    let mut last_space = false;
    while let Some(c) = chars.next() {
        match state {
            State::Normal => match c {
                '\'' => {
                    state = State::InSingle;
                    out.push(c);
                    last_space = false;
                }
                '"' => {
                    state = State::InDouble;
                    out.push(c);
                    last_space = false;
                }
                c if c.is_ascii_whitespace() => {
                    if !last_space {
                        out.push(' ');
                        last_space = true;
                    }
                }
                _ => {
                    out.push(c);
                    last_space = false;
                }
            },
            State::InSingle => {
                out.push(c);
                if c == '\'' {
                    if chars.peek() == Some(&'\'') {
                        out.push(chars.next().expect("peeked quote"));
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::InDouble => {
                out.push(c);
                if c == '"' {
                    if chars.peek() == Some(&'"') {
                        out.push(chars.next().expect("peeked quote"));
                    } else {
                        state = State::Normal;
                    }
                }
            }
        }
    }
    out.trim().to_string()
}

fn unified_diff(old: &str, new: &str) -> String {
    let diff = TextDiff::from_lines(old, new);
    let mut buf: Vec<u8> = Vec::new();
    diff.unified_diff()
        .header("baseline", "database")
        .context_radius(3)
        .to_writer(&mut buf)
        .expect("write unified diff");
    String::from_utf8(buf).expect("utf8 diff")
}
