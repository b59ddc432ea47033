//! Read-only store inspection.
//!
//! `fohs inspect` prints every table's schema and row count, then samples the
//! `scriptures` table grouped by translation (version tag). Narrower views:
//!
//! - `--bible M` lists the newest rows whose index mentions `M`;
//! - `--null-check` lists rows missing `text` or `fohs`;
//! - `--csv` writes the selected rows as CSV on stdout, minus `--skip` fields.
//!
//! Nothing here writes to the store. A failing count or sample is reported
//! and the report continues.

use anyhow::{Context, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Row, SqlitePool, ValueRef};
use std::collections::BTreeSet;
use std::io::Write;

use crate::config::Config;
use crate::migrate::{quote_ident, TABLE};
use crate::models::{ScriptureRecord, SCRIPTURE_FIELDS};
use crate::reference::version_tag;
use crate::store::{Order, RowFilter, Store};

const SAMPLE_ROWS: usize = 5;
const BIBLE_ROWS: usize = 1000;

/// Options of `fohs inspect`.
#[derive(Debug, Clone, Default)]
pub struct InspectArgs {
    pub bible: Option<String>,
    pub csv: bool,
    /// Fields omitted from CSV output.
    pub skip: Vec<String>,
    pub null_check: bool,
}

/// One row of `PRAGMA table_info`.
#[derive(Debug, Clone)]
pub struct ColumnInfo {
    pub name: String,
    pub col_type: String,
    pub not_null: bool,
    pub default: Option<String>,
    pub primary_key: bool,
}

pub async fn table_info(pool: &SqlitePool, table: &str) -> Result<Vec<ColumnInfo>, sqlx::Error> {
    let rows = sqlx::query(&format!("PRAGMA table_info({})", quote_ident(table)))
        .fetch_all(pool)
        .await?;

    Ok(rows
        .iter()
        .map(|r| ColumnInfo {
            name: r.get("name"),
            col_type: r.get("type"),
            not_null: r.get::<i64, _>("notnull") == 1,
            default: r.get("dflt_value"),
            primary_key: r.get::<i64, _>("pk") >= 1,
        })
        .collect())
}

/// CLI entry point for `fohs inspect`.
pub async fn run_inspect(config: &Config, args: &InspectArgs) -> Result<()> {
    let store = Store::open(&config.db.path)
        .await
        .with_context(|| format!("Could not open database: {}", config.db.path.display()))?;

    let result = if args.csv {
        let rows = selected_rows(&store, args).await?;
        let stdout = std::io::stdout();
        write_csv(&mut stdout.lock(), &rows, &args.skip)?;
        Ok(())
    } else if args.null_check {
        print_null_check(&store, args.bible.as_deref()).await
    } else if let Some(mnemonic) = &args.bible {
        print_bible_rows(&store, mnemonic).await
    } else {
        print_tables(&store).await
    };

    store.close().await;
    result
}

async fn selected_rows(store: &Store, args: &InspectArgs) -> Result<Vec<ScriptureRecord>> {
    let filter = match (&args.bible, args.null_check) {
        (bible, true) => RowFilter::Incomplete(bible.clone()),
        (Some(mnemonic), false) => RowFilter::Mentions(mnemonic.clone()),
        (None, false) => RowFilter::All,
    };
    Ok(store.scan(&filter, Order::IdAsc, None).await?)
}

async fn print_tables(store: &Store) -> Result<()> {
    println!("Inspecting SQLite DB: {}", store.path().display());
    println!("----------------------------------------");

    let tables = store.list_tables().await?;
    if tables.is_empty() {
        println!("No tables found.");
        return Ok(());
    }

    for table in &tables {
        println!();
        println!("=== Table: {} ===", table);

        println!();
        println!("--- Schema ---");
        match table_info(store.pool(), table).await {
            Ok(columns) => {
                for col in &columns {
                    println!("  Column: {}", col.name);
                    println!("    - Type: {}", col.col_type);
                    println!("    - Not Null: {}", yes_no(col.not_null));
                    println!(
                        "    - Default: {}",
                        col.default.as_deref().unwrap_or("(none)")
                    );
                    println!("    - Primary Key: {}", yes_no(col.primary_key));
                }
            }
            Err(e) => println!("Error reading schema: {}", e),
        }

        println!("--- Row Count ---");
        let count_sql = format!("SELECT COUNT(*) FROM {}", quote_ident(table));
        match sqlx::query_scalar::<_, i64>(&count_sql)
            .fetch_one(store.pool())
            .await
        {
            Ok(count) => println!("Total rows: {}", count),
            Err(e) => println!("Error counting rows: {}", e),
        }

        if table == TABLE {
            if let Err(e) = print_version_groups(store).await {
                println!("Error reading scriptureIndex samples: {}", e);
            }
        } else {
            print_row_window(store.pool(), table).await;
        }
    }

    Ok(())
}

/// Sample rows per version tag found in `scriptures`.
async fn print_version_groups(store: &Store) -> Result<()> {
    let indices = store.distinct_indices().await?;
    let tags: BTreeSet<&str> = indices.iter().filter_map(|i| version_tag(i)).collect();

    for tag in tags {
        let filter = RowFilter::VersionTag(tag.to_string());
        let count = store.count(&filter).await?;
        let keys = store.fohs_keys_for(tag).await?;

        println!();
        println!(
            "--- scriptureIndex type = {} ({} rows, {} sample rows) ---",
            tag, count, SAMPLE_ROWS
        );
        println!("FOHS Keys Found ({} types): {}", keys.len(), keys.join(", "));

        let samples = store.scan(&filter, Order::IdAsc, Some(SAMPLE_ROWS)).await?;
        if samples.is_empty() {
            println!("(no rows found for this type)");
        }
        for (i, r) in samples.iter().enumerate() {
            println!("Row {}: {}", i, format_record(r));
        }
    }

    Ok(())
}

async fn print_row_window(pool: &SqlitePool, table: &str) {
    println!("--- First {} rows ---", SAMPLE_ROWS);
    let sql = format!("SELECT * FROM {} LIMIT {}", quote_ident(table), SAMPLE_ROWS);
    match sqlx::query(&sql).fetch_all(pool).await {
        Ok(rows) if rows.is_empty() => println!("(no rows in this range)"),
        Ok(rows) => {
            for (i, row) in rows.iter().enumerate() {
                println!("Row {}: {}", i, format_generic_row(row));
            }
        }
        Err(e) => println!("Error reading rows: {}", e),
    }
}

async fn print_bible_rows(store: &Store, mnemonic: &str) -> Result<()> {
    let rows = store
        .scan(
            &RowFilter::Mentions(mnemonic.to_string()),
            Order::IdDesc,
            Some(BIBLE_ROWS),
        )
        .await?;

    if rows.is_empty() {
        println!("(no rows found with {})", mnemonic);
        return Ok(());
    }

    println!("ROWS for {}", mnemonic);
    for (i, r) in rows.iter().enumerate() {
        println!("Row {}: {}", i, format_record(r));
    }
    println!("{} ROWS", rows.len());
    Ok(())
}

async fn print_null_check(store: &Store, mnemonic: Option<&str>) -> Result<()> {
    let filter = RowFilter::Incomplete(mnemonic.map(str::to_string));
    let total = store.count(&RowFilter::All).await?;
    let incomplete = store.count(&filter).await?;

    println!("null-check {}", mnemonic.unwrap_or("(all translations)"));
    println!("  rows: {}", total);
    println!("  incomplete: {}", incomplete);

    let rows = store.scan(&filter, Order::IdAsc, Some(BIBLE_ROWS)).await?;
    for r in &rows {
        let mut missing = Vec::new();
        if crate::models::is_blank(r.text.as_deref()) {
            missing.push("text");
        }
        if crate::models::is_blank(r.fohs.as_deref()) {
            missing.push("fohs");
        }
        println!(
            "  [{}] {} {} missing {}",
            r.id,
            r.scripture_index,
            r.fohs_key,
            missing.join("+")
        );
    }
    Ok(())
}

fn yes_no(b: bool) -> &'static str {
    if b {
        "YES"
    } else {
        "NO"
    }
}

fn format_record(r: &ScriptureRecord) -> String {
    format!(
        "{{id: {}, scriptureIndex: {:?}, fohsKey: {:?}, fohs: {:?}, text: {:?}, languageKey: {:?}}}",
        r.id, r.scripture_index, r.fohs_key, r.fohs, r.text, r.language_key
    )
}

fn format_generic_row(row: &SqliteRow) -> String {
    let fields: Vec<String> = row
        .columns()
        .iter()
        .enumerate()
        .map(|(i, col)| format!("{}: {}", col.name(), render_value(row, i)))
        .collect();
    format!("{{{}}}", fields.join(", "))
}

fn render_value(row: &SqliteRow, i: usize) -> String {
    match row.try_get_raw(i) {
        Ok(raw) if raw.is_null() => return "NULL".to_string(),
        Ok(_) => {}
        Err(e) => return format!("<{}>", e),
    }
    if let Ok(v) = row.try_get::<i64, _>(i) {
        return v.to_string();
    }
    if let Ok(v) = row.try_get::<f64, _>(i) {
        return v.to_string();
    }
    if let Ok(v) = row.try_get::<String, _>(i) {
        return format!("{:?}", v);
    }
    if let Ok(v) = row.try_get::<Vec<u8>, _>(i) {
        return format!("<{} bytes>", v.len());
    }
    "?".to_string()
}

/// Write rows as RFC 4180 CSV with a header line.
pub fn write_csv<W: Write>(out: &mut W, rows: &[ScriptureRecord], skip: &[String]) -> Result<()> {
    let fields: Vec<&str> = SCRIPTURE_FIELDS
        .iter()
        .copied()
        .filter(|f| !skip.iter().any(|s| s == f))
        .collect();

    writeln!(out, "{}", fields.join(","))?;
    for r in rows {
        let line: Vec<String> = fields
            .iter()
            .map(|f| csv_field(r.field(f).as_deref().unwrap_or("")))
            .collect();
        writeln!(out, "{}", line.join(","))?;
    }
    out.flush()?;
    Ok(())
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
