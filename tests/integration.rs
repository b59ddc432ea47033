use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

use fohs_verse::db::{self, OpenMode};
use fohs_verse::models::NewScripture;
use fohs_verse::store::Store;

fn fohs_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("fohs");
    path
}

const BASELINE: &[(&str, &str, &str, &str)] = &[
    (
        "(John 3:16 WEBUS)",
        "LOVE",
        "Love",
        "For God so loved the world, that he gave his only born Son.",
    ),
    (
        "(Galatians 5:22-23 WEBUS)",
        "JOY",
        "Joy",
        "But the fruit of the Spirit is love, joy, peace, patience.",
    ),
    (
        "(1 John 4:8 WEBUS)",
        "LOVE",
        "Love",
        "He who doesn't love doesn't know God, for God is love.",
    ),
];

fn setup_test_env() -> (TempDir, PathBuf, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let db_path = root.join("data").join("fohs.sqlite");

    let config_content = format!(
        r#"[db]
path = "{}"

[reconcile]
baseline_version = "WEBUS"
insert_cap = 400

[[bibles]]
mnemonic = "WEBUS"
language = "ENGLISH"

[[bibles]]
mnemonic = "FSPAN"
language = "SPANISH"
bible_id = "482ddd53705278cc-01"
recs_to_process = 2300

[books.SPANISH]
"John" = "Juan"
"Galatians" = "Gálatas"
"1 John" = "1 Juan"

[fohs_labels.SPANISH]
LOVE = "Amor"
JOY = "Gozo"
"#,
        db_path.display()
    );

    let config_path = config_dir.join("fohs.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path, db_path)
}

fn block_on<F: std::future::Future>(fut: F) -> F::Output {
    tokio::runtime::Runtime::new().unwrap().block_on(fut)
}

fn seed(db_path: &Path, rows: &[(&str, &str, &str, &str)]) {
    block_on(async {
        let store = Store::create(db_path).await.unwrap();
        for (index, key, fohs, text) in rows {
            store
                .insert(&NewScripture {
                    scripture_index: index.to_string(),
                    fohs_key: key.to_string(),
                    fohs: fohs.to_string(),
                    text: text.to_string(),
                })
                .await
                .unwrap();
        }
        store.close().await;
    });
}

/// A store from before the `languageKey` column existed.
fn seed_legacy(db_path: &Path, rows: &[(&str, &str, &str, &str)]) {
    block_on(async {
        let pool = db::connect(db_path, OpenMode::Create).await.unwrap();
        sqlx::query(
            "CREATE TABLE scriptures (id INTEGER PRIMARY KEY AUTOINCREMENT, \
             scriptureIndex TEXT NOT NULL, fohsKey TEXT NOT NULL, fohs TEXT, text TEXT)",
        )
        .execute(&pool)
        .await
        .unwrap();
        for (index, key, fohs, text) in rows {
            sqlx::query(
                "INSERT INTO scriptures (scriptureIndex, fohsKey, fohs, text) VALUES (?, ?, ?, ?)",
            )
            .bind(*index)
            .bind(*key)
            .bind(*fohs)
            .bind(*text)
            .execute(&pool)
            .await
            .unwrap();
        }
        pool.close().await;
    });
}

fn count_rows(db_path: &Path, sql: &str) -> i64 {
    block_on(async {
        let pool = db::connect(db_path, OpenMode::ReadOnly).await.unwrap();
        let n = sqlx::query_scalar::<_, i64>(sql)
            .fetch_one(&pool)
            .await
            .unwrap();
        pool.close().await;
        n
    })
}

fn run_fohs(config_path: &Path, args: &[&str]) -> (String, String, bool, Option<i32>) {
    let binary = fohs_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run fohs binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success(), output.status.code())
}

#[test]
fn test_init_creates_database() {
    let (_tmp, config_path, db_path) = setup_test_env();

    let (stdout, stderr, success, _) = run_fohs(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
    assert!(db_path.is_file());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path, db_path) = setup_test_env();

    let (_, _, success1, _) = run_fohs(&config_path, &["init"]);
    assert!(success1, "First init failed");
    seed(&db_path, &BASELINE[..1]);

    let (_, _, success2, _) = run_fohs(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
    assert_eq!(count_rows(&db_path, "SELECT COUNT(*) FROM scriptures"), 1);
}

#[test]
fn test_init_without_config_file_uses_db_flag() {
    let tmp = TempDir::new().unwrap();
    let db_path = tmp.path().join("only.sqlite");
    let missing_config = tmp.path().join("nope.toml");

    let (stdout, stderr, success, _) = run_fohs(
        &missing_config,
        &["--db", db_path.to_str().unwrap(), "init"],
    );
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(db_path.is_file());
}

#[test]
fn test_missing_database_exits_1() {
    let (_tmp, config_path, _db_path) = setup_test_env();

    let (stdout, _, success, code) = run_fohs(&config_path, &["inspect"]);
    assert!(!success);
    assert_eq!(code, Some(1));
    assert!(stdout.contains("Error"), "stdout: {}", stdout);
}

#[test]
fn test_missing_required_argument_exits_1() {
    let (_tmp, config_path, _db_path) = setup_test_env();

    let (_, stderr, success, code) = run_fohs(&config_path, &["reconcile"]);
    assert!(!success);
    assert_eq!(code, Some(1));
    assert!(stderr.contains("--bible"), "stderr: {}", stderr);
}

#[test]
fn test_rebuild_conflicts_with_translate() {
    let (_tmp, config_path, _db_path) = setup_test_env();

    let (_, _, success, code) = run_fohs(
        &config_path,
        &[
            "reconcile",
            "--bible",
            "FSPAN",
            "--insert",
            "--translate",
            "--rebuild-db",
            "/tmp/x.sqlite",
        ],
    );
    assert!(!success);
    assert_eq!(code, Some(1));
}

#[test]
fn test_inspect_reports_tables_and_versions() {
    let (_tmp, config_path, db_path) = setup_test_env();
    seed(&db_path, BASELINE);

    let (stdout, stderr, success, _) = run_fohs(&config_path, &["inspect"]);
    assert!(success, "inspect failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("=== Table: scriptures ==="));
    assert!(stdout.contains("Column: scriptureIndex"));
    assert!(stdout.contains("Total rows: 3"));
    assert!(stdout.contains("scriptureIndex type = WEBUS (3 rows"));
    assert!(stdout.contains("FOHS Keys Found (2 types): JOY, LOVE"));
}

#[test]
fn test_inspect_csv_with_skip() {
    let (_tmp, config_path, db_path) = setup_test_env();
    seed(&db_path, BASELINE);

    let (stdout, stderr, success, _) = run_fohs(
        &config_path,
        &["inspect", "--bible", "WEBUS", "--csv", "--skip", "id:languageKey"],
    );
    assert!(success, "inspect failed: stdout={}, stderr={}", stdout, stderr);

    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines[0], "scriptureIndex,fohsKey,fohs,text");
    assert_eq!(lines.len(), 4);
    assert!(lines[1].starts_with("(John 3:16 WEBUS),LOVE,Love,\"For God so loved the world,"));
}

#[test]
fn test_inspect_null_check() {
    let (_tmp, config_path, db_path) = setup_test_env();
    seed(&db_path, BASELINE);
    seed(&db_path, &[("(John 3:16 FSPAN)", "LOVE", "Amor", "  ")]);

    let (stdout, _, success, _) = run_fohs(&config_path, &["inspect", "--null-check"]);
    assert!(success);
    assert!(stdout.contains("incomplete: 1"));
    assert!(stdout.contains("(John 3:16 FSPAN) LOVE missing text"));
}

#[test]
fn test_migrate_adds_and_fills_language_key() {
    let (_tmp, config_path, db_path) = setup_test_env();
    seed_legacy(
        &db_path,
        &[
            ("(John 3:16 FSPAN)", "LOVE", "Amor", "Porque de tal manera amó Dios"),
            ("(John 3:16 WEBUS)", "LOVE", "Love", "For God so loved the world"),
            ("(John 3:16 XXXX)", "LOVE", "Love", "unknown bible"),
        ],
    );

    let (stdout, stderr, success, _) = run_fohs(&config_path, &["migrate"]);
    assert!(success, "migrate failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("added column: languageKey"));
    assert!(stdout.contains("rows scanned: 3"));
    assert!(stdout.contains("rows updated: 2"));
    assert!(stdout.contains("rows skipped: 1"));

    assert_eq!(
        count_rows(
            &db_path,
            "SELECT COUNT(*) FROM scriptures WHERE languageKey = '(Juan 3:16 FSPAN)'"
        ),
        1
    );
    assert_eq!(
        count_rows(
            &db_path,
            "SELECT COUNT(*) FROM scriptures WHERE languageKey = '(John 3:16 WEBUS)'"
        ),
        1
    );
}

#[test]
fn test_migrate_idempotent() {
    let (_tmp, config_path, db_path) = setup_test_env();
    seed_legacy(&db_path, &[("(John 3:16 FSPAN)", "LOVE", "Amor", "Porque")]);

    let (_, _, success1, _) = run_fohs(&config_path, &["migrate"]);
    assert!(success1);

    let (stdout, _, success2, _) = run_fohs(&config_path, &["migrate"]);
    assert!(success2);
    assert!(stdout.contains("column languageKey already exists"));
    assert!(stdout.contains("rows scanned: 0"));
}

#[test]
fn test_reconcile_dry_run_writes_nothing() {
    let (_tmp, config_path, db_path) = setup_test_env();
    seed(&db_path, BASELINE);
    seed(
        &db_path,
        &[("(John 3:16 FSPAN)", "LOVE", "Amor", "Porque de tal manera amó Dios")],
    );

    let (stdout, stderr, success, _) = run_fohs(
        &config_path,
        &["reconcile", "--bible", "FSPAN", "--progress", "off"],
    );
    assert!(success, "reconcile failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("reconcile FSPAN (dry-run)"));
    assert!(stdout.contains("visited: 3"));
    assert!(stdout.contains("complete: 1"));
    assert!(stdout.contains("missing: 2"));
    assert!(stdout.contains("inserted: 0"));
    assert_eq!(count_rows(&db_path, "SELECT COUNT(*) FROM scriptures"), 4);
}

#[test]
fn test_reconcile_unknown_bible_fails() {
    let (_tmp, config_path, db_path) = setup_test_env();
    seed(&db_path, BASELINE);

    let (stdout, _, success, code) =
        run_fohs(&config_path, &["reconcile", "--bible", "NOPE"]);
    assert!(!success);
    assert_eq!(code, Some(1));
    assert!(stdout.contains("Unknown Bible mnemonic"));
}

#[test]
fn test_reconcile_from_rebuild_db() {
    let (tmp, config_path, db_path) = setup_test_env();
    seed(&db_path, BASELINE);

    let backup = tmp.path().join("backup.sqlite");
    seed(
        &backup,
        &[
            ("(John 3:16 FSPAN)", "LOVE", "Amor", "Porque de tal manera amó Dios al mundo"),
            ("(1 John 4:8 FSPAN)", "LOVE", "", "El que no ama, no ha conocido a Dios"),
        ],
    );

    let (stdout, stderr, success, _) = run_fohs(
        &config_path,
        &[
            "reconcile",
            "--bible",
            "FSPAN",
            "--insert",
            "--rebuild-db",
            backup.to_str().unwrap(),
            "--progress",
            "off",
        ],
    );
    assert!(success, "reconcile failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("reconcile FSPAN (rebuild)"));
    assert!(stdout.contains("inserted: 2"));
    assert!(stdout.contains("skipped: 1"));

    // Blank label in the backup falls back to the configured label.
    assert_eq!(
        count_rows(
            &db_path,
            "SELECT COUNT(*) FROM scriptures WHERE scriptureIndex = '(1 John 4:8 FSPAN)' AND fohs = 'Amor'"
        ),
        1
    );

    // A second run finds everything it can already in place.
    let (stdout, _, success, _) = run_fohs(
        &config_path,
        &[
            "reconcile",
            "--bible",
            "FSPAN",
            "--insert",
            "--rebuild-db",
            backup.to_str().unwrap(),
            "--progress",
            "off",
        ],
    );
    assert!(success);
    assert!(stdout.contains("complete: 2"));
    assert!(stdout.contains("inserted: 0"));
    assert_eq!(count_rows(&db_path, "SELECT COUNT(*) FROM scriptures"), 5);
}
