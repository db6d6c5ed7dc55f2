use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn setup_test_env(backend: &str) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();
    fs::create_dir_all(root.join("data")).unwrap();

    let mirror = root.join("mirror").join("docs.example");
    fs::create_dir_all(mirror.join("chains")).unwrap();
    fs::write(
        mirror.join("alpha.md"),
        "# Alpha\n\nChains link components together.",
    )
    .unwrap();
    fs::write(
        mirror.join("chains/index.html"),
        "<html><head><title>Chains</title></head><body><nav>menu</nav>\
         <div role=\"main\"><p>A chain calls a model with a prompt.</p></div></body></html>",
    )
    .unwrap();
    fs::write(mirror.join("notes.txt"), "Retrievers return documents.").unwrap();

    let config_content = format!(
        r#"[index]
backend = "{backend}"
name = "docs-test"
path = "{root}/data/index.sqlite"

[embedding]
provider = "disabled"

[sources.docs]
root = "{root}/mirror"

[rewrite]
from = "{root}/mirror"
to = "https:/"
"#,
        backend = backend,
        root = root.display(),
    );

    let config_path = config_dir.join("dochelp.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_dochelp(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let output = Command::new(env!("CARGO_BIN_EXE_dochelp"))
        .arg("--config")
        .arg(config_path)
        .args(args)
        .env_remove("INDEX_NAME")
        .env_remove("PINECONE_HOST")
        .output()
        .expect("failed to run dochelp");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

#[test]
fn test_sources_lists_docs() {
    let (_tmp, config) = setup_test_env("memory");
    let (stdout, stderr, ok) = run_dochelp(&config, &["sources"]);
    assert!(ok, "sources failed: {}", stderr);
    assert!(stdout.contains("docs"));
    assert!(stdout.contains("OK"));
    assert!(stdout.contains("NOT CONFIGURED"));
    assert!(stdout.contains("-> 'https:/'"));
}

#[test]
fn test_ingest_dry_run_counts_and_rewrites() {
    let (_tmp, config) = setup_test_env("memory");
    let (stdout, stderr, ok) =
        run_dochelp(&config, &["ingest", "docs", "--dry-run", "--progress", "none"]);
    assert!(ok, "dry-run failed: {}", stderr);
    assert!(stdout.contains("ingest docs (dry-run)"));
    assert!(stdout.contains("documents: 3"));
    assert!(stdout.contains("chunks: 3"));
    assert!(stdout.contains("first locator: https://docs.example/alpha.md"));
}

#[test]
fn test_ingest_without_embedder_fails() {
    let (_tmp, config) = setup_test_env("memory");
    let (_stdout, stderr, ok) = run_dochelp(&config, &["ingest", "docs", "--progress", "none"]);
    assert!(!ok);
    assert!(stderr.contains("Embedding provider is disabled"));
}

#[test]
fn test_ingest_unknown_source_fails() {
    let (_tmp, config) = setup_test_env("memory");
    let (_stdout, stderr, ok) = run_dochelp(&config, &["ingest", "ftp", "--dry-run"]);
    assert!(!ok);
    assert!(stderr.contains("Unknown source"));
}

#[test]
fn test_init_sqlite_is_idempotent() {
    let (tmp, config) = setup_test_env("sqlite");
    let (stdout, stderr, ok) = run_dochelp(&config, &["init"]);
    assert!(ok, "init failed: {}", stderr);
    assert!(stdout.contains("Index 'docs-test' initialized (0 vectors)."));
    assert!(tmp.path().join("data/index.sqlite").exists());

    let (_stdout, stderr, ok) = run_dochelp(&config, &["init"]);
    assert!(ok, "second init failed: {}", stderr);
}

#[test]
fn test_init_memory_backend_needs_nothing() {
    let (_tmp, config) = setup_test_env("memory");
    let (stdout, _stderr, ok) = run_dochelp(&config, &["init"]);
    assert!(ok);
    assert!(stdout.contains("needs no local initialization"));
}

#[test]
fn test_missing_index_name_fails() {
    let tmp = TempDir::new().unwrap();
    let config = tmp.path().join("dochelp.toml");
    fs::write(&config, "[index]\nbackend = \"memory\"\n").unwrap();

    let (_stdout, stderr, ok) = run_dochelp(&config, &["sources"]);
    assert!(!ok);
    assert!(stderr.contains("index.name must be set"));
}

#[test]
fn test_missing_config_file_fails() {
    let (_stdout, _stderr, ok) = run_dochelp(Path::new("/nonexistent/dochelp.toml"), &["sources"]);
    assert!(!ok);
}
