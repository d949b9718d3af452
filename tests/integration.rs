//! End-to-end tests of the `pagerag` binary.
//!
//! Each test gets its own temp directory with a config, a documents folder,
//! and a store directory. An axum router on a random port stands in for
//! Ollama: `/api/embed` returns letter-frequency vectors and `/api/generate`
//! returns a fixed answer while recording the request.

use axum::{extract::State, routing::post, Json, Router};
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use tempfile::TempDir;

const ANSWER: &str = "A ratio compares two quantities.";

fn pagerag_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("pagerag");
    path
}

type GenerateLog = Arc<Mutex<Vec<Value>>>;

struct FakeOllama {
    url: String,
    generate_requests: GenerateLog,
}

impl FakeOllama {
    /// Serve on a background thread with its own runtime, so the tests can
    /// block on the child process.
    fn start() -> Self {
        let generate_requests: GenerateLog = Arc::new(Mutex::new(Vec::new()));
        let state = generate_requests.clone();
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            rt.block_on(async move {
                let app = Router::new()
                    .route("/api/embed", post(handle_embed))
                    .route("/api/generate", post(handle_generate))
                    .with_state(state);
                let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
                tx.send(listener.local_addr().unwrap()).unwrap();
                axum::serve(listener, app).await.unwrap();
            });
        });

        let addr = rx.recv().unwrap();
        Self {
            url: format!("http://{}", addr),
            generate_requests,
        }
    }

    fn last_generate(&self) -> Value {
        self.generate_requests
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no /api/generate request received")
    }
}

fn letter_vector(text: &str) -> Vec<f32> {
    let mut v = vec![0.0f32; 27];
    v[26] = 0.5;
    for b in text.to_ascii_lowercase().bytes() {
        if b.is_ascii_lowercase() {
            v[(b - b'a') as usize] += 1.0;
        }
    }
    v
}

async fn handle_embed(Json(request): Json<Value>) -> Json<Value> {
    let embeddings: Vec<Vec<f32>> = request["input"]
        .as_array()
        .map(|inputs| {
            inputs
                .iter()
                .map(|t| letter_vector(t.as_str().unwrap_or("")))
                .collect()
        })
        .unwrap_or_default();
    Json(json!({ "model": request["model"], "embeddings": embeddings }))
}

async fn handle_generate(
    State(log): State<GenerateLog>,
    Json(request): Json<Value>,
) -> Json<Value> {
    log.lock().unwrap().push(request);
    Json(json!({ "response": ANSWER, "done": true }))
}

fn setup_test_env(ollama_url: &str) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    fs::create_dir_all(root.join("config")).unwrap();
    let files_dir = root.join("files");
    fs::create_dir_all(&files_dir).unwrap();
    fs::write(
        files_dir.join("fractions.md"),
        "A fraction names equal parts of a whole.",
    )
    .unwrap();
    fs::write(
        files_dir.join("ratios.md"),
        "A ratio compares two quantities, like 3 apples to 2 oranges.",
    )
    .unwrap();
    fs::write(
        files_dir.join("percent.txt"),
        "Percent means per hundred.",
    )
    .unwrap();

    let config_content = format!(
        r#"[store]
path = "{root}/store"

[documents]
root = "{root}/files"
include_globs = ["**/*.md", "**/*.txt"]

[embedding]
provider = "ollama"
model = "test-embed"
url = "{url}"
timeout_secs = 5

[generation]
url = "{url}"
timeout_secs = 5
"#,
        root = root.display(),
        url = ollama_url
    );

    let config_path = root.join("config").join("pagerag.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_pagerag(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = pagerag_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run pagerag binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

#[test]
fn test_ingest_adds_all_chunks_first_time() {
    let ollama = FakeOllama::start();
    let (_tmp, config_path) = setup_test_env(&ollama.url);

    let (stdout, stderr, success) = run_pagerag(&config_path, &["ingest"]);
    assert!(success, "ingest failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("Number of existing documents in DB: 0"));
    assert!(stdout.contains("New 3 documents added to the DB"), "{}", stdout);
}

#[test]
fn test_ingest_idempotent() {
    let ollama = FakeOllama::start();
    let (_tmp, config_path) = setup_test_env(&ollama.url);

    run_pagerag(&config_path, &["ingest"]);
    let (stdout, stderr, success) = run_pagerag(&config_path, &["ingest"]);
    assert!(success, "second ingest failed: {}", stderr);
    assert!(stdout.contains("Number of existing documents in DB: 3"), "{}", stdout);
    assert!(stdout.contains("No documents to add!"), "{}", stdout);
}

#[test]
fn test_ingest_picks_up_new_file_only() {
    let ollama = FakeOllama::start();
    let (tmp, config_path) = setup_test_env(&ollama.url);

    run_pagerag(&config_path, &["ingest"]);
    fs::write(tmp.path().join("files").join("area.md"), "Area is length times width.").unwrap();

    let (stdout, _, success) = run_pagerag(&config_path, &["ingest"]);
    assert!(success);
    assert!(stdout.contains("New 1 documents added to the DB"), "{}", stdout);
}

#[test]
fn test_ingest_reset_rebuilds() {
    let ollama = FakeOllama::start();
    let (_tmp, config_path) = setup_test_env(&ollama.url);

    run_pagerag(&config_path, &["ingest"]);
    let (stdout, _, success) = run_pagerag(&config_path, &["ingest", "--reset"]);
    assert!(success);
    assert!(stdout.contains("✨ Clearing Database"));
    assert!(stdout.contains("Number of existing documents in DB: 0"));
    assert!(stdout.contains("New 3 documents added to the DB"));
}

#[test]
fn test_ingest_fails_when_embedding_service_down() {
    let (_tmp, config_path) = setup_test_env("http://127.0.0.1:9");

    let (_, stderr, success) = run_pagerag(&config_path, &["ingest"]);
    assert!(!success, "ingest should fail without an embedding service");
    assert!(stderr.contains("embedding failed"), "{}", stderr);
}

#[test]
fn test_query_prints_response_and_sources() {
    let ollama = FakeOllama::start();
    let (_tmp, config_path) = setup_test_env(&ollama.url);
    run_pagerag(&config_path, &["ingest"]);

    let (stdout, stderr, success) =
        run_pagerag(&config_path, &["query", "What is a ratio?", "--sources"]);
    assert!(success, "query failed: {}", stderr);
    assert!(stdout.contains(&format!("Response: {}", ANSWER)), "{}", stdout);
    assert!(stdout.contains("Sources: ["), "{}", stdout);
    assert!(stdout.contains("ratios.md:None:0"), "{}", stdout);

    let request = ollama.last_generate();
    assert_eq!(request["model"], "gemma3:1b");
    assert_eq!(request["stream"], false);
    let prompt = request["prompt"].as_str().unwrap();
    assert!(prompt.starts_with("System: You are a middle school math teacher."));
    assert!(prompt.contains("\nHuman: Answer the question based on the following context: "));
    assert!(prompt.ends_with("Question: What is a ratio?"));
    assert_eq!(prompt.matches("\n\n---\n\n").count(), 2, "{}", prompt);
}

#[test]
fn test_query_empty_store_still_asks_model() {
    let ollama = FakeOllama::start();
    let (tmp, config_path) = setup_test_env(&ollama.url);

    let (stdout, stderr, success) = run_pagerag(&config_path, &["query", "What is 2+2?"]);
    assert!(success, "query failed: {}", stderr);
    assert!(stdout.contains("Response: "));
    assert!(!stdout.contains("Sources:"));
    assert!(!tmp.path().join("store").exists());

    let prompt = ollama.last_generate()["prompt"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(prompt.contains("following context:  Question: What is 2+2?"), "{}", prompt);
}

#[test]
fn test_query_respects_k() {
    let ollama = FakeOllama::start();
    let (_tmp, config_path) = setup_test_env(&ollama.url);
    let mut content = fs::read_to_string(&config_path).unwrap();
    content.push_str("\n[retrieval]\nk = 1\n");
    fs::write(&config_path, content).unwrap();

    run_pagerag(&config_path, &["ingest"]);
    let (_, _, success) = run_pagerag(&config_path, &["query", "ratio"]);
    assert!(success);
    let prompt = ollama.last_generate()["prompt"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(!prompt.contains("\n\n---\n\n"), "{}", prompt);
}

#[test]
fn test_stats_counts_chunks() {
    let ollama = FakeOllama::start();
    let (_tmp, config_path) = setup_test_env(&ollama.url);
    run_pagerag(&config_path, &["ingest"]);

    let (stdout, _, success) = run_pagerag(&config_path, &["stats"]);
    assert!(success);
    assert!(stdout.contains("Chunks:      3"), "{}", stdout);
    assert!(stdout.contains("ratios.md"), "{}", stdout);
}

#[test]
fn test_chat_sends_system_prompt() {
    let ollama = FakeOllama::start();
    let (_tmp, config_path) = setup_test_env(&ollama.url);

    let (stdout, _, success) = run_pagerag(&config_path, &["chat", "Why is the sky blue?"]);
    assert!(success);
    assert!(stdout.contains(ANSWER));

    let request = ollama.last_generate();
    assert_eq!(request["prompt"], "Why is the sky blue?");
    assert_eq!(request["system"], "Give the answer in a single sentence");
}

#[test]
fn test_invalid_chunking_config_rejected() {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("pagerag.toml");
    fs::write(&config_path, "[chunking]\nchunk_size = 50\nchunk_overlap = 60\n").unwrap();

    let (_, stderr, success) = run_pagerag(&config_path, &["stats"]);
    assert!(!success);
    assert!(stderr.contains("chunk_overlap"), "{}", stderr);
}

#[test]
fn test_missing_documents_root_is_error() {
    let ollama = FakeOllama::start();
    let (tmp, config_path) = setup_test_env(&ollama.url);
    fs::remove_dir_all(tmp.path().join("files")).unwrap();

    let (_, stderr, success) = run_pagerag(&config_path, &["ingest"]);
    assert!(!success);
    assert!(stderr.contains("Documents root does not exist"), "{}", stderr);
}
