//! Integration tests for the scan-generate-insert-publish workflow.

use async_trait::async_trait;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

use docsmith::analysis::FileAnalyzer;
use docsmith::cache::AnalysisCache;
use docsmith::generate::{GenerateError, Generator};
use docsmith::provider::LocalProvider;
use docsmith::publish::{ChangePublisher, ChangeRequest, LocalPublisher, PublishError};
use docsmith::walker::{FailureStage, ScanOptions, Scanner};
use docsmith::workflow::{DocumentationWorkflow, Trigger, WorkflowStatus};

/// Answers every prompt with a fenced reply, failing for the unit named
/// `bad`.
#[derive(Default)]
struct StubGenerator {
    calls: AtomicUsize,
}

#[async_trait]
impl Generator for StubGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerateError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if prompt.contains("`bad`") {
            return Err(GenerateError::Status(500));
        }
        Ok("```\nReturn the value the caller asked for.\n```".to_string())
    }
}

#[derive(Default)]
struct RecordingPublisher {
    requests: Mutex<Vec<ChangeRequest>>,
}

#[async_trait]
impl ChangePublisher for RecordingPublisher {
    async fn publish(&self, request: &ChangeRequest) -> Result<String, PublishError> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(format!("memory://{}", request.branch_name))
    }
}

fn workflow(
    root: &Path,
    generator: Arc<StubGenerator>,
    publisher: Arc<dyn ChangePublisher>,
) -> DocumentationWorkflow {
    let cache = Arc::new(AnalysisCache::in_memory(Duration::from_secs(3600)));
    let scanner = Scanner::new(
        Arc::new(LocalProvider::new(root)),
        Arc::new(FileAnalyzer::new(cache)),
        ScanOptions::default(),
    );
    DocumentationWorkflow::new(scanner, generator, publisher, "docs/auto-document-")
}

#[tokio::test]
async fn test_nothing_to_document() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("done.py"),
        "def done():\n    \"\"\"Already documented thoroughly.\"\"\"\n",
    )
    .unwrap();
    fs::write(dir.path().join("notes.md"), "nothing to see\n").unwrap();

    let generator = Arc::new(StubGenerator::default());
    let publisher = Arc::new(RecordingPublisher::default());
    let outcome = workflow(dir.path(), generator.clone(), publisher.clone())
        .run("acme/done", Trigger::Push)
        .await
        .unwrap();

    assert_eq!(outcome.status(), WorkflowStatus::NoDocumentationNeeded);
    assert_eq!(outcome.scanned_files, 1);
    assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    assert!(publisher.requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_documents_every_file_in_one_change() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("example.py"), "def foo():\n    return 1\n").unwrap();
    fs::create_dir(dir.path().join("web")).unwrap();
    fs::write(
        dir.path().join("web/app.js"),
        "function start() {\n  return 1;\n}\n\nclass App {}\n",
    )
    .unwrap();

    let generator = Arc::new(StubGenerator::default());
    let publisher = Arc::new(RecordingPublisher::default());
    let outcome = workflow(dir.path(), generator.clone(), publisher.clone())
        .run("acme/app", Trigger::PullRequest)
        .await
        .unwrap();

    assert_eq!(outcome.status(), WorkflowStatus::Documented);
    assert_eq!(outcome.documented_items, 3);
    assert_eq!(generator.calls.load(Ordering::SeqCst), 3);

    let requests = publisher.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert!(request.branch_name.starts_with("docs/auto-document-"));
    assert_eq!(
        request.changes["example.py"],
        "def foo():\n    \"\"\"Return the value the caller asked for.\"\"\"\n    return 1\n"
    );
    assert_eq!(
        request.changes["web/app.js"],
        "/**\n * Return the value the caller asked for.\n */\nfunction start() {\n  return 1;\n}\n\n/**\n * Return the value the caller asked for.\n */\nclass App {}\n"
    );

    let change = outcome.change.as_ref().unwrap();
    assert_eq!(change.files, ["example.py", "web/app.js"]);
    assert_eq!(change.url, format!("memory://{}", request.branch_name));
}

#[tokio::test]
async fn test_failed_item_withholds_whole_file() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("mixed.py"),
        "def good():\n    return 1\n\n\ndef bad():\n    return 2\n",
    )
    .unwrap();
    fs::write(dir.path().join("clean.py"), "def fine():\n    return 3\n").unwrap();

    let publisher = Arc::new(RecordingPublisher::default());
    let outcome = workflow(dir.path(), Arc::new(StubGenerator::default()), publisher.clone())
        .run("acme/mixed", Trigger::Manual)
        .await
        .unwrap();

    assert_eq!(outcome.status(), WorkflowStatus::DocumentedWithErrors(1));
    assert_eq!(outcome.failures[0].path, "mixed.py");
    assert_eq!(outcome.failures[0].stage, FailureStage::Generation);

    let requests = publisher.requests.lock().unwrap();
    let paths: Vec<&String> = requests[0].changes.keys().collect();
    assert_eq!(paths, ["clean.py"]);
}

#[tokio::test]
async fn test_all_files_failing_publishes_nothing() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("bad.py"), "def bad():\n    return 2\n").unwrap();
    fs::write(dir.path().join("broken.py"), "def broken(:\n").unwrap();

    let publisher = Arc::new(RecordingPublisher::default());
    let outcome = workflow(dir.path(), Arc::new(StubGenerator::default()), publisher.clone())
        .run("acme/bad", Trigger::Manual)
        .await
        .unwrap();

    assert_eq!(outcome.status(), WorkflowStatus::Failed(2));
    assert!(outcome.change.is_none());
    assert!(publisher.requests.lock().unwrap().is_empty());
    let stages: Vec<FailureStage> = outcome.failures.iter().map(|f| f.stage).collect();
    assert_eq!(stages, [FailureStage::Generation, FailureStage::Parsing]);
}

#[tokio::test]
async fn test_local_publisher_writes_output_tree() {
    let dir = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    fs::write(dir.path().join("example.py"), "def foo():\n    return 1\n").unwrap();

    let publisher = Arc::new(LocalPublisher::to_output(dir.path(), out.path()));
    let outcome = workflow(dir.path(), Arc::new(StubGenerator::default()), publisher)
        .run("acme/example", Trigger::Manual)
        .await
        .unwrap();

    let change = outcome.change.unwrap();
    let written = fs::read_to_string(out.path().join(&change.branch).join("example.py")).unwrap();
    assert!(written.contains("\"\"\"Return the value the caller asked for.\"\"\""));
    // The source tree is untouched.
    assert_eq!(
        fs::read_to_string(dir.path().join("example.py")).unwrap(),
        "def foo():\n    return 1\n"
    );
}
