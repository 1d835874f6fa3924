//! Resume store tests, run against both backends

use std::time::Duration;

use markflow::resume::{
    compat, prepare_resume, ConversationMessage, ExecutionContext, FileResumeStore,
    MemoryResumeStore, ResumeStore, Role, RunStatus, StepRecord, VarValue,
};
use markflow::util::content_hash;
use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::TempDir;

const D1: &str = "---\nname: review\n---\nReview the project.";
const D2: &str = "---\nname: review\n---\nReview the project carefully.";

fn context(run_id: &str, text: &str) -> ExecutionContext {
    let mut ctx = ExecutionContext::new(run_id, "flows/review.prompt.md", Some(content_hash(text)));
    ctx.current_step = Some("analyze".into());
    ctx.set_var("count", 3i64);
    ctx.set_var("ratio", 0.25);
    ctx.set_var("enabled", false);
    ctx.set_var("target", "src/");
    ctx.set_var("files", json!(["a.rs", "b.rs"]));
    ctx
}

fn conversation() -> Vec<ConversationMessage> {
    vec![
        ConversationMessage::system("You review code."),
        ConversationMessage::user("Review src/"),
        ConversationMessage::assistant("Looking at a.rs"),
        ConversationMessage::tool("{\"files\": 2}"),
    ]
}

/// Both backends, the file one rooted in a fresh temp dir
fn stores() -> Vec<(TempDir, Box<dyn ResumeStore>)> {
    let file_dir = TempDir::new().unwrap();
    let file_store: Box<dyn ResumeStore> =
        Box::new(FileResumeStore::new(file_dir.path().join("state")));
    let memory_store: Box<dyn ResumeStore> = Box::new(MemoryResumeStore::new());
    vec![(file_dir, file_store), (TempDir::new().unwrap(), memory_store)]
}

#[tokio::test]
async fn round_trip_preserves_conversation_and_variables() {
    for (_dir, store) in stores() {
        let ctx = context("run-rt", D1);
        let messages = conversation();
        store.save_state(&ctx, &messages).await.unwrap();

        let (restored, restored_messages) = store.load_state("run-rt").await.unwrap().unwrap();

        let roles: Vec<Role> = restored_messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant, Role::Tool]);
        let contents: Vec<&str> = restored_messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(
            contents,
            vec!["You review code.", "Review src/", "Looking at a.rs", "{\"files\": 2}"]
        );

        assert_eq!(restored.var("count"), Some(&VarValue::Integer(3)));
        assert_eq!(restored.var("ratio"), Some(&VarValue::Float(0.25)));
        assert_eq!(restored.var("enabled"), Some(&VarValue::Bool(false)));
        assert_eq!(restored.var("target"), Some(&VarValue::Text("src/".into())));
        assert_eq!(
            restored.var("files"),
            Some(&VarValue::Structured(json!(["a.rs", "b.rs"])))
        );
        assert_eq!(restored.current_step.as_deref(), Some("analyze"));
        assert_eq!(restored.workflow_hash, ctx.workflow_hash);
    }
}

#[tokio::test]
async fn load_of_unknown_run_is_none() {
    for (_dir, store) in stores() {
        assert!(store.load_state("never-saved").await.unwrap().is_none());
    }
}

#[tokio::test]
async fn resave_keeps_started_at() {
    for (_dir, store) in stores() {
        let ctx = context("run-started", D1);
        store.save_state(&ctx, &[]).await.unwrap();
        let first = store.read("run-started").await.unwrap().unwrap();

        let mut later = ctx.clone();
        later.started_at = chrono::Utc::now() + chrono::Duration::hours(1);
        store.save_state(&later, &conversation()).await.unwrap();
        let second = store.read("run-started").await.unwrap().unwrap();

        assert_eq!(first.workflow.started_at, second.workflow.started_at);
        assert!(second.workflow.last_checkpoint >= first.workflow.last_checkpoint);
        assert_eq!(second.conversation_messages.len(), 4);
    }
}

#[tokio::test]
async fn compatibility_follows_content_hash() {
    for (_dir, store) in stores() {
        store.save_state(&context("run-compat", D1), &[]).await.unwrap();

        assert!(store.validate_compatibility("run-compat", D1).await.unwrap());
        assert!(!store.validate_compatibility("run-compat", D2).await.unwrap());
        // No snapshot yet: nothing to conflict with
        assert!(store.validate_compatibility("run-other", D2).await.unwrap());
    }
}

#[tokio::test]
async fn prepare_resume_gates_on_hash_unless_forced() {
    for (_dir, store) in stores() {
        store.save_state(&context("run-gate", D1), &conversation()).await.unwrap();

        let err = prepare_resume(store.as_ref(), "run-gate", D2, false)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "MKF-021");

        let (ctx, messages) = prepare_resume(store.as_ref(), "run-gate", D2, true)
            .await
            .unwrap();
        assert_eq!(ctx.run_id, "run-gate");
        assert_eq!(messages.len(), 4);

        let missing = prepare_resume(store.as_ref(), "run-missing", D1, false)
            .await
            .unwrap_err();
        assert_eq!(missing.code(), "MKF-020");
    }
}

#[tokio::test]
async fn snapshot_without_hash_is_compatible() {
    for (_dir, store) in stores() {
        let ctx = ExecutionContext::new("run-nohash", "a.prompt.md", None);
        store.save_state(&ctx, &[]).await.unwrap();
        let snapshot = store.read("run-nohash").await.unwrap();
        assert_eq!(
            compat::check(snapshot.as_ref(), D2),
            compat::Compatibility::NoStoredHash
        );
        assert!(store.validate_compatibility("run-nohash", D2).await.unwrap());
    }
}

#[tokio::test]
async fn step_tracking_appends_history_and_transcript() {
    for (_dir, store) in stores() {
        store.save_state(&context("run-steps", D1), &[]).await.unwrap();

        let start = chrono::Utc::now();
        store
            .track_step_completion("run-steps", StepRecord::completed("lint", "sub-workflow", start))
            .await
            .unwrap();
        store
            .track_step_failure("run-steps", "build", "compiler exited with 101")
            .await
            .unwrap();

        let state = store.read("run-steps").await.unwrap().unwrap();
        let history = &state.execution_context.execution_history;
        assert_eq!(history.len(), 2);
        assert!(history[0].success);
        assert!(!history[1].success);
        assert_eq!(history[1].error_message.as_deref(), Some("compiler exited with 101"));
        assert_eq!(state.execution_context.current_step.as_deref(), Some("build"));

        assert_eq!(state.conversation_messages.len(), 2);
        assert!(state.conversation_messages.iter().all(|m| m.role == "system"));
    }
}

#[tokio::test]
async fn step_tracking_without_snapshot_is_noop() {
    for (_dir, store) in stores() {
        store
            .track_step_completion("run-ghost", StepRecord::completed("a", "prompt", chrono::Utc::now()))
            .await
            .unwrap();
        store.track_step_failure("run-ghost", "a", "boom").await.unwrap();
        assert!(store.read("run-ghost").await.unwrap().is_none());
    }
}

#[tokio::test]
async fn list_available_only_returns_in_progress_runs() {
    for (_dir, store) in stores() {
        for id in ["run-b", "run-a", "run-c"] {
            store.save_state(&context(id, D1), &[]).await.unwrap();
        }
        assert!(store.mark_status("run-c", RunStatus::Completed).await.unwrap());
        assert!(!store.mark_status("run-none", RunStatus::Failed).await.unwrap());

        assert_eq!(store.list_available().await.unwrap(), vec!["run-a", "run-b"]);
    }
}

#[tokio::test]
async fn delete_reports_existence() {
    for (_dir, store) in stores() {
        store.save_state(&context("run-del", D1), &[]).await.unwrap();
        assert!(store.delete("run-del").await.unwrap());
        assert!(!store.delete("run-del").await.unwrap());
        assert!(store.read("run-del").await.unwrap().is_none());
    }
}

#[tokio::test]
async fn cleanup_is_idempotent() {
    for (_dir, store) in stores() {
        store.save_state(&context("run-old-1", D1), &[]).await.unwrap();
        store.save_state(&context("run-old-2", D1), &[]).await.unwrap();

        // Nothing is older than a day
        assert_eq!(store.cleanup(Duration::from_secs(86_400)).await.unwrap(), 0);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(store.cleanup(Duration::ZERO).await.unwrap(), 2);
        assert_eq!(store.cleanup(Duration::ZERO).await.unwrap(), 0);
        assert!(store.list_available().await.unwrap().is_empty());
    }
}

#[tokio::test]
async fn invalid_run_ids_are_rejected() {
    for (_dir, store) in stores() {
        let ctx = ExecutionContext::new("../escape", "a.prompt.md", None);
        let err = store.save_state(&ctx, &[]).await.unwrap_err();
        assert_eq!(err.code(), "MKF-023");
        assert!(store.load_state("a/b").await.is_err());
    }
}

// ═══════════════════════════════════════════════════════════════
// File backend specifics
// ═══════════════════════════════════════════════════════════════

#[tokio::test]
async fn file_store_writes_camel_case_json() {
    let dir = TempDir::new().unwrap();
    let store = FileResumeStore::new(dir.path());
    store.save_state(&context("run-json", D1), &conversation()).await.unwrap();

    let text = std::fs::read_to_string(store.snapshot_path("run-json")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(value["workflow"]["id"], "run-json");
    assert_eq!(value["workflow"]["status"], "in_progress");
    assert_eq!(value["workflow"]["contentHash"], content_hash(D1));
    assert_eq!(value["conversationMessages"][1]["role"], "user");
    assert_eq!(value["executionContext"]["variables"]["count"], 3);
    assert_eq!(value["executionContext"]["currentStep"], "analyze");
}

#[tokio::test]
async fn file_store_leaves_no_temp_files() {
    let dir = TempDir::new().unwrap();
    let store = FileResumeStore::new(dir.path());
    store.save_state(&context("run-tmp", D1), &[]).await.unwrap();
    store.save_state(&context("run-tmp", D1), &conversation()).await.unwrap();

    let names: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["run-tmp.json".to_string()]);
}

#[tokio::test]
async fn file_store_skips_corrupt_and_stray_files() {
    let dir = TempDir::new().unwrap();
    let store = FileResumeStore::new(dir.path());
    store.save_state(&context("run-good", D1), &[]).await.unwrap();

    std::fs::write(dir.path().join("run-bad.json"), "{ not json").unwrap();
    std::fs::write(dir.path().join("run-half.json.tmp"), "{").unwrap();
    std::fs::write(dir.path().join("notes.txt"), "hello").unwrap();

    assert_eq!(store.list_available().await.unwrap(), vec!["run-good"]);

    let err = store.read("run-bad").await.unwrap_err();
    assert_eq!(err.code(), "MKF-022");

    // A corrupt snapshot is replaced by the next checkpoint
    store.save_state(&context("run-bad", D1), &[]).await.unwrap();
    assert!(store.read("run-bad").await.unwrap().is_some());
}

#[tokio::test]
async fn file_store_missing_directory_is_empty() {
    let dir = TempDir::new().unwrap();
    let store = FileResumeStore::new(dir.path().join("does/not/exist"));
    assert!(store.list_available().await.unwrap().is_empty());
    assert_eq!(store.cleanup(Duration::ZERO).await.unwrap(), 0);
}

#[tokio::test]
async fn cancelled_store_refuses_writes() {
    let token = tokio_util::sync::CancellationToken::new();
    let dir = TempDir::new().unwrap();
    let file_store = FileResumeStore::new(dir.path()).with_cancellation(token.clone());
    let memory_store = MemoryResumeStore::new().with_cancellation(token.clone());
    token.cancel();

    let ctx = context("run-cancel", D1);
    assert_eq!(file_store.save_state(&ctx, &[]).await.unwrap_err().code(), "MKF-092");
    assert_eq!(memory_store.save_state(&ctx, &[]).await.unwrap_err().code(), "MKF-092");
    assert!(!file_store.snapshot_path("run-cancel").exists());
    assert!(memory_store.is_empty());
}
