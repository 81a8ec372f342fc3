mod common;

use common::TestContext;
use sovits_panel::chat::Role;
use sovits_panel::PanelError;
use std::path::PathBuf;

const VALID: &str = r#"{
    "title": "Greetings",
    "persona": "Pirate",
    "createdAt": "2024-05-01T10:00:00Z",
    "messages": [
        {"role": "user", "content": "hi", "timestamp": "2024-05-01T10:00:01Z"},
        {"role": "assistant", "content": "ahoy", "timestamp": "2024-05-01T10:00:02Z"}
    ]
}"#;

fn write(dir: &tempfile::TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

#[tokio::test]
async fn test_import_without_messages_changes_nothing() {
    let ctx = TestContext::new();

    let err = ctx
        .chat
        .import_conversation("broken.json", r#"{"title": "x"}"#)
        .await
        .unwrap_err();

    assert!(matches!(err, PanelError::Validation(_)));
    assert!(ctx.chat.conversations().is_empty());
    assert_eq!(ctx.chat.current_conversation_id(), None);
}

#[tokio::test]
async fn test_import_rejects_non_json_file_name() {
    let ctx = TestContext::new();
    let result = ctx.chat.import_conversation("notes.txt", VALID).await;
    assert!(matches!(result, Err(PanelError::Validation(_))));
    assert!(ctx.chat.conversations().is_empty());
}

#[tokio::test]
async fn test_import_activates_conversation_with_fresh_ids() {
    let ctx = TestContext::new();
    ctx.chat.initialize_config(false).await.unwrap();

    let imported = ctx.chat.import_conversation("a.json", VALID).await.unwrap();

    assert_eq!(imported.title, "Greetings (imported)");
    assert_eq!(imported.persona.id, "pirate");
    assert_eq!(imported.created_at.to_rfc3339(), "2024-05-01T10:00:00+00:00");
    assert_eq!(imported.messages.len(), 2);
    assert_eq!(imported.messages[1].role, Role::Assistant);
    assert_ne!(imported.messages[0].id, imported.messages[1].id);
    assert!(imported.messages.iter().all(|m| m.audio_versions.is_empty()));
    assert_eq!(ctx.chat.current_conversation_id(), Some(imported.id));
}

#[tokio::test]
async fn test_import_with_unknown_persona_uses_current_one() {
    let ctx = TestContext::new();
    ctx.chat.initialize_config(false).await.unwrap();
    let raw = VALID.replace("Pirate", "Stranger");

    let imported = ctx.chat.import_conversation("a.json", &raw).await.unwrap();
    assert_eq!(imported.persona, ctx.chat.current_persona());
}

#[tokio::test]
async fn test_batch_import_counts_failures_per_file() {
    let ctx = TestContext::new();
    let dir = tempfile::tempdir().unwrap();
    let paths = vec![
        write(&dir, "one.json", VALID),
        write(&dir, "two.json", "{ not json"),
        write(&dir, "three.json", VALID),
    ];

    let summary = ctx.chat.import_files(&paths).await;

    assert_eq!(summary.success, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.errors.len(), 1);
    assert!(summary.errors[0].starts_with("two.json: "));
    assert_eq!(ctx.chat.conversations().len(), 2);
}

#[tokio::test]
async fn test_batch_import_reports_missing_files() {
    let ctx = TestContext::new();
    let dir = tempfile::tempdir().unwrap();

    let summary = ctx
        .chat
        .import_files(&[dir.path().join("gone.json")])
        .await;

    assert_eq!(summary.failed, 1);
    assert!(summary.errors[0].starts_with("gone.json: "));
}

#[tokio::test]
async fn test_export_then_import_round_trip() {
    let ctx = TestContext::new();
    ctx.chat.initialize_config(false).await.unwrap();
    ctx.chat.set_persona_by_name("Pirate").await.unwrap();
    ctx.chat.send_message("Hello, world!", None).await.unwrap();
    let id = ctx.chat.current_conversation_id().unwrap();
    let dir = tempfile::tempdir().unwrap();

    let path = ctx.chat.export_to_dir(&id, dir.path()).await.unwrap();

    let file_name = path.file_name().unwrap().to_string_lossy().to_string();
    assert!(file_name.starts_with("conversation_Hello__world__"));
    assert!(file_name.ends_with(".json"));

    let exported: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(exported["persona"], "Pirate");
    assert_eq!(exported["messages"].as_array().unwrap().len(), 2);

    ctx.chat.set_persona_by_name("Assistant").await.unwrap();
    let imported = ctx.chat.import_file(&path).await.unwrap();
    assert_eq!(imported.title, "Hello, world! (imported)");
    assert_eq!(imported.persona.id, "pirate");
    assert_eq!(imported.messages[0].content, "Hello, world!");
    assert_eq!(ctx.chat.conversations().len(), 2);
}

#[tokio::test]
async fn test_persisted_import_creates_server_conversation() {
    let ctx = TestContext::persisted();

    let imported = ctx.chat.import_conversation("a.json", VALID).await.unwrap();

    assert!(imported.id.starts_with("conv-"));
    assert_eq!(ctx.backend.count("create_conversation:Greetings (imported)"), 1);
    assert_eq!(ctx.backend.count("add_message"), 2);
    let server = ctx.backend.conversations.lock().unwrap()[0].clone();
    assert_eq!(server.messages.len(), 2);
}
