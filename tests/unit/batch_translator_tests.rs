/*!
 * Tests for whole-document orchestration
 */

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Local};
use doctrans::app_config::Config;
use doctrans::errors::{AppError, ProgressError};
use doctrans::providers::mock::{MockProvider, MockStep};
use doctrans::translation::{EventRecorder, ObserverEvent, ProgressStore, TranslationObserver};

use crate::common;

const THREE_PARAGRAPHS: &str = "Alpha one.\n\nBeta two.\n\nGamma three.";

/// Config whose chunker cuts `THREE_PARAGRAPHS` at each paragraph
fn paragraph_config(dir: &Path) -> Config {
    let mut config = common::test_config(dir);
    config.chunking.chunk_size = 12;
    config.chunking.overlap = 0;
    config
}

/// Counts finished chunks in the snapshot file each time a call is made
struct SnapshotWatcher {
    path: PathBuf,
    seen: Mutex<Vec<usize>>,
}

impl TranslationObserver for SnapshotWatcher {
    fn on_attempt(&self, _index: usize, _total: usize, _attempt: u32, _at: DateTime<Local>) {
        let done = std::fs::read_to_string(&self.path)
            .ok()
            .and_then(|raw| serde_json::from_str::<serde_json::Value>(&raw).ok())
            .and_then(|v| v["translated_chunks"].as_array().cloned())
            .map(|slots| slots.iter().filter(|s| !s.is_null()).count())
            .unwrap_or(0);
        self.seen.lock().unwrap().push(done);
    }
}

#[tokio::test(start_paused = true)]
async fn test_run_shouldTranslateChunksInOrder() {
    let temp_dir = common::create_temp_dir().unwrap();
    let config = paragraph_config(temp_dir.path());
    let provider = MockProvider::working();
    let translator = common::mock_translator(&provider, &config);

    let outcome = translator.run_job(THREE_PARAGRAPHS, "ctx", true).await.unwrap();

    assert_eq!(
        outcome.text,
        "[TRANSLATED] Alpha one.\n[TRANSLATED] Beta two.\n[TRANSLATED] Gamma three."
    );
    assert_eq!(outcome.total_chunks, 3);
    assert_eq!(outcome.translated, 3);
    assert_eq!(outcome.restored, 0);
    assert_eq!(outcome.failed, 0);
    assert_eq!(
        provider.user_messages(),
        vec!["Alpha one.", "Beta two.", "Gamma three."]
    );
}

#[tokio::test(start_paused = true)]
async fn test_run_withLongDocument_shouldJoinEveryChunkTranslation() {
    let temp_dir = common::create_temp_dir().unwrap();
    let config = common::test_config(temp_dir.path());
    let provider = MockProvider::working();
    let translator = common::mock_translator(&provider, &config);
    let text = common::numbered_sentences(200);

    let output = translator.run(&text, "ctx", false).await.unwrap();

    let chunks = translator.splitter().split(&text);
    assert!(chunks.len() > 3);
    let expected = chunks
        .iter()
        .map(|c| format!("[TRANSLATED] {}", c))
        .collect::<Vec<_>>()
        .join("\n");
    assert_eq!(output, expected);
}

#[tokio::test(start_paused = true)]
async fn test_run_shouldSaveSnapshotAfterEachChunk() {
    let temp_dir = common::create_temp_dir().unwrap();
    let config = paragraph_config(temp_dir.path());
    let provider = MockProvider::working();
    let watcher = Arc::new(SnapshotWatcher {
        path: config.progress.path.clone(),
        seen: Mutex::new(Vec::new()),
    });
    let translator = common::mock_translator(&provider, &config).with_observer(watcher.clone());

    translator.run(THREE_PARAGRAPHS, "ctx", false).await.unwrap();

    assert_eq!(*watcher.seen.lock().unwrap(), vec![0, 1, 2]);
}

#[tokio::test(start_paused = true)]
async fn test_run_afterCompletion_shouldClearSnapshot() {
    let temp_dir = common::create_temp_dir().unwrap();
    let config = paragraph_config(temp_dir.path());
    let translator = common::mock_translator(&MockProvider::working(), &config);

    translator.run(THREE_PARAGRAPHS, "ctx", true).await.unwrap();

    assert!(!config.progress.path.exists());
}

#[tokio::test(start_paused = true)]
async fn test_translateDocument_shouldLeaveCompleteSnapshotUntilCleared() {
    let temp_dir = common::create_temp_dir().unwrap();
    let config = paragraph_config(temp_dir.path());
    let translator = common::mock_translator(&MockProvider::working(), &config);

    let outcome = translator
        .translate_document(THREE_PARAGRAPHS, "ctx", true)
        .await
        .unwrap();

    let saved = ProgressStore::new(&config.progress.path).load(3).unwrap();
    assert_eq!(
        saved,
        vec![
            Some("[TRANSLATED] Alpha one.".to_string()),
            Some("[TRANSLATED] Beta two.".to_string()),
            Some("[TRANSLATED] Gamma three.".to_string()),
        ]
    );

    translator.clear_progress(&outcome).unwrap();
    assert!(!config.progress.path.exists());
}

#[tokio::test(start_paused = true)]
async fn test_run_shouldSendJobContextWithEveryChunk() {
    let temp_dir = common::create_temp_dir().unwrap();
    let config = paragraph_config(temp_dir.path());
    let provider = MockProvider::working();
    let translator = common::mock_translator(&provider, &config);

    translator.run(THREE_PARAGRAPHS, "A ship log", false).await.unwrap();

    let requests = provider.requests();
    assert_eq!(requests.len(), 3);
    for request in requests {
        assert_eq!(request.messages[0].role, "system");
        assert_eq!(request.messages[0].content, "A ship log");
    }
}

#[tokio::test(start_paused = true)]
async fn test_run_withSavedProgress_shouldOnlyRequestPendingChunks() {
    let temp_dir = common::create_temp_dir().unwrap();
    let config = paragraph_config(temp_dir.path());
    ProgressStore::new(&config.progress.path)
        .save(&[Some("アルファ".to_string()), None, Some("ガンマ".to_string())])
        .unwrap();
    let provider = MockProvider::working();
    let recorder = Arc::new(EventRecorder::new());
    let translator = common::mock_translator(&provider, &config).with_observer(recorder.clone());

    let outcome = translator.run_job(THREE_PARAGRAPHS, "ctx", true).await.unwrap();

    assert_eq!(outcome.text, "アルファ\n[TRANSLATED] Beta two.\nガンマ");
    assert_eq!(outcome.restored, 2);
    assert_eq!(outcome.translated, 1);
    assert_eq!(recorder.attempted_indices(), vec![1]);
    assert_eq!(
        recorder.events()[0],
        ObserverEvent::JobStarted { total: 3, restored: 2 }
    );
}

#[tokio::test(start_paused = true)]
async fn test_run_withFreshStart_shouldIgnoreSavedProgress() {
    let temp_dir = common::create_temp_dir().unwrap();
    let config = paragraph_config(temp_dir.path());
    // Written for another document
    ProgressStore::new(&config.progress.path)
        .save(&vec![Some("old".to_string()); 5])
        .unwrap();
    let provider = MockProvider::working();
    let translator = common::mock_translator(&provider, &config);

    let outcome = translator.run_job(THREE_PARAGRAPHS, "ctx", false).await.unwrap();

    assert_eq!(outcome.translated, 3);
    assert!(!outcome.text.contains("old"));
    assert_eq!(provider.request_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_run_withMismatchedSnapshot_shouldFailBeforeTranslating() {
    let temp_dir = common::create_temp_dir().unwrap();
    let config = paragraph_config(temp_dir.path());
    ProgressStore::new(&config.progress.path)
        .save(&[None, None])
        .unwrap();
    let provider = MockProvider::working();
    let translator = common::mock_translator(&provider, &config);

    let error = translator.run(THREE_PARAGRAPHS, "ctx", true).await.unwrap_err();

    assert!(matches!(
        error,
        AppError::Progress(ProgressError::SnapshotMismatch { expected: 3, found: 2 })
    ));
    assert_eq!(provider.request_count(), 0);
    assert!(config.progress.path.exists());
}

#[tokio::test(start_paused = true)]
async fn test_run_withSlowAnswer_shouldDiscardItAndRequestAgain() {
    let temp_dir = common::create_temp_dir().unwrap();
    let config = paragraph_config(temp_dir.path());
    let provider = MockProvider::scripted([
        MockStep::SlowReply {
            text: "STALE".to_string(),
            delay_ms: 40_000,
        },
        MockStep::Reply("FRESH".to_string()),
    ]);
    let recorder = Arc::new(EventRecorder::new());
    let translator = common::mock_translator(&provider, &config).with_observer(recorder.clone());

    let outcome = translator.run_job(THREE_PARAGRAPHS, "ctx", true).await.unwrap();

    assert!(outcome.text.starts_with("FRESH\n"));
    assert!(!outcome.text.contains("STALE"));
    assert_eq!(outcome.soft_timeouts, 1);
    assert_eq!(outcome.failed, 0);
    assert_eq!(recorder.attempted_indices(), vec![0, 0, 1, 2]);
}

#[tokio::test(start_paused = true)]
async fn test_run_withUnboundedSoftTimeouts_shouldKeepRetryingChunk() {
    let temp_dir = common::create_temp_dir().unwrap();
    let config = paragraph_config(temp_dir.path());
    assert_eq!(config.translation.max_soft_timeouts, None);
    let provider = MockProvider::slow_first(6, 45_000);
    let translator = common::mock_translator(&provider, &config);

    let outcome = translator.run_job("Only chunk.", "ctx", true).await.unwrap();

    assert_eq!(outcome.text, "[TRANSLATED] Only chunk.");
    assert_eq!(outcome.soft_timeouts, 6);
    assert_eq!(provider.request_count(), 7);
}

#[tokio::test(start_paused = true)]
async fn test_run_withSoftTimeoutCap_shouldStoreSentinel() {
    let temp_dir = common::create_temp_dir().unwrap();
    let mut config = paragraph_config(temp_dir.path());
    config.translation.max_soft_timeouts = Some(2);
    let sentinel = config.translation.error_sentinel.clone();
    let provider = MockProvider::slow(40_000);
    let recorder = Arc::new(EventRecorder::new());
    let translator = common::mock_translator(&provider, &config).with_observer(recorder.clone());

    let outcome = translator.run_job("Only chunk.", "ctx", true).await.unwrap();

    assert_eq!(outcome.text, sentinel);
    assert_eq!(outcome.failed, 1);
    assert_eq!(provider.request_count(), 2);
    assert!(recorder.events().iter().any(|e| matches!(
        e,
        ObserverEvent::ChunkFailed { index: 0, message } if message.contains("2 slow attempt")
    )));
}

#[tokio::test(start_paused = true)]
async fn test_run_withExhaustedRetries_shouldStoreSentinelAndContinue() {
    let temp_dir = common::create_temp_dir().unwrap();
    let config = paragraph_config(temp_dir.path());
    let sentinel = config.translation.error_sentinel.clone();
    let provider = MockProvider::scripted([MockStep::Fail, MockStep::Fail, MockStep::Fail]);
    let recorder = Arc::new(EventRecorder::new());
    let translator = common::mock_translator(&provider, &config).with_observer(recorder.clone());

    let outcome = translator.run_job(THREE_PARAGRAPHS, "ctx", true).await.unwrap();

    assert_eq!(
        outcome.text,
        format!("{}\n[TRANSLATED] Beta two.\n[TRANSLATED] Gamma three.", sentinel)
    );
    assert_eq!(outcome.failed, 1);
    assert_eq!(outcome.translated, 2);
    assert_eq!(recorder.attempted_indices(), vec![0, 0, 0, 1, 2]);
    assert_eq!(recorder.issues().iter().filter(|i| i.level == "ERROR").count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_run_withFullwidthSpaces_shouldNormalizeThem() {
    let temp_dir = common::create_temp_dir().unwrap();
    let config = common::test_config(temp_dir.path());
    let provider = MockProvider::scripted([MockStep::Reply("こんにちは\u{3000}世界".to_string())]);
    let translator = common::mock_translator(&provider, &config);

    let output = translator.run("Hello world", "ctx", true).await.unwrap();

    assert_eq!(output, "こんにちは 世界");
}

#[tokio::test(start_paused = true)]
async fn test_run_withNormalizationDisabled_shouldKeepFullwidthSpaces() {
    let temp_dir = common::create_temp_dir().unwrap();
    let mut config = common::test_config(temp_dir.path());
    config.output.normalize_fullwidth_spaces = false;
    let provider = MockProvider::scripted([MockStep::Reply("こんにちは\u{3000}世界".to_string())]);
    let translator = common::mock_translator(&provider, &config);

    let output = translator.run("Hello world", "ctx", true).await.unwrap();

    assert_eq!(output, "こんにちは\u{3000}世界");
}

#[tokio::test(start_paused = true)]
async fn test_run_withBlankText_shouldReturnEmptyWithoutTouchingStore() {
    let temp_dir = common::create_temp_dir().unwrap();
    let config = common::test_config(temp_dir.path());
    let store = ProgressStore::new(&config.progress.path);
    store.save(&[Some("kept".to_string())]).unwrap();
    let provider = MockProvider::working();
    let translator = common::mock_translator(&provider, &config);

    let output = translator.run(" \n\n ", "ctx", true).await.unwrap();

    assert_eq!(output, "");
    assert_eq!(provider.request_count(), 0);
    assert_eq!(store.load(1).unwrap(), vec![Some("kept".to_string())]);
}

#[tokio::test(start_paused = true)]
async fn test_run_withUnwritableProgressPath_shouldFail() {
    let temp_dir = common::create_temp_dir().unwrap();
    let config = common::test_config(temp_dir.path());
    std::fs::create_dir(&config.progress.path).unwrap();
    let translator = common::mock_translator(&MockProvider::working(), &config);

    let error = translator.run("Hello world", "ctx", false).await.unwrap_err();

    assert!(matches!(error, AppError::Progress(ProgressError::Io { .. })));
}
