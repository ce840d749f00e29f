/*!
 * Interrupted and resumed runs
 *
 * An interruption is simulated by dropping the run future while a chunk is in
 * flight, which is what a killed process looks like to the progress file.
 */

use std::time::Duration;

use doctrans::app_config::Config;
use doctrans::providers::mock::MockProvider;
use doctrans::translation::ProgressStore;

use crate::common;

/// Each request takes 10s, well under the 30s soft timeout
const CALL_MS: u64 = 10_000;

fn multi_chunk_config(dir: &std::path::Path) -> Config {
    let mut config = common::test_config(dir);
    config.chunking.chunk_size = 300;
    config.chunking.overlap = 30;
    config
}

#[tokio::test(start_paused = true)]
async fn test_resume_afterInterruption_shouldMatchUninterruptedRun() {
    let text = common::numbered_sentences(60);

    let reference_dir = common::create_temp_dir().unwrap();
    let reference_config = multi_chunk_config(reference_dir.path());
    let reference = common::mock_translator(&MockProvider::working(), &reference_config)
        .run(&text, "ctx", true)
        .await
        .unwrap();

    let temp_dir = common::create_temp_dir().unwrap();
    let config = multi_chunk_config(temp_dir.path());

    // First run is cut off while the third chunk is in flight
    let slow = MockProvider::slow(CALL_MS);
    let first = common::mock_translator(&slow, &config);
    let total = first.splitter().split(&text).len();
    assert!(total > 3);
    let interrupted = tokio::time::timeout(Duration::from_millis(CALL_MS * 2 + CALL_MS / 2), first.run(&text, "ctx", true)).await;
    assert!(interrupted.is_err());

    let saved = ProgressStore::new(&config.progress.path).load(total).unwrap();
    assert_eq!(saved.iter().filter(|s| s.is_some()).count(), 2);
    assert!(saved[0].is_some() && saved[1].is_some());

    // Second run picks up from the snapshot
    let provider = MockProvider::working();
    let outcome = common::mock_translator(&provider, &config)
        .run_job(&text, "ctx", true)
        .await
        .unwrap();

    assert_eq!(outcome.text, reference);
    assert_eq!(outcome.restored, 2);
    assert_eq!(outcome.translated, total - 2);
    assert_eq!(provider.request_count(), total - 2);
    assert!(!config.progress.path.exists());
}

#[tokio::test(start_paused = true)]
async fn test_resume_withFreshFlag_shouldRetranslateEverything() {
    let text = common::numbered_sentences(60);
    let temp_dir = common::create_temp_dir().unwrap();
    let config = multi_chunk_config(temp_dir.path());

    let first = common::mock_translator(&MockProvider::slow(CALL_MS), &config);
    let total = first.splitter().split(&text).len();
    let _ = tokio::time::timeout(Duration::from_millis(CALL_MS + CALL_MS / 2), first.run(&text, "ctx", true)).await;
    assert!(config.progress.path.exists());

    let provider = MockProvider::working();
    let outcome = common::mock_translator(&provider, &config)
        .run_job(&text, "ctx", false)
        .await
        .unwrap();

    assert_eq!(outcome.restored, 0);
    assert_eq!(provider.request_count(), total);
}

#[tokio::test(start_paused = true)]
async fn test_resume_withSentinelInSnapshot_shouldKeepItWithoutRetrying() {
    let temp_dir = common::create_temp_dir().unwrap();
    let mut config = common::test_config(temp_dir.path());
    config.chunking.chunk_size = 12;
    config.chunking.overlap = 0;
    let sentinel = config.translation.error_sentinel.clone();
    ProgressStore::new(&config.progress.path)
        .save(&[Some(sentinel.clone()), None, None])
        .unwrap();
    let provider = MockProvider::working();

    let outcome = common::mock_translator(&provider, &config)
        .run_job("Alpha one.\n\nBeta two.\n\nGamma three.", "ctx", true)
        .await
        .unwrap();

    assert!(outcome.text.starts_with(&format!("{}\n", sentinel)));
    assert_eq!(outcome.failed, 1);
    assert_eq!(provider.request_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_resume_twice_shouldNotRequestAnyChunkTwice() {
    let text = common::numbered_sentences(60);
    let temp_dir = common::create_temp_dir().unwrap();
    let config = multi_chunk_config(temp_dir.path());

    let first = MockProvider::slow(CALL_MS);
    let second = MockProvider::slow(CALL_MS);
    let third = MockProvider::working();
    let total = common::mock_translator(&first, &config).splitter().split(&text).len();

    let window = Duration::from_millis(CALL_MS + CALL_MS / 2);
    let _ = tokio::time::timeout(window, common::mock_translator(&first, &config).run(&text, "ctx", true)).await;
    let _ = tokio::time::timeout(window, common::mock_translator(&second, &config).run(&text, "ctx", true)).await;
    common::mock_translator(&third, &config)
        .run(&text, "ctx", true)
        .await
        .unwrap();

    let mut requested = first.user_messages();
    requested.extend(second.user_messages());
    requested.extend(third.user_messages());
    let unique: std::collections::HashSet<_> = requested.iter().collect();

    // The two cut-off calls never reached the snapshot, so they are sent again
    assert_eq!(requested.len(), total + 2);
    assert_eq!(unique.len(), total);
}
