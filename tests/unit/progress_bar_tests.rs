/*!
 * Tests for the progress bar observer
 */

use std::time::Duration;

use chrono::Local;
use doctrans::errors::TranslationError;
use doctrans::progress_display::ProgressBarObserver;
use doctrans::translation::TranslationObserver;

/// Test that restored chunks count as progress from the start
#[test]
fn test_onJobStarted_withRestoredChunks_shouldStartAtRestoredPosition() {
    let observer = ProgressBarObserver::hidden();

    observer.on_job_started(5, 2);

    assert_eq!(observer.bar().length(), Some(5));
    assert_eq!(observer.bar().position(), 2);
}

/// Test that done and failed chunks both advance the bar
#[test]
fn test_terminalChunks_withDoneAndFailed_shouldAdvanceBar() {
    let observer = ProgressBarObserver::hidden();
    observer.on_job_started(3, 0);

    observer.on_attempt(0, 3, 1, Local::now());
    observer.on_chunk_done(0, 3);
    observer.on_attempt(1, 3, 1, Local::now());
    observer.on_soft_timeout(1, Duration::from_secs(31), 1);
    observer.on_chunk_failed(
        1,
        &TranslationError::SoftTimeoutLimit {
            count: 1,
            last_elapsed: Duration::from_secs(31),
        },
    );

    assert_eq!(observer.bar().position(), 2);
    assert!(observer.bar().message().contains("chunk 2/3"));
}

/// Test that finishing the job clears the bar
#[test]
fn test_onJobFinished_shouldFinishBar() {
    let observer = ProgressBarObserver::hidden();
    observer.on_job_started(1, 0);
    observer.on_chunk_done(0, 1);

    observer.on_job_finished(1, 0);

    assert!(observer.bar().is_finished());
}
