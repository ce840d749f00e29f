/*!
 * Tests for application controller functionality
 */

use std::path::PathBuf;

use anyhow::Result;
use doctrans::app_config::Config;
use doctrans::app_controller::{Controller, JobRequest, OutputTarget};

fn request(input: &str, output: Option<&str>) -> JobRequest {
    JobRequest {
        input: PathBuf::from(input),
        output: output.map(PathBuf::from),
        context: "A short story".to_string(),
        resume: true,
        force_overwrite: false,
    }
}

/// Test creating a controller with the default configuration
#[test]
fn test_new_for_test_withDefaultConfig_shouldSucceed() -> Result<()> {
    let controller = Controller::new_for_test()?;
    assert_eq!(controller.config().target_language, "ja");
    Ok(())
}

/// Test creating a controller with a specific configuration
#[test]
fn test_with_config_withValidConfig_shouldKeepIt() -> Result<()> {
    let mut config = Config::default();
    config.target_language = "fr".to_string();

    let controller = Controller::with_config(config)?;

    assert_eq!(controller.config().target_language, "fr");
    Ok(())
}

/// Test output path resolution
#[test]
fn test_output_target_withVariousRequests_shouldResolveCorrectly() -> Result<()> {
    let controller = Controller::new_for_test()?;

    let test_cases = [
        (request("novel.txt", None), OutputTarget::File(PathBuf::from("novel.ja.txt"))),
        (
            request("books/novel.txt", None),
            OutputTarget::File(PathBuf::from("books/novel.ja.txt")),
        ),
        (
            request("with spaces.md", None),
            OutputTarget::File(PathBuf::from("with spaces.ja.txt")),
        ),
        (
            request("novel.txt", Some("out/translated.txt")),
            OutputTarget::File(PathBuf::from("out/translated.txt")),
        ),
        (request("novel.txt", Some("-")), OutputTarget::Stdout),
    ];

    for (request, expected) in test_cases {
        assert_eq!(controller.output_target(&request), expected, "for {:?}", request.input);
    }
    Ok(())
}

/// Test the backend check against a closed port
#[test]
fn test_check_backend_withUnreachableEndpoint_shouldFail() -> Result<()> {
    let mut config = Config::default();
    config.translation.endpoint = "http://127.0.0.1:1/v1".to_string();
    config.translation.request_timeout_secs = 5;
    let controller = Controller::with_config(config)?;

    let result = tokio_test::block_on(controller.check_backend());

    let message = format!("{:#}", result.unwrap_err());
    assert!(message.contains("Cannot reach backend at http://127.0.0.1:1/v1"));
    Ok(())
}
