use kindle_engine::{filter_diagnostics, ConvertError, ExternalConverter, PackageConverter, StagingArea};
use pretty_assertions::assert_eq;
use std::sync::Mutex;

use tempfile::TempDir;

// Writing an executable while another test forks can fail with ETXTBSY.
static SPAWN_LOCK: Mutex<()> = Mutex::new(());

#[test]
fn benign_warnings_and_empty_lines_are_dropped_in_order() {
    let raw = vec![
        "Info(prcgen): Added metadata dc:Title",
        "",
        "Warning(prcgen):W14002: Hyperlink not resolved: /tmp/x.html#top",
        "   ",
        "Info(prcgen): Final stats - text compressed",
        "Warning(prcgen):W14002: Hyperlink not resolved: /tmp/x.html#foot",
        "Info(prcgen): MOBI File generated with WARNINGS!",
    ];

    assert_eq!(
        filter_diagnostics(raw),
        vec![
            "Info(prcgen): Added metadata dc:Title".to_string(),
            "   ".to_string(),
            "Info(prcgen): Final stats - text compressed".to_string(),
            "Info(prcgen): MOBI File generated with WARNINGS!".to_string(),
        ]
    );
}

#[test]
fn whitespace_only_lines_are_not_empty() {
    assert_eq!(
        filter_diagnostics(vec!["a", "   ", "\t", "b"]),
        vec!["a".to_string(), "   ".to_string(), "\t".to_string(), "b".to_string()]
    );
}

#[test]
fn nothing_to_keep_yields_empty_diagnostics() {
    let raw: Vec<String> = vec![String::new(), "Hyperlink not resolved: a".to_string()];
    assert!(filter_diagnostics(raw).is_empty());
}

#[tokio::test]
async fn missing_source_is_rejected_before_spawning() {
    let temp = TempDir::new().unwrap();
    let staging = StagingArea::new(temp.path(), "mobi");
    let job = staging.job_for("Never staged");

    let converter = ExternalConverter::new(temp.path().join("does-not-matter"));
    let err = converter.convert(&job).await.unwrap_err();
    assert!(matches!(err, ConvertError::MissingSource(_)));
}

#[tokio::test]
async fn existing_output_short_circuits_the_converter() {
    let temp = TempDir::new().unwrap();
    let staging = StagingArea::new(temp.path(), "mobi");
    let job = staging.stage("Cached", "<p>x</p>").unwrap();
    std::fs::write(&job.output_path, b"old package").unwrap();

    // Program does not exist; reaching it would be a spawn error.
    let converter = ExternalConverter::new(temp.path().join("no-such-converter"));
    let outcome = converter.convert(&job).await.unwrap();

    assert!(outcome.output_exists);
    assert!(outcome.diagnostics.is_empty());
    assert_eq!(std::fs::read(&job.output_path).unwrap(), b"old package");
}

#[tokio::test]
async fn missing_converter_binary_is_a_spawn_error() {
    let temp = TempDir::new().unwrap();
    let staging = StagingArea::new(temp.path(), "mobi");
    let job = staging.stage("Article", "<p>x</p>").unwrap();

    let _guard = SPAWN_LOCK.lock().unwrap_or_else(|p| p.into_inner());
    let converter = ExternalConverter::new(temp.path().join("no-such-converter"));
    let err = converter.convert(&job).await.unwrap_err();
    drop(_guard);
    assert!(matches!(err, ConvertError::Spawn { .. }));
}

#[cfg(unix)]
mod script {
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};
    use std::time::Duration;

    use kindle_engine::{ExternalConverter, PackageConverter, StagingArea};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::SPAWN_LOCK;

    fn write_script(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("fake-kindlegen.sh");
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[tokio::test]
    async fn output_beside_source_counts_as_success_even_with_nonzero_exit() {
        let temp = TempDir::new().unwrap();
        let bin = TempDir::new().unwrap();
        let staging = StagingArea::new(temp.path(), "mobi");
        let job = staging.stage("Long Read", "<p>body</p>").unwrap();

        let _guard = SPAWN_LOCK.lock().unwrap_or_else(|p| p.into_inner());
        let program = write_script(
            bin.path(),
            r#"echo "Info(prcgen): Added metadata"
echo ""
echo "Warning(prcgen): Hyperlink not resolved: $1#x"
cp "$1" "${1%.html}.mobi"
echo "Info(prcgen): MOBI File generated with WARNINGS!"
exit 1"#,
        );
        let outcome = ExternalConverter::new(program).convert(&job).await.unwrap();
        drop(_guard);

        assert!(outcome.output_exists);
        assert_eq!(
            outcome.diagnostics,
            vec![
                "Info(prcgen): Added metadata".to_string(),
                "Info(prcgen): MOBI File generated with WARNINGS!".to_string(),
            ]
        );
        assert_eq!(fs::read_to_string(&job.output_path).unwrap(), "<p>body</p>");
    }

    #[tokio::test]
    async fn clean_exit_without_output_reports_missing_output() {
        let temp = TempDir::new().unwrap();
        let bin = TempDir::new().unwrap();
        let staging = StagingArea::new(temp.path(), "mobi");
        let job = staging.stage("Broken", "<p>body</p>").unwrap();

        let _guard = SPAWN_LOCK.lock().unwrap_or_else(|p| p.into_inner());
        let program = write_script(bin.path(), "echo \"Error(core): cannot parse\"\nexit 0");
        let outcome = ExternalConverter::new(program).convert(&job).await.unwrap();
        drop(_guard);

        assert!(!outcome.output_exists);
        assert_eq!(outcome.diagnostics, vec!["Error(core): cannot parse".to_string()]);
    }

    #[tokio::test]
    async fn abandoned_conversion_stops_the_converter() {
        let temp = TempDir::new().unwrap();
        let bin = TempDir::new().unwrap();
        let staging = StagingArea::new(temp.path(), "mobi");
        let job = staging.stage("Slow", "<p>body</p>").unwrap();
        let late_marker = temp.path().join("Slow.late");

        let _guard = SPAWN_LOCK.lock().unwrap_or_else(|p| p.into_inner());
        let program = write_script(bin.path(), "sleep 1\necho late > \"${1%.html}.late\"");
        let converter = ExternalConverter::new(program);
        let result =
            tokio::time::timeout(Duration::from_millis(200), converter.convert(&job)).await;
        drop(_guard);
        assert!(result.is_err(), "conversion should still be running");

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(!late_marker.exists(), "converter kept running after the run was dropped");
    }
}
