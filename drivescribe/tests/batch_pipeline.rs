use std::fs;
use std::path::Path;
use std::sync::Arc;

use pretty_assertions::assert_eq;

mod common;
use common::{init_test_logger, test_config, write_image, FakeDocumentService, Scripted};

use drivescribe::batch::BatchProcessor;
use drivescribe::drive::OcrClient;
use drivescribe::report::{BatchEvent, RecordingReporter};
use drivescribe::text::EMPTY_PLACEHOLDER;
use drivescribe::Config;

fn processor(
    config: Config,
    service: Arc<FakeDocumentService>,
) -> (BatchProcessor, Arc<RecordingReporter>) {
    let reporter = Arc::new(RecordingReporter::new());
    let processor = BatchProcessor::new(config, OcrClient::new(service), reporter.clone());
    (processor, reporter)
}

fn combined_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with("combined_"))
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn test_one_success_one_remote_failure() {
    init_test_logger();
    let root = tempfile::tempdir().unwrap();
    write_image(root.path(), "a.png");
    write_image(root.path(), "b.jpg");

    let service = Arc::new(FakeDocumentService::new(&[
        ("a.png", Scripted::Text("meta1\nmeta2\nHello world\n")),
        ("b.jpg", Scripted::RemoteError("Invalid image")),
    ]));
    let (processor, reporter) = processor(test_config(root.path()), service.clone());

    let result = processor.process_all().await.unwrap();

    assert_eq!(result.total, 2);
    assert_eq!(result.successful, 1);
    assert_eq!(result.failed, 1);
    assert_eq!(result.skipped, 0);
    assert_eq!(result.processed_files, vec![root.path().join("images/a.png")]);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].contains("b.jpg"));
    assert!(result.errors[0].contains("Invalid image"));

    assert_eq!(
        fs::read_to_string(root.path().join("raw_texts/a.txt")).unwrap(),
        "Hello world\n"
    );
    assert_eq!(
        fs::read_to_string(root.path().join("texts/a.txt")).unwrap(),
        "Hello world"
    );
    assert!(!root.path().join("raw_texts/b.txt").exists());
    assert!(!root.path().join("texts/b.txt").exists());
    assert!(service.live_documents().is_empty());

    let events = reporter.events();
    assert!(events.contains(&BatchEvent::Summary {
        successful: 1,
        failed: 1,
        skipped: 0,
        recent_errors: result.errors.clone(),
    }));
    assert_eq!(result.combined_files.len(), 1);
    assert_eq!(combined_files(&root.path().join("texts")).len(), 1);
}

#[tokio::test]
async fn test_second_run_skips_everything() {
    let root = tempfile::tempdir().unwrap();
    write_image(root.path(), "one.png");
    write_image(root.path(), "nested/two.TIFF");

    let service = Arc::new(FakeDocumentService::default());
    let (first, _) = processor(test_config(root.path()), service.clone());
    let first_result = first.process_all().await.unwrap();
    assert_eq!(first_result.successful, 2);

    let raw_before = fs::read_dir(root.path().join("raw_texts")).unwrap().count();
    let combined_before = combined_files(&root.path().join("texts"));

    let (second, reporter) = processor(test_config(root.path()), service.clone());
    let second_result = second.process_all().await.unwrap();

    assert_eq!(second_result.total, 2);
    assert_eq!(second_result.successful, 0);
    assert_eq!(second_result.failed, 0);
    assert_eq!(second_result.skipped, 2);
    assert!(second_result.combined_files.is_empty());
    assert_eq!(service.uploads().len(), 2);
    assert_eq!(
        fs::read_dir(root.path().join("raw_texts")).unwrap().count(),
        raw_before
    );
    assert_eq!(combined_files(&root.path().join("texts")), combined_before);
    assert_eq!(
        reporter
            .events()
            .iter()
            .filter(|e| matches!(e, BatchEvent::FileSkipped { .. }))
            .count(),
        2
    );
}

#[tokio::test]
async fn test_half_processed_image_is_redone() {
    let root = tempfile::tempdir().unwrap();
    write_image(root.path(), "page.png");
    fs::create_dir_all(root.path().join("raw_texts")).unwrap();
    fs::write(root.path().join("raw_texts/page.txt"), "stale").unwrap();

    let service = Arc::new(FakeDocumentService::default());
    let (processor, _) = processor(test_config(root.path()), service.clone());
    let result = processor.process_all().await.unwrap();

    assert_eq!(result.successful, 1);
    assert_eq!(
        fs::read_to_string(root.path().join("texts/page.txt")).unwrap(),
        "ocr text for page.png"
    );
}

#[tokio::test]
async fn test_auth_failure_aborts_batch() {
    let root = tempfile::tempdir().unwrap();
    write_image(root.path(), "a.png");
    write_image(root.path(), "b.png");

    let service = Arc::new(FakeDocumentService::new(&[("a.png", Scripted::AuthError)]));
    let (processor, _) = processor(test_config(root.path()), service.clone());

    let err = processor.process_all().await.unwrap_err();
    assert!(err.is_fatal());
    assert_eq!(service.uploads(), vec!["a.png"]);
}

#[tokio::test]
async fn test_missing_images_dir_is_created() {
    let root = tempfile::tempdir().unwrap();
    let service = Arc::new(FakeDocumentService::default());
    let (processor, reporter) = processor(test_config(root.path()), service);

    let result = processor.process_all().await.unwrap();

    assert_eq!(result.total, 0);
    assert!(root.path().join("images").is_dir());
    assert!(root.path().join("raw_texts").is_dir());
    assert!(root.path().join("texts").is_dir());
    let events = reporter.events();
    assert!(matches!(events[0], BatchEvent::ImagesDirCreated { .. }));
    assert!(matches!(events[1], BatchEvent::NoImagesFound { .. }));
}

#[tokio::test]
async fn test_unsupported_and_duplicate_files_are_ignored() {
    let root = tempfile::tempdir().unwrap();
    write_image(root.path(), "scan.JPG");
    write_image(root.path(), "scan.png");
    write_image(root.path(), "readme.txt");

    let service = Arc::new(FakeDocumentService::default());
    let (processor, _) = processor(test_config(root.path()), service.clone());
    let result = processor.process_all().await.unwrap();

    assert_eq!(result.total, 1);
    assert_eq!(service.uploads(), vec!["scan.JPG"]);
}

#[tokio::test]
async fn test_combines_raw_and_cleaned_without_headers() {
    let root = tempfile::tempdir().unwrap();
    write_image(root.path(), "x.png");
    write_image(root.path(), "y.png");

    let mut config = test_config(root.path());
    config.combine.combine_raw = true;
    config.combine.include_headers = false;

    let service = Arc::new(FakeDocumentService::new(&[
        ("x.png", Scripted::Text("m\nm\nfoo\n")),
        ("y.png", Scripted::Text("m\nm\nbar\n")),
    ]));
    let (processor, _) = processor(config, service);
    let result = processor.process_all().await.unwrap();

    assert_eq!(result.combined_files.len(), 2);
    let cleaned = fs::read_to_string(&result.combined_files[0]).unwrap();
    assert_eq!(cleaned, "foo\n\n--- Next File ---\n\nbar");
    let raw = fs::read_to_string(&result.combined_files[1]).unwrap();
    assert_eq!(raw, "foo\n\n\n--- Next File ---\n\nbar\n");
    assert!(result.combined_files[1].starts_with(root.path().join("raw_texts")));
}

#[tokio::test]
async fn test_header_combination_over_existing_texts() {
    let root = tempfile::tempdir().unwrap();
    write_image(root.path(), "x.png");
    fs::create_dir_all(root.path().join("texts")).unwrap();
    fs::write(root.path().join("texts/y.txt"), "").unwrap();

    let service = Arc::new(FakeDocumentService::new(&[(
        "x.png",
        Scripted::Text("m\nm\nfoo"),
    )]));
    let (processor, _) = processor(test_config(root.path()), service);
    let result = processor.process_all().await.unwrap();

    let body = fs::read_to_string(&result.combined_files[0]).unwrap();
    assert!(body.starts_with("Combined CLEANED OCR Text Files\n"));
    assert!(body.contains("Total files: 2\n"));
    let x = body.find("FILE 1: x.txt").unwrap();
    let foo = body.find("\nfoo\n").unwrap();
    let y = body.find("FILE 2: y.txt").unwrap();
    let placeholder = body.find(EMPTY_PLACEHOLDER).unwrap();
    assert!(x < foo && foo < y && y < placeholder);
    assert!(body[foo..y].contains(&"-".repeat(40)));
}

#[tokio::test]
async fn test_images_path_that_is_a_file_yields_empty_run() {
    let root = tempfile::tempdir().unwrap();
    fs::write(root.path().join("images"), b"not a directory").unwrap();

    let service = Arc::new(FakeDocumentService::default());
    let (processor, reporter) = processor(test_config(root.path()), service.clone());

    let result = processor.process_all().await.unwrap();

    assert_eq!(result.total, 0);
    assert!(service.uploads().is_empty());
    assert!(reporter
        .events()
        .iter()
        .any(|e| matches!(e, BatchEvent::NoImagesFound { .. })));
}

#[cfg(unix)]
#[tokio::test]
async fn test_unreadable_subdirectory_does_not_stop_batch() {
    use std::os::unix::fs::PermissionsExt;

    let root = tempfile::tempdir().unwrap();
    write_image(root.path(), "a.png");
    write_image(root.path(), "locked/b.png");
    let locked = root.path().join("images/locked");
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    let service = Arc::new(FakeDocumentService::default());
    let (processor, _) = processor(test_config(root.path()), service.clone());
    let result = processor.process_all().await;

    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
    let result = result.unwrap();
    assert!(result.successful >= 1);
    assert!(service.uploads().contains(&"a.png".to_string()));
    assert!(root.path().join("texts/a.txt").exists());
}
