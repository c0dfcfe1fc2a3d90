use appshelf_catalog::error::ErrorKind;
use appshelf_catalog::{Category, CategoryRegistry, CollisionPolicy, Placer, Shelf, UploadRequest, aggregate, filter};
use appshelf_catalog::{Catalog, SearchTerm};
use appshelf_storage::BackendHandle;
use appshelf_storage::backend::{LocalBackend, MockBackend};
use std::sync::Arc;
use tempfile::TempDir;

fn local_shelf() -> (TempDir, Shelf) {
    let dir = tempfile::tempdir().unwrap();
    let backend: BackendHandle = Arc::new(LocalBackend::new("local", dir.path()).unwrap());
    (dir, Shelf::new(backend, Arc::new(CategoryRegistry::default())))
}

fn write(dir: &TempDir, path: &str, size: usize) {
    let path = dir.path().join(path);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, vec![0u8; size]).unwrap();
}

#[tokio::test]
async fn test_scenario_listing_stats_and_filter() {
    let (dir, shelf) = local_shelf();
    write(&dir, "android/a.apk", 1024);
    write(&dir, "android/b.apk", 2048);
    write(&dir, "windows/c.exe", 4096);

    let mobile = shelf.list_files(Category::Mobile).await.unwrap();
    assert_eq!(mobile.len(), 2);
    assert_eq!(mobile.iter().map(|f| f.size).sum::<u64>(), 3072);

    let report = shelf.refresh().await;
    assert!(report.is_complete());
    let stats = shelf.stats().await;
    assert_eq!(stats.count(Category::Mobile), 2);
    assert_eq!(stats.count(Category::Desktop), 1);
    assert_eq!(stats.total_count, 3);
    assert_eq!(stats.total_size_bytes, 7168);

    let view = filter(&shelf.catalog().current().await, &SearchTerm::new("a"));
    let names: Vec<_> = view.get(Category::Mobile).iter().map(|r| r.name()).collect();
    assert_eq!(names, ["a.apk"]);
    assert!(view.get(Category::Desktop).is_empty());
}

#[tokio::test]
async fn test_upload_then_visible_after_refresh() {
    let (dir, shelf) = local_shelf();
    let response = shelf.upload_file(Category::Mobile, "app.apk", b"PK\x03\x04".to_vec()).await;
    assert!(response.success, "{response:?}");
    assert_eq!(response.error, None);
    assert!(dir.path().join("android/app.apk").is_file());
    // The upload itself refreshed the catalog.
    let snapshot = shelf.catalog().current().await;
    assert_eq!(snapshot.get(Category::Mobile)[0].name(), "app.apk");
    let files = shelf.list_files(Category::Mobile).await.unwrap();
    assert_eq!(files[0].name, "app.apk");
    assert_eq!(files[0].size, 4);
}

#[tokio::test]
async fn test_rejected_upload_leaves_no_trace() {
    let (dir, shelf) = local_shelf();
    let response = shelf.upload_file(Category::Mobile, "app.txt", b"hello".to_vec()).await;
    assert!(!response.success);
    assert!(response.error.unwrap().contains("wrong file type"));
    assert!(!dir.path().join("android").exists());
    assert_eq!(shelf.catalog().generation().await, 0, "no refresh after a failed upload");
}

#[tokio::test]
async fn test_response_serialization() {
    let (_dir, shelf) = local_shelf();
    let ok = shelf.upload_file(Category::Desktop, "setup.exe", b"MZ".to_vec()).await;
    assert_eq!(serde_json::to_value(&ok).unwrap(), serde_json::json!({"success": true}));
    let failed = shelf.upload_file(Category::Desktop, "../setup.exe", b"MZ".to_vec()).await;
    let json = serde_json::to_value(&failed).unwrap();
    assert_eq!(json["success"], false);
    assert!(json["error"].as_str().unwrap().contains("invalid file name"));
}

#[tokio::test]
async fn test_missing_directories_scan_as_empty() {
    let (_dir, shelf) = local_shelf();
    assert!(shelf.list_files(Category::Desktop).await.unwrap().is_empty());
    assert!(shelf.refresh().await.is_complete());
    assert!(shelf.view().await.is_empty());
    let err = shelf.category_status(Category::Desktop).await.unwrap_err();
    assert!(matches!(&*err, ErrorKind::DirectoryUnavailable(Category::Desktop)));
}

#[tokio::test]
async fn test_file_blocking_category_directory_is_a_failure() {
    let (dir, shelf) = local_shelf();
    write(&dir, "android", 3);
    write(&dir, "windows/setup.exe", 4);
    let err = shelf.list_files(Category::Mobile).await.unwrap_err();
    assert!(matches!(&*err, ErrorKind::ScanIo { category: Category::Mobile, .. }));
    let report = shelf.refresh().await;
    assert!(!report.is_complete());
    assert_eq!(shelf.view().await.len(), 1);
    let err = shelf.category_status(Category::Mobile).await.unwrap_err();
    assert!(matches!(&*err, ErrorKind::ScanIo { category: Category::Mobile, .. }));
}

#[tokio::test]
async fn test_search_persists_across_refreshes() {
    let (dir, shelf) = local_shelf();
    write(&dir, "android/alpha.apk", 1);
    write(&dir, "android/beta.apk", 2);
    shelf.refresh().await;

    shelf.set_search("  ALP ").await;
    assert_eq!(shelf.search().await.as_str(), "alp");
    assert_eq!(shelf.view().await.len(), 1);

    write(&dir, "android/alpine.apk", 3);
    write(&dir, "windows/alpaca.exe", 4);
    shelf.refresh().await;
    let stats = shelf.stats().await;
    assert_eq!(stats.total_count, 3);
    assert_eq!(stats.total_size_bytes, 8);

    shelf.clear_search().await;
    assert_eq!(shelf.stats().await, aggregate(&shelf.catalog().current().await));
    assert_eq!(shelf.stats().await.total_count, 4);
}

#[tokio::test]
async fn test_partial_failure_isolation() {
    let backend = Arc::new(MockBackend::with_files([("android/a.apk", &b"1"[..]), ("windows/b.exe", &b"22"[..])]));
    let handle: BackendHandle = backend.clone();
    let shelf = Shelf::new(handle, Arc::new(CategoryRegistry::default()));
    shelf.refresh().await;

    backend.set_failing("windows", true).await;
    let response = shelf.upload_file(Category::Mobile, "c.apk", b"333".to_vec()).await;
    assert!(response.success);

    let view = shelf.view().await;
    assert_eq!(view.get(Category::Mobile).len(), 2);
    assert_eq!(view.get(Category::Desktop).len(), 1, "failed category keeps its last records");
    let status = shelf.category_status(Category::Desktop).await.unwrap();
    assert!(status.last_error.unwrap().contains("failed to scan desktop"));
    assert!(shelf.category_status(Category::Mobile).await.unwrap().is_healthy());

    let err = shelf.list_files(Category::Desktop).await.unwrap_err();
    assert!(matches!(&*err, ErrorKind::ScanIo { category: Category::Desktop, .. }));
}

#[tokio::test]
async fn test_shared_parts_with_rename_policy() {
    let backend = Arc::new(MockBackend::with_files([("windows/setup.exe", b"old")]));
    let handle: BackendHandle = backend.clone();
    let registry = Arc::new(CategoryRegistry::default());
    let catalog = Arc::new(Catalog::new(Arc::clone(&handle), Arc::clone(&registry)));
    let placer = Placer::new(handle, registry).with_policy(CollisionPolicy::Rename);
    let shelf = Shelf::from_parts(catalog, placer);

    let placed = shelf.upload(UploadRequest::new(Category::Desktop, "setup.exe", b"new".to_vec())).await.unwrap();
    assert_eq!(placed.name, "setup-1.exe");
    assert_eq!(backend.contents("windows/setup.exe").await.unwrap(), b"old");
    let names: Vec<String> =
        shelf.view().await.get(Category::Desktop).iter().map(|r| r.name().to_string()).collect();
    assert_eq!(names, ["setup-1.exe", "setup.exe"]);
}
