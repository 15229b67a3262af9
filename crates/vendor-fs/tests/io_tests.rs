use std::fs;
use tempfile::TempDir;
use vendor_fs::io;

#[test]
fn test_write_atomic_creates_parents() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("nested/dir/vendor-lock.json");

    io::write_atomic(&path, b"{}").unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), "{}");
}

#[test]
fn test_write_atomic_overwrites_and_leaves_no_temp() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("vendor-lock.json");
    fs::write(&path, "original").unwrap();

    io::write_atomic(&path, b"updated").unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), "updated");
    let leftovers: Vec<_> = fs::read_dir(temp.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty());
}

#[test]
fn test_read_text_nonexistent_file() {
    let result = io::read_text(std::path::Path::new("/nonexistent/vendor.json"));
    assert!(matches!(result, Err(vendor_fs::Error::Io { .. })));
}

#[test]
fn test_move_file_creates_destination_parents() {
    let temp = TempDir::new().unwrap();
    let src = temp.path().join("unpacked/a.exe");
    fs::create_dir_all(src.parent().unwrap()).unwrap();
    fs::write(&src, "binary").unwrap();

    let dst = temp.path().join("vendor/tool/bin/app.exe");
    io::move_file(&src, &dst).unwrap();

    assert!(!src.exists());
    assert_eq!(fs::read_to_string(&dst).unwrap(), "binary");
}

#[test]
fn test_move_missing_source_reports_both_paths() {
    let temp = TempDir::new().unwrap();
    let src = temp.path().join("missing.bin");
    let dst = temp.path().join("out.bin");

    let err = io::move_file(&src, &dst).unwrap_err().to_string();
    assert!(err.contains("missing.bin"), "got: {err}");
    assert!(err.contains("out.bin"), "got: {err}");
}

#[test]
fn test_remove_dir_if_empty() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("empty");
    fs::create_dir(&dir).unwrap();

    assert!(io::remove_dir_if_empty(&dir).unwrap());
    assert!(!dir.exists());
    assert!(!io::remove_dir_if_empty(&dir).unwrap());
}
