mod common;

use std::sync::Arc;

use common::{ZipBuilder, init_logging};
use zipvfs::{ArchiveRegistry, Stat, ZipFs, ZipFsError, split_archive_path};

fn bundle() -> ZipBuilder {
    ZipBuilder::new()
        .dir("lib/")
        .stored("lib/a.txt", b"alpha")
        .deflated("lib/deep/b.txt", &b"beta ".repeat(100))
        .stored("readme.md", b"# bundle")
}

fn host(path: &std::path::Path) -> String {
    path.to_str().unwrap().to_string()
}

#[test]
fn split_paths() {
    assert_eq!(
        split_archive_path("/srv/app.zip/lib/a.txt"),
        Some(("/srv/app.zip".to_string(), "lib/a.txt".to_string()))
    );
    assert_eq!(
        split_archive_path("/srv/app.zip"),
        Some(("/srv/app.zip".to_string(), String::new()))
    );
    assert_eq!(
        split_archive_path("rel/app.zip/lib/"),
        Some(("rel/app.zip".to_string(), "lib/".to_string()))
    );
    assert_eq!(split_archive_path("/srv/.zip/x"), None);
    assert_eq!(split_archive_path("/srv/app.zipper/x"), None);
}

#[test]
fn routes_archive_and_host_paths() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let zip = host(&bundle().write_to(dir.path(), "app.zip"));
    let plain = dir.path().join("plain.txt");
    std::fs::write(&plain, b"plain").unwrap();
    let fs = ZipFs::new();

    assert_eq!(fs.read_file_blocking(&format!("{zip}/lib/a.txt")).unwrap(), b"alpha");
    assert_eq!(
        fs.read_to_string_blocking(&format!("{zip}/lib/deep/b.txt")).unwrap(),
        "beta ".repeat(100)
    );
    assert_eq!(fs.read_file_blocking(&host(&plain)).unwrap(), b"plain");

    assert_eq!(fs.readdir_blocking(&zip).unwrap(), ["lib", "readme.md"]);
    assert_eq!(
        fs.readdir_blocking(&format!("{zip}/lib")).unwrap(),
        ["a.txt", "deep"]
    );

    assert!(fs.exists_blocking(&format!("{zip}/lib/deep")).unwrap());
    assert!(fs.exists_blocking(&host(&plain)).unwrap());
    assert!(!fs.exists_blocking(&format!("{zip}/nope")).unwrap());

    assert!(fs.is_dir_blocking(&zip).unwrap());
    assert!(fs.is_dir_blocking(&format!("{zip}/lib")).unwrap());
    assert!(!fs.is_dir_blocking(&format!("{zip}/readme.md")).unwrap());

    assert!(fs.stat_blocking(&format!("{zip}/lib")).unwrap().is_dir());
    assert_eq!(
        fs.stat_blocking(&format!("{zip}/missing")).unwrap(),
        Stat::Host { exists: false }
    );

    assert_eq!(
        fs.realpath(&format!("{zip}/lib/../readme.md")).unwrap(),
        format!("{zip}/readme.md")
    );

    // The container itself is still an ordinary host file.
    assert_eq!(
        fs.read_file_blocking(&zip).unwrap(),
        std::fs::read(&zip).unwrap()
    );
    assert_eq!(fs.stat_blocking(&zip).unwrap(), Stat::Host { exists: true });

    // One handle per container, however many lookups went through it.
    assert_eq!(fs.registry().len(), 1);
}

#[test]
fn missing_entries_surface_host_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let zip = host(&bundle().write_to(dir.path(), "app.zip"));
    let fs = ZipFs::new();

    let err = fs.read_file_blocking(&format!("{zip}/lib/zzz.txt")).unwrap_err();
    assert!(matches!(err, ZipFsError::NotFound(_)));
    assert!(fs.readdir_blocking(&format!("{zip}/nodir")).unwrap_err().is_not_found());

    let host_err = fs.read_file_blocking(&host(&dir.path().join("gone.txt"))).unwrap_err();
    assert!(matches!(&host_err, ZipFsError::Io(e) if e.kind() == std::io::ErrorKind::NotFound));
}

#[test]
fn invalid_container_surfaces_format_error() {
    let dir = tempfile::tempdir().unwrap();
    let bogus = dir.path().join("bogus.zip");
    std::fs::write(&bogus, vec![0u8; 64]).unwrap();
    let fs = ZipFs::new();

    let err = fs
        .read_file_blocking(&format!("{}/x.txt", host(&bogus)))
        .unwrap_err();
    assert!(matches!(err, ZipFsError::Format(_)));
    assert!(fs.registry().is_empty());
}

#[tokio::test]
async fn async_facade() {
    let dir = tempfile::tempdir().unwrap();
    let zip = host(&bundle().write_to(dir.path(), "app.zip"));
    let fs = ZipFs::new();

    assert_eq!(fs.read_file(&format!("{zip}/lib/a.txt")).await.unwrap(), b"alpha");
    assert_eq!(fs.read_to_string(&format!("{zip}/readme.md")).await.unwrap(), "# bundle");
    assert_eq!(fs.readdir(&format!("{zip}/lib/deep")).await.unwrap(), ["b.txt"]);
    assert!(fs.stat(&format!("{zip}/lib/a.txt")).await.unwrap().is_file());

    assert!(fs.exists(&format!("{zip}/lib/deep")).await.unwrap());
    assert!(!fs.exists(&format!("{zip}/nope")).await.unwrap());
    assert!(fs.is_dir(&zip).await.unwrap());
    assert!(!fs.is_dir(&format!("{zip}/readme.md")).await.unwrap());
    assert!(fs.is_dir(&host(dir.path())).await.unwrap());

    let mut host_names = fs.readdir(&host(dir.path())).await.unwrap();
    host_names.sort();
    assert_eq!(host_names, ["app.zip"]);
}

#[tokio::test]
async fn implied_directories_stat_as_directories() {
    let dir = tempfile::tempdir().unwrap();
    let zip = host(
        &ZipBuilder::new()
            .stored("lib/deep/b.txt", b"beta")
            .write_to(dir.path(), "implied.zip"),
    );
    let fs = ZipFs::new();

    for p in ["lib", "lib/deep", "lib/deep/b.txt", "lib/nope", "nope"] {
        let path = format!("{zip}/{p}");
        let stat = fs.stat(&path).await.unwrap();
        assert_eq!(stat.exists(), fs.exists(&path).await.unwrap(), "{p}");
        assert_eq!(stat.is_dir(), fs.is_dir(&path).await.unwrap(), "{p}");
        assert_eq!(fs.stat_blocking(&path).unwrap(), stat, "{p}");
    }
    assert_eq!(
        fs.stat(&format!("{zip}/lib/deep")).await.unwrap(),
        Stat::ImpliedDir { name: "lib/deep/".to_string() }
    );
    assert_eq!(fs.readdir(&format!("{zip}/lib/deep")).await.unwrap(), ["b.txt"]);
}

#[tokio::test]
async fn registry_shares_and_closes_handles() {
    let dir = tempfile::tempdir().unwrap();
    let zip = host(&bundle().write_to(dir.path(), "app.zip"));
    let registry = ArchiveRegistry::new();

    let first = registry.get_or_open(&zip).await.unwrap();
    let second = registry.get_or_open_blocking(&zip).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(registry.len(), 1);

    assert!(registry.remove(&zip).unwrap());
    assert!(first.is_closed());
    assert!(!registry.remove(&zip).unwrap());

    let reopened = registry.get_or_open(&zip).await.unwrap();
    assert!(!Arc::ptr_eq(&first, &reopened));
    registry.close_all().unwrap();
    assert!(reopened.is_closed());
    assert!(registry.is_empty());
}
