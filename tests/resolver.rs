use autoscan::core::{
    AutoloadError, Autoloader, AutoloaderConfig, CacheFormat, ErrorCategory, Fingerprint,
    Materializer,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, UNIX_EPOCH};

fn write_php(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("<?php\n{}\n", body)).unwrap();
    fs::canonicalize(path).unwrap()
}

fn loader_for(cache: &Path, dirs: &[&Path]) -> Autoloader {
    let mut loader = Autoloader::new(AutoloaderConfig::new(cache)).unwrap();
    for dir in dirs {
        loader.add_directory(dir).unwrap();
    }
    loader.register().unwrap();
    loader
}

#[test]
fn resolver_materializes_once_across_case_variants() {
    let cache = tempfile::TempDir::new().unwrap();
    let src = tempfile::TempDir::new().unwrap();
    let file = write_php(src.path(), "Foo.php", "namespace NS;\nclass Foo {}");

    let mut loader = loader_for(cache.path(), &[src.path()]);

    assert!(loader.resolve("NS\\Foo"));
    assert!(loader.resolve("ns\\foo"));
    assert!(loader.resolve("\\NS\\Foo"));

    assert_eq!(loader.materializer().loaded(), &[file.clone()]);
    assert!(loader.materializer().source(&file).unwrap().contains("class Foo"));
    assert_eq!(loader.included_files().len(), 1);
    assert_eq!(loader.rescan_count(), 1);
}

#[test]
fn resolver_rescans_exactly_once_for_empty_directories() {
    let cache = tempfile::TempDir::new().unwrap();
    let src = tempfile::TempDir::new().unwrap();
    fs::write(src.path().join("notes.txt"), "class NotPhp {}").unwrap();

    let mut loader = loader_for(cache.path(), &[src.path()]);
    assert!(!loader.has_rescanned());

    assert!(!loader.resolve("Anything"));
    assert!(loader.has_rescanned());
    assert_eq!(loader.rescan_count(), 1);

    assert!(!loader.resolve("Anything"));
    assert!(!loader.resolve("SomethingElse"));
    assert_eq!(loader.rescan_count(), 1);
    assert!(loader.materializer().loaded().is_empty());
}

#[test]
fn resolver_later_directory_wins_collisions() {
    let cache = tempfile::TempDir::new().unwrap();
    let a = tempfile::TempDir::new().unwrap();
    let b = tempfile::TempDir::new().unwrap();
    write_php(a.path(), "Dup.php", "class Dup {}");
    let from_b = write_php(b.path(), "Dup.php", "class Dup {}");

    let mut loader = loader_for(cache.path(), &[a.path(), b.path()]);

    assert!(loader.resolve("Dup"));
    assert_eq!(loader.materializer().loaded(), &[from_b]);
}

#[test]
fn resolver_recovers_shadowed_declaration_after_winner_is_deleted() {
    let cache = tempfile::TempDir::new().unwrap();
    let a = tempfile::TempDir::new().unwrap();
    let b = tempfile::TempDir::new().unwrap();
    let survivor = write_php(a.path(), "x.php", "class Dup {}");
    let winner = write_php(b.path(), "y.php", "class Dup {}");

    let mut first = loader_for(cache.path(), &[a.path(), b.path()]);
    assert!(first.resolve("Dup"));
    assert_eq!(first.materializer().loaded(), &[winner.clone()]);

    fs::remove_file(&winner).unwrap();

    let mut second = loader_for(cache.path(), &[a.path(), b.path()]);
    assert!(second.resolve("Dup"));
    assert_eq!(second.rescan_count(), 1);
    assert_eq!(second.materializer().loaded(), &[survivor.clone()]);
    assert_eq!(second.snapshot().lookup("dup"), Some(&survivor));
}

#[test]
fn resolver_warm_start_uses_persisted_snapshot() {
    let cache = tempfile::TempDir::new().unwrap();
    let src = tempfile::TempDir::new().unwrap();
    let file = write_php(src.path(), "Cached.php", "class Cached {}");

    let mut first = loader_for(cache.path(), &[src.path()]);
    assert!(first.resolve("Cached"));
    assert_eq!(first.rescan_count(), 1);

    let fingerprint = Fingerprint::of(first.directories());
    assert!(first.cache().cache_path(fingerprint.as_str()).is_file());

    let mut second = loader_for(cache.path(), &[src.path()]);
    assert_eq!(second.snapshot().lookup("cached"), Some(&file));
    assert!(second.resolve("Cached"));
    assert!(!second.has_rescanned());
}

#[test]
fn resolver_directory_order_selects_cache_entry() {
    let cache = tempfile::TempDir::new().unwrap();
    let a = tempfile::TempDir::new().unwrap();
    let b = tempfile::TempDir::new().unwrap();
    write_php(a.path(), "A.php", "class A {}");
    write_php(b.path(), "B.php", "class B {}");

    let mut forward = loader_for(cache.path(), &[a.path(), b.path()]);
    assert!(forward.resolve("A"));

    let reversed = loader_for(cache.path(), &[b.path(), a.path()]);
    assert_ne!(forward.fingerprint(), reversed.fingerprint());
    assert!(reversed.snapshot().is_empty());

    let same = loader_for(cache.path(), &[a.path(), b.path()]);
    assert_eq!(forward.fingerprint(), same.fingerprint());
    assert_eq!(same.snapshot(), forward.snapshot());
}

#[test]
fn resolver_reuses_cached_mapping_when_timestamp_unchanged() {
    let cache = tempfile::TempDir::new().unwrap();
    let src = tempfile::TempDir::new().unwrap();
    let file = write_php(src.path(), "Model.php", "class Model {}");

    let mut first = loader_for(cache.path(), &[src.path()]);
    assert!(first.resolve("Model"));
    let recorded = first.snapshot().freshness[&file];

    fs::write(&file, "<?php\nclass Model {}\nclass Added {}\n").unwrap();
    let handle = fs::File::options().write(true).open(&file).unwrap();
    handle
        .set_modified(UNIX_EPOCH + Duration::from_millis(recorded))
        .unwrap();
    drop(handle);

    let mut second = loader_for(cache.path(), &[src.path()]);
    assert!(!second.resolve("Added"));
    assert_eq!(second.rescan_count(), 1);
    assert!(second.resolve("Model"));

    // Once the timestamp moves forward the new declaration is picked up.
    let handle = fs::File::options().write(true).open(&file).unwrap();
    handle
        .set_modified(UNIX_EPOCH + Duration::from_millis(recorded + 5_000))
        .unwrap();
    drop(handle);

    let mut third = loader_for(cache.path(), &[src.path()]);
    assert!(third.resolve("Added"));
}

#[test]
fn resolver_picks_up_new_file_after_one_rescan() {
    let cache = tempfile::TempDir::new().unwrap();
    let src = tempfile::TempDir::new().unwrap();
    write_php(src.path(), "Old.php", "class Old {}");

    let mut first = loader_for(cache.path(), &[src.path()]);
    assert!(first.resolve("Old"));

    let fresh = write_php(src.path(), "Fresh.php", "interface Fresh {}");
    let mut second = loader_for(cache.path(), &[src.path()]);
    assert!(second.resolve("Old"));
    assert!(!second.has_rescanned());
    assert!(second.resolve("Fresh"));
    assert!(second.has_rescanned());
    assert_eq!(second.snapshot().lookup("fresh"), Some(&fresh));
}

#[test]
fn resolver_heals_corrupt_cache() {
    let cache = tempfile::TempDir::new().unwrap();
    let src = tempfile::TempDir::new().unwrap();
    write_php(src.path(), "Healthy.php", "trait Healthy {}");

    let probe = loader_for(cache.path(), &[src.path()]);
    let fingerprint = probe.fingerprint().unwrap().clone();
    fs::write(probe.cache().cache_path(fingerprint.as_str()), b"{ not json").unwrap();

    let mut loader = loader_for(cache.path(), &[src.path()]);
    assert!(loader.snapshot().is_empty());
    assert!(loader.resolve("Healthy"));

    let reloaded = loader_for(cache.path(), &[src.path()]);
    assert!(reloaded.snapshot().lookup("healthy").is_some());
}

#[test]
fn resolver_supports_bincode_cache() {
    let cache = tempfile::TempDir::new().unwrap();
    let src = tempfile::TempDir::new().unwrap();
    write_php(src.path(), "Bin.php", "class Bin {}");

    let config = AutoloaderConfig::new(cache.path()).with_cache_format(CacheFormat::Bincode);
    let mut loader = Autoloader::new(config.clone()).unwrap();
    loader.add_directory(src.path()).unwrap();
    loader.register().unwrap();
    assert!(loader.resolve("Bin"));

    let mut warm = Autoloader::new(config).unwrap();
    warm.add_directory(src.path()).unwrap();
    warm.register().unwrap();
    assert!(warm.resolve("Bin"));
    assert!(!warm.has_rescanned());
}

#[test]
fn resolver_configuration_errors() {
    let cache = tempfile::TempDir::new().unwrap();
    let src = tempfile::TempDir::new().unwrap();

    let mut loader = Autoloader::new(AutoloaderConfig::new(cache.path())).unwrap();
    assert!(!loader.resolve("Anything"));

    let err = loader.register().unwrap_err();
    assert!(matches!(err, AutoloadError::NoDirectories));
    assert_eq!(err.category(), ErrorCategory::Configuration);

    let missing = src.path().join("missing");
    let err = loader.add_directory(&missing).err().unwrap();
    assert!(matches!(err, AutoloadError::MissingDirectory(_)));

    loader
        .add_directory(src.path())
        .unwrap()
        .add_directory(src.path())
        .unwrap();
    assert_eq!(loader.directories().len(), 2);
    loader.register().unwrap();
    assert!(loader.is_registered());

    let err = loader.add_directory(src.path()).err().unwrap();
    assert!(matches!(err, AutoloadError::AlreadyRegistered));
    assert!(matches!(loader.register(), Err(AutoloadError::AlreadyRegistered)));
}

#[derive(Default)]
struct FlakyMaterializer {
    attempts: usize,
}

impl Materializer for FlakyMaterializer {
    fn materialize(&mut self, path: &Path) -> anyhow::Result<()> {
        self.attempts += 1;
        if self.attempts == 1 {
            anyhow::bail!("transient failure loading {}", path.display());
        }
        Ok(())
    }
}

#[test]
fn resolver_failed_materialization_is_a_miss() {
    let cache = tempfile::TempDir::new().unwrap();
    let src = tempfile::TempDir::new().unwrap();
    write_php(src.path(), "Flaky.php", "class Flaky {}");

    let mut loader =
        Autoloader::with_materializer(AutoloaderConfig::new(cache.path()), FlakyMaterializer::default())
            .unwrap();
    loader.add_directory(src.path()).unwrap();
    loader.register().unwrap();

    // First attempt after the rescan fails and leaves the guard untouched.
    assert!(!loader.resolve("Flaky"));
    assert!(loader.included_files().is_empty());

    // The index still knows the file, so a retry loads it without rescanning.
    assert!(loader.resolve("Flaky"));
    assert_eq!(loader.materializer().attempts, 2);
    assert_eq!(loader.rescan_count(), 1);
}

#[test]
fn fingerprint_is_json_of_ordered_directories() {
    let dirs = vec![PathBuf::from("/srv/a"), PathBuf::from("/srv/b")];
    assert_eq!(Fingerprint::of(&dirs).as_str(), r#"["/srv/a","/srv/b"]"#);

    let reversed: Vec<PathBuf> = dirs.iter().rev().cloned().collect();
    assert_ne!(Fingerprint::of(&dirs), Fingerprint::of(&reversed));
}

#[cfg(unix)]
#[test]
fn fingerprint_keeps_non_utf8_directories_apart() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let first = vec![PathBuf::from(OsStr::from_bytes(b"/srv/\xff"))];
    let second = vec![PathBuf::from(OsStr::from_bytes(b"/srv/\xfe"))];
    assert_ne!(Fingerprint::of(&first), Fingerprint::of(&second));
}
