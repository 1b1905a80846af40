use asset_grader::config::Config;

#[test]
fn parse_example_config() {
    let raw = include_str!("../asset-grader.example.toml");
    let cfg: Config = toml::from_str(raw).expect("parse TOML");
    assert_eq!(cfg.grading.battery_fail_threshold, 60);
    assert_eq!(cfg.staleness.stale_after_seconds, 600);
    assert_eq!(cfg.master_items.desktop["primaryCategoryId"], 69);
    assert_eq!(cfg.master_items.laptop["attributeType"], "Laptop");
}

#[test]
fn missing_file_is_created_with_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Config").join("asset-grader.toml");

    let loaded = Config::load_or_init(&path).unwrap();
    assert!(loaded.created);
    assert!(path.exists());
    assert!(loaded.config.grading.overwrite_existing);

    let reread = Config::load(&path).unwrap();
    assert_eq!(reread.paths.reports_dir, "Reports");
    assert_eq!(reread.master_items.laptop["primaryCategoryId"], 70);
}

#[test]
fn missing_keys_are_backfilled() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("asset-grader.toml");
    std::fs::write(
        &path,
        "[remote]\nbase_url = \"https://inv.example/api\"\napi_key = \"k\"\n\n[grading]\noverwrite_existing = false\n",
    )
    .unwrap();

    let loaded = Config::load_or_init(&path).unwrap();
    assert!(!loaded.created);
    assert_eq!(loaded.config.remote.base_url, "https://inv.example/api");
    assert!(!loaded.config.grading.overwrite_existing);
    assert_eq!(loaded.config.grading.battery_fail_threshold, 60);
    assert!(loaded.backfilled.contains(&"grading.battery_fail_threshold".to_string()));
    assert!(loaded.backfilled.contains(&"remote.user_agent".to_string()));
    assert!(loaded.backfilled.contains(&"master_items".to_string()));

    let raw = std::fs::read_to_string(&path).unwrap();
    assert!(raw.contains("battery_fail_threshold"));
    assert!(raw.contains("https://inv.example/api"));

    let again = Config::load_or_init(&path).unwrap();
    assert!(again.backfilled.is_empty());
}

#[test]
fn corrupt_config_is_an_error_and_left_alone() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("asset-grader.toml");
    std::fs::write(&path, "[remote\nbase_url = ").unwrap();

    assert!(Config::load_or_init(&path).is_err());
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "[remote\nbase_url = ");
}
