use super::*;
use crate::MemoryStore;

#[test]
fn missing_file_uses_defaults() {
    let store = MemoryStore::new();
    let settings = StoreConfig::load(&store, Path::new("panel.toml")).unwrap();
    assert_eq!(settings, StoreConfig::default());
    assert_eq!(
        settings.plugins_dir,
        PathBuf::from("../Bot/config/plugins")
    );
}

#[test]
fn paths_table_overrides_defaults() {
    let store = MemoryStore::new();
    store.insert(
        "/srv/panel/panel.toml",
        "[paths]\nbot_config = \"bot/bot_config.toml\"\nplugins_dir = \"/opt/plugins\"\n",
    );
    let settings = StoreConfig::load(&store, Path::new("/srv/panel/panel.toml")).unwrap();
    assert_eq!(
        settings.bot_config,
        PathBuf::from("/srv/panel/bot/bot_config.toml")
    );
    assert_eq!(settings.plugins_dir, PathBuf::from("/opt/plugins"));
    assert_eq!(settings.model_config, StoreConfig::default().model_config);
}

#[test]
fn invalid_settings() {
    let store = MemoryStore::new();
    store.insert("panel.toml", "[paths]\nbot_config = 3\n");
    let err = StoreConfig::load(&store, Path::new("panel.toml")).unwrap_err();
    assert!(matches!(&err, StoreError::Settings { key, .. } if key == "paths.bot_config"));
    assert_eq!(err.path(), Path::new("panel.toml"));

    store.insert("broken.toml", "[paths\n");
    let err = StoreConfig::load(&store, Path::new("broken.toml")).unwrap_err();
    assert!(matches!(err, StoreError::Parse { .. }));
}
