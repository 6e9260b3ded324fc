use super::*;
use crate::{FsStore, MemoryStore};

fn settings() -> StoreConfig {
    StoreConfig {
        bot_config: PathBuf::from("config/bot_config.toml"),
        model_config: PathBuf::from("config/model_config.toml"),
        plugins_dir: PathBuf::from("config/plugins"),
    }
}

fn manager() -> (Arc<MemoryStore>, ConfigManager) {
    let store = Arc::new(MemoryStore::new());
    store.insert(
        "config/bot_config.toml",
        "version = \"1.0\"\n\n# identity\n[bot]\nnickname = \"Fox\" # shown in chat\nqq = 123\n",
    );
    store.insert(
        "config/model_config.toml",
        "[[models]]\nname = \"chat\"\ntemperature = 0.7\n",
    );
    store.insert("config/plugins/echo/config.toml", "[plugin]\nenabled = true\n");
    store.insert("config/plugins/broken/config.toml", "[plugin\n");
    store.insert("config/plugins/no_config/readme.md", "");
    let manager = ConfigManager::new(store.clone(), settings());
    (store, manager)
}

#[test]
fn bot_and_model_configs() {
    let (_, manager) = manager();
    let bot = manager.bot_config().unwrap();
    assert_eq!(bot.filename, "bot_config.toml");
    assert_eq!(bot.path, PathBuf::from("config/bot_config.toml"));
    let names: Vec<&str> = bot.sections.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, ["", "bot"]);
    assert_eq!(bot.sections[1].comment.as_deref(), Some("identity"));

    let model = manager.model_config().unwrap();
    assert_eq!(model.filename, "model_config.toml");
    let fields: Vec<&str> = model.sections[0]
        .fields
        .iter()
        .map(|f| f.name.as_str())
        .collect();
    assert_eq!(fields, ["[0].name", "[0].temperature"]);
    assert_eq!(model.sections[0].fields[1].field_type, "float");
}

#[test]
fn plugin_discovery_skips_broken_configs() {
    let (_, manager) = manager();
    let plugins = manager.plugin_configs().unwrap();
    assert_eq!(plugins.len(), 1);
    assert_eq!(plugins[0].name, "echo");
    assert_eq!(plugins[0].path, PathBuf::from("config/plugins/echo/config.toml"));
    assert_eq!(plugins[0].config.filename, "echo/config.toml");
    assert_eq!(
        plugins[0].config.sections[0].fields[0].value,
        Value::from(true)
    );

    let empty = ConfigManager::new(Arc::new(MemoryStore::new()), settings());
    assert!(empty.plugin_configs().unwrap().is_empty());
}

#[test]
fn missing_bot_config_is_an_error() {
    let manager = ConfigManager::new(Arc::new(MemoryStore::new()), settings());
    let err = manager.bot_config().unwrap_err();
    assert!(matches!(err, StoreError::Read { .. }));
}

#[test]
fn save_config_patches_changed_fields() {
    let (store, manager) = manager();
    let mut bot = manager.bot_config().unwrap();
    bot.sections[1].fields[0].value = Value::from("Kit");
    bot.sections[0].fields[0].value = Value::from("1.1");

    let text = manager.save_config(&bot).unwrap();
    let expected =
        "version = \"1.1\"\n\n# identity\n[bot]\nnickname = \"Kit\" # shown in chat\nqq = 123\n";
    assert_eq!(text, expected);
    assert_eq!(store.contents("config/bot_config.toml").as_deref(), Some(expected));
}

#[test]
fn save_config_without_changes_writes_nothing() {
    let (store, manager) = manager();
    let bot = manager.bot_config().unwrap();
    store.set_read_only(true);
    assert_eq!(manager.save_config(&bot).unwrap(), bot.raw_content);
}

fn field<'a>(file: &'a mut ConfigFile, section: &str, name: &str) -> &'a mut Value {
    let section = file
        .sections
        .iter_mut()
        .find(|s| s.name == section)
        .unwrap();
    let field = section.fields.iter_mut().find(|f| f.name == name).unwrap();
    &mut field.value
}

#[test]
fn save_config_patches_array_of_tables_elements() {
    let (store, manager) = manager();
    let providers = "# providers\n\
                     [[api_providers]]\n\
                     name = \"openai\"\n\
                     timeout = 30 # seconds\n\
                     \n\
                     [[api_providers]]\n\
                     name = \"local\"\n\
                     timeout = 10 # seconds\n";
    store.insert("config/model_config.toml", providers);

    let mut model = manager.model_config().unwrap();
    *field(&mut model, "api_providers", "[1].timeout") = Value::from(60);
    *field(&mut model, "api_providers", "[0].name") = Value::from("azure");
    let text = manager.save_config(&model).unwrap();
    let expected = "# providers\n\
                    [[api_providers]]\n\
                    name = \"azure\"\n\
                    timeout = 30 # seconds\n\
                    \n\
                    [[api_providers]]\n\
                    name = \"local\"\n\
                    timeout = 60 # seconds\n";
    assert_eq!(text, expected);
    assert_eq!(store.contents("config/model_config.toml").as_deref(), Some(expected));

    // unchanged array of tables fields write nothing
    store.set_read_only(true);
    let model = manager.model_config().unwrap();
    assert_eq!(manager.save_config(&model).unwrap(), expected);
}

#[test]
fn save_config_re_renders_fields_it_cannot_patch() {
    let (store, manager) = manager();
    store.insert(
        "config/bot_config.toml",
        "[bot]\nnickname = \"Fox\" # shown in chat\nadmins = [\n    1,\n    2,\n]\n",
    );
    let mut bot = manager.bot_config().unwrap();
    field(&mut bot, "bot", "admins")
        .as_array_mut()
        .unwrap()
        .push(Value::from(3))
        .unwrap();

    let text = manager.save_config(&bot).unwrap();
    assert!(!text.contains("shown in chat"));
    let doc = toml_patchwork::parse(&text).unwrap();
    let admins: Vec<i64> = doc
        .get("bot.admins")
        .unwrap()
        .unwrap()
        .as_array()
        .unwrap()
        .iter()
        .filter_map(Value::as_i64)
        .collect();
    assert_eq!(admins, [1, 2, 3]);
    assert_eq!(doc.get("bot.nickname").unwrap(), Some(&Value::from("Fox")));
    assert_eq!(store.contents("config/bot_config.toml").as_deref(), Some(text.as_str()));
}

#[test]
fn sessions_on_the_file_system() {
    let dir = tempfile::tempdir().unwrap();
    let settings = StoreConfig {
        bot_config: dir.path().join("bot_config.toml"),
        model_config: dir.path().join("model_config.toml"),
        plugins_dir: dir.path().join("plugins"),
    };
    std::fs::write(&settings.bot_config, "[bot]\nnickname = 'Fox'\n").unwrap();
    let manager = ConfigManager::new(Arc::new(FsStore), settings.clone());

    let session = manager.open(settings.bot_config.clone()).unwrap();
    session.set("bot.qq", Value::from(42)).unwrap();
    session.save().unwrap();
    assert_eq!(
        std::fs::read_to_string(&settings.bot_config).unwrap(),
        "[bot]\nnickname = \"Fox\"\nqq = 42\n"
    );
    assert!(manager.plugin_configs().unwrap().is_empty());
}
