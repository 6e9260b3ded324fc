use super::*;

fn doc(input: &str) -> Document {
    crate::parse(input).unwrap_or_else(|e| panic!("parse failed for {input:?}: {e}"))
}

#[test]
fn get_follows_tables_and_array_indices() {
    let d = doc("[server]\nport = 8080\n[[users]]\nname = 'a'\n[[users]]\nname = 'b'\n[\"x.y\"]\nz = 1");
    assert_eq!(d.get("server.port").unwrap().and_then(Value::as_i64), Some(8080));
    assert_eq!(d.get("users.1.name").unwrap().and_then(Value::as_str), Some("b"));
    assert_eq!(d.get("\"x.y\".z").unwrap().and_then(Value::as_i64), Some(1));
    assert!(d.get("server.missing").unwrap().is_none());
    assert!(d.get("users.7.name").unwrap().is_none());
    assert!(d.get("server.port.deeper").unwrap().is_none());
    assert!(matches!(
        d.get("server..port").unwrap_err().kind(),
        ErrorKind::InvalidPath(_)
    ));
}

#[test]
fn set_replaces_in_place_and_appends_new_keys() {
    let mut d = doc("a = 1\nb = 2\nc = 3");
    let previous = d.set("b", Value::from("two")).unwrap();
    assert_eq!(previous, Some(Value::from(2)));
    let keys: Vec<&str> = d.root().keys().collect();
    assert_eq!(keys, ["a", "b", "c"]);

    assert_eq!(d.set("d", Value::from(true)).unwrap(), None);
    let keys: Vec<&str> = d.root().keys().collect();
    assert_eq!(keys, ["a", "b", "c", "d"]);
}

#[test]
fn set_creates_missing_tables() {
    let mut d = Document::new();
    d.set("security.master_users", Value::from(Array::new())).unwrap();
    d.set("bot.nickname", Value::from("Fox")).unwrap();
    let security = d.get("security").unwrap().and_then(Value::as_table).unwrap();
    assert!(security.contains_key("master_users"));
    assert_eq!(d.get("bot.nickname").unwrap().and_then(Value::as_str), Some("Fox"));

    let err = d.set("bot.nickname.first", Value::from(1)).unwrap_err();
    assert_eq!(
        err.kind(),
        &ErrorKind::NotATable {
            path: "bot.nickname".into()
        }
    );
    assert_eq!(err.category(), crate::ErrorCategory::Type);
}

#[test]
fn set_array_elements() {
    let mut d = doc("ports = [80, 443]");
    assert_eq!(d.set("ports.1", Value::from(8443)).unwrap(), Some(Value::from(443)));
    assert_eq!(d.set("ports.2", Value::from(9000)).unwrap(), None);
    assert_eq!(d.get("ports.2").unwrap().and_then(Value::as_i64), Some(9000));

    // element types are still enforced, and a failed update changes nothing
    assert!(d.set("ports.0", Value::from("http")).is_err());
    assert_eq!(d.get("ports.0").unwrap().and_then(Value::as_i64), Some(80));
    assert!(d.set("ports.9", Value::from(1)).is_err());
}

#[test]
fn get_mut_and_remove() {
    let mut d = doc("[bot]\nname = 'x'\nqq = 123\n[[p]]\nv = 1\n[[p]]\nv = 2");
    if let Some(v) = d.get_mut("bot.name").unwrap() {
        *v = Value::from("y");
    }
    assert_eq!(d.get("bot.name").unwrap().and_then(Value::as_str), Some("y"));

    assert_eq!(d.remove("bot.qq").unwrap(), Some(Value::from(123)));
    assert_eq!(d.remove("bot.qq").unwrap(), None);
    assert!(d.remove("p.0").unwrap().is_some());
    assert_eq!(d.get("p.0.v").unwrap().and_then(Value::as_i64), Some(2));
    assert_eq!(d.remove("nope.deeper").unwrap(), None);
}

#[test]
fn update_section() {
    let mut d = doc("[bot]\nnickname = 'Fox'\nalias = []\n");
    d.update_section("bot", [("nickname", Value::from("Kit")), ("age", Value::from(3))])
        .unwrap();
    let bot = d.get("bot").unwrap().and_then(Value::as_table).unwrap();
    let keys: Vec<&str> = bot.keys().collect();
    assert_eq!(keys, ["nickname", "alias", "age"]);
    assert_eq!(bot["nickname"], Value::from("Kit"));

    d.update_section("", [("version", Value::from("1.0"))]).unwrap();
    assert_eq!(d.get("version").unwrap().and_then(Value::as_str), Some("1.0"));

    d.update_section("model.chat", [("temperature", Value::from(0.7))])
        .unwrap();
    assert_eq!(
        d.get("model.chat.temperature").unwrap().and_then(Value::as_f64),
        Some(0.7)
    );

    let err = d
        .update_section("bot.nickname", [("x", Value::from(1))])
        .unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::NotATable { .. }));
}

#[test]
fn to_toml_round_trips() {
    let mut d = doc("[bot]\nnickname = 'Fox'\n");
    d.set("bot.qq", Value::from(123456789)).unwrap();
    let text = d.to_toml().unwrap();
    assert_eq!(text, "[bot]\nnickname = \"Fox\"\nqq = 123_456_789\n");
    assert_eq!(crate::parse(&text).unwrap(), d);
}
