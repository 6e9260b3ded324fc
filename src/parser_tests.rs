use super::MAX_NESTING_DEPTH;
use crate::table::TableKind;
use crate::time::DatetimeKind;
use crate::value::Integer;
use crate::{Document, Error, ErrorKind, Span, Value};
use num_bigint::BigInt;

fn parse_ok(input: &str) -> Document {
    crate::parse(input).unwrap_or_else(|e| panic!("parse failed for {input:?}: {e}"))
}

fn parse_err(input: &str) -> Error {
    match crate::parse(input) {
        Ok(doc) => panic!("expected an error for {input:?}, got {doc:?}"),
        Err(e) => e,
    }
}

fn get<'a>(doc: &'a Document, path: &str) -> &'a Value {
    match doc.get(path) {
        Ok(Some(v)) => v,
        other => panic!("no value at {path}: {other:?}"),
    }
}

#[test]
fn basic_scalar_values() {
    let doc = parse_ok("");
    assert!(doc.root().is_empty());

    let doc = parse_ok("s = \"hello\"\ni = 42\nn = -100\nf = 3.5\nt = true\nf2 = false");
    assert_eq!(get(&doc, "s").as_str(), Some("hello"));
    assert_eq!(get(&doc, "i").as_i64(), Some(42));
    assert_eq!(get(&doc, "n").as_i64(), Some(-100));
    assert_eq!(get(&doc, "f").as_f64(), Some(3.5));
    assert_eq!(get(&doc, "t").as_bool(), Some(true));
    assert_eq!(get(&doc, "f2").as_bool(), Some(false));
    let keys: Vec<&str> = doc.root().keys().collect();
    assert_eq!(keys, ["s", "i", "n", "f", "t", "f2"]);
}

#[test]
fn integers_and_floats_stay_distinct() {
    let int = parse_ok("x = 1");
    let float = parse_ok("x = 1.0");
    assert_eq!(get(&int, "x"), &Value::Integer(Integer::I64(1)));
    assert_eq!(get(&float, "x"), &Value::Float(1.0));
    assert_ne!(int, float);
}

#[test]
fn string_escapes() {
    let cases = [
        (r#"a = "line1\nline2""#, "line1\nline2"),
        (r#"a = "col1\tcol2""#, "col1\tcol2"),
        (r#"a = "path\\to""#, "path\\to"),
        (r#"a = "say \"hi\"""#, "say \"hi\""),
        (r#"a = "\b\f\r""#, "\u{8}\u{c}\r"),
        (r#"a = "\u0041""#, "A"),
        (r#"a = "\U0001F600""#, "\u{1F600}"),
    ];
    for (input, expected) in cases {
        let doc = parse_ok(input);
        assert_eq!(get(&doc, "a").as_str(), Some(expected), "input: {input}");
    }
}

#[test]
fn string_types() {
    let cases = [
        ("a = 'C:\\Users\\x'", "C:\\Users\\x"),
        ("a = \"\"", ""),
        ("a = ''", ""),
        ("a = \"\"\"\nline1\nline2\"\"\"", "line1\nline2"),
        ("a = '''\nraw \\n text'''", "raw \\n text"),
        ("a = \"\"\"x\"\"\"\"\"", "x\"\""),
        ("a = '''it''s'''", "it''s"),
        ("a = \"\"\"The quick \\\n    brown \\\n\n  fox\"\"\"", "The quick brown fox"),
        ("a = \"\"\"tab\\   \n  end\"\"\"", "tabend"),
        ("a = \"\u{e9}t\u{e9}\"", "\u{e9}t\u{e9}"),
    ];
    for (input, expected) in cases {
        let doc = parse_ok(input);
        assert_eq!(get(&doc, "a").as_str(), Some(expected), "input: {input:?}");
    }
}

#[test]
fn string_errors() {
    let cases = [
        ("a = \"abc", ErrorKind::UnterminatedString),
        ("a = '''abc''", ErrorKind::UnterminatedString),
        ("a = \"\\x41\"", ErrorKind::InvalidEscape('x')),
        ("a = \"\\e\"", ErrorKind::InvalidEscape('e')),
        ("a = \"\\u00G1\"", ErrorKind::InvalidHexEscape('G')),
        ("a = \"\\uD800\"", ErrorKind::InvalidEscapeValue(0xD800)),
        ("a = \"\\U00110000\"", ErrorKind::InvalidEscapeValue(0x110000)),
        ("a = \"a\u{1}b\"", ErrorKind::InvalidCharInString('\u{1}')),
        ("a = \"a\nb\"", ErrorKind::InvalidCharInString('\n')),
        ("\"\"\"a\"\"\" = 1", ErrorKind::MultilineStringKey),
    ];
    for (input, expected) in cases {
        let err = parse_err(input);
        assert_eq!(err.kind(), &expected, "input: {input:?}");
    }
}

#[test]
fn number_formats() {
    let ints = [
        ("a = 0", 0),
        ("a = +99", 99),
        ("a = -17", -17),
        ("a = 1_000_000", 1_000_000),
        ("a = 0xDEAD_beef", 0xDEAD_BEEF),
        ("a = 0o755", 0o755),
        ("a = 0b1101", 0b1101),
        ("a = -9223372036854775808", i64::MIN),
        ("a = 9223372036854775807", i64::MAX),
    ];
    for (input, expected) in ints {
        let doc = parse_ok(input);
        assert_eq!(get(&doc, "a").as_i64(), Some(expected), "input: {input}");
    }

    let floats = [
        ("a = 1.5", 1.5),
        ("a = -0.25", -0.25),
        ("a = 5e+22", 5e22),
        ("a = 1e06", 1e6),
        ("a = -2E-2", -2e-2),
        ("a = 6.626e-34", 6.626e-34),
        ("a = 224_617.445_991", 224_617.445_991),
        ("a = +inf", f64::INFINITY),
        ("a = -inf", f64::NEG_INFINITY),
    ];
    for (input, expected) in floats {
        let doc = parse_ok(input);
        assert_eq!(get(&doc, "a").as_f64(), Some(expected), "input: {input}");
    }

    let doc = parse_ok("a = nan\nb = -nan\nc = -0.0");
    assert!(get(&doc, "a").as_f64().is_some_and(|f| f.is_nan() && f.is_sign_positive()));
    assert!(get(&doc, "b").as_f64().is_some_and(|f| f.is_nan() && f.is_sign_negative()));
    assert!(get(&doc, "c").as_f64().is_some_and(|f| f == 0.0 && f.is_sign_negative()));
}

#[test]
fn invalid_numbers() {
    let cases = [
        "a = 012",
        "a = 1__0",
        "a = _1",
        "a = 1_",
        "a = 0x_1",
        "a = +0x10",
        "a = -0b1",
        "a = 0xG",
        "a = 1.",
        "a = .5",
        "a = 1.e5",
        "a = 1e",
        "a = 1e400",
        "a = 0X10",
    ];
    for input in cases {
        let err = parse_err(input);
        assert!(
            matches!(
                err.kind(),
                ErrorKind::InvalidNumber | ErrorKind::Unexpected(_) | ErrorKind::Wanted { .. }
            ),
            "input: {input}, got {err:?}"
        );
    }
    assert_eq!(parse_err("a = 012").kind(), &ErrorKind::InvalidNumber);
    assert_eq!(parse_err("a = 1e400").kind(), &ErrorKind::InvalidNumber);
}

#[test]
fn big_integers_keep_precision() {
    let doc = parse_ok(
        "big = 123456789012345678901234567890\n\
         neg = -123456789012345678901234567890\n\
         hex = 0xFFFFFFFFFFFFFFFF",
    );
    let big: BigInt = "123456789012345678901234567890".parse().unwrap();
    assert_eq!(get(&doc, "big").as_integer(), Some(&Integer::Big(big.clone())));
    assert_eq!(get(&doc, "neg").as_integer(), Some(&Integer::Big(-big)));
    let hex: BigInt = "18446744073709551615".parse().unwrap();
    assert_eq!(get(&doc, "hex").as_integer(), Some(&Integer::Big(hex)));
    assert_eq!(get(&doc, "hex").as_i64(), None);
    assert_eq!(get(&doc, "hex").as_f64(), None);
}

#[test]
fn datetimes_keep_their_shape() {
    let doc = parse_ok(
        "odt = 1979-05-27T07:32:00Z\n\
         odt2 = 1979-05-27 00:32:00.999999-07:00\n\
         ldt = 1979-05-27t07:32:00\n\
         ld = 2024-01-01\n\
         lt = 07:32:00.5",
    );
    let kinds = [
        ("odt", DatetimeKind::OffsetDatetime),
        ("odt2", DatetimeKind::OffsetDatetime),
        ("ldt", DatetimeKind::LocalDatetime),
        ("ld", DatetimeKind::LocalDate),
        ("lt", DatetimeKind::LocalTime),
    ];
    for (key, kind) in kinds {
        let dt = get(&doc, key).as_datetime().unwrap();
        assert_eq!(dt.kind(), kind, "key: {key}");
    }
    assert_eq!(get(&doc, "ld").as_datetime().unwrap().to_string(), "2024-01-01");
    assert_eq!(get(&doc, "lt").as_datetime().unwrap().to_string(), "07:32:00.5");
    assert_eq!(get(&doc, "ld").type_str(), "datetime");
}

#[test]
fn malformed_datetimes() {
    let cases = [
        "d = 2024-1-01",
        "d = 2024-01-1",
        "d = 2023-02-29",
        "d = 2024-13-01",
        "d = 7:32:00",
        "d = 24:00:00",
        "d = 07:60:00",
        "d = 1979-05-27T07:32:00+24:00",
        "d = 1979-05-27T",
        "d = 07:32",
        "d = 1979-05-27T07:32Z",
    ];
    for input in cases {
        let err = parse_err(input);
        assert_eq!(err.kind(), &ErrorKind::InvalidDatetime, "input: {input}");
    }
    // leap day is fine in leap years
    parse_ok("d = 2024-02-29");
}

#[test]
fn arrays() {
    let doc = parse_ok("a = []\nb = [1, 2, 3]\nc = [\n  'x', # first\n  'y',\n]\nd = [[1], ['a']]");
    assert!(get(&doc, "a").as_array().unwrap().is_empty());
    assert_eq!(get(&doc, "b").as_array().unwrap().len(), 3);
    let c = get(&doc, "c").as_array().unwrap();
    assert_eq!(c.get(1).and_then(Value::as_str), Some("y"));
    assert_eq!(get(&doc, "d").as_array().unwrap().element_type(), Some("array"));
}

#[test]
fn inline_array_type_enforcement() {
    let err = parse_err("x = [1, \"a\"]");
    assert_eq!(
        err.kind(),
        &ErrorKind::MixedArray {
            expected: "integer",
            found: "string"
        }
    );
    assert_eq!(err.span, Span::new(8, 11));

    let doc = parse_ok("x = [1, 2.5]");
    let x = get(&doc, "x").as_array().unwrap();
    assert_eq!(x.as_slice(), &[Value::Float(1.0), Value::Float(2.5)]);
    assert_eq!(x.element_type(), Some("float"));

    assert!(crate::parse("x = [{a = 1}, 2]").is_err());
    assert!(crate::parse("x = [1979-05-27, 07:32:00]").is_err());
}

#[test]
fn inline_tables() {
    let doc = parse_ok("p = { x = 1, y = 2, name.first = 'a' }\ne = {}");
    let p = get(&doc, "p").as_table().unwrap();
    assert_eq!(p.kind(), TableKind::Inline);
    assert_eq!(p.len(), 3);
    assert_eq!(get(&doc, "p.name.first").as_str(), Some("a"));
    assert_eq!(get(&doc, "p.name").as_table().unwrap().kind(), TableKind::Inline);
    assert!(get(&doc, "e").as_table().unwrap().is_empty());

    assert_eq!(
        parse_err("p = { x = 1, x = 2 }").kind(),
        &ErrorKind::DuplicateKey {
            key: "x".into(),
            first: Span::new(6, 7)
        }
    );
    assert!(crate::parse("p = { x = 1 y = 2 }").is_err());
    assert_eq!(parse_err("p = { x = }").kind(), &ErrorKind::MissingValue);
}

#[test]
fn redefinition_rules() {
    let err = parse_err("[a]\nb=1\n[a]\nb=2");
    assert_eq!(
        err.kind(),
        &ErrorKind::DuplicateTable {
            name: "a".into(),
            first: Span::new(0, 3)
        }
    );
    assert_eq!(err.line(), Some(2));

    // a table created by dotted keys may still get its own header
    let doc = parse_ok("a.b=1\n[a]\nc=2");
    assert_eq!(get(&doc, "a.b").as_i64(), Some(1));
    assert_eq!(get(&doc, "a.c").as_i64(), Some(2));
    assert_eq!(get(&doc, "a").as_table().unwrap().kind(), TableKind::Header);

    // so may an implicit parent
    let doc = parse_ok("[x.y.z]\n[x]\nv = 1");
    assert_eq!(get(&doc, "x.v").as_i64(), Some(1));
    assert!(get(&doc, "x.y.z").as_table().unwrap().is_empty());

    assert_eq!(
        parse_err("a = 1\na = 2").kind(),
        &ErrorKind::DuplicateKey {
            key: "a".into(),
            first: Span::new(0, 1)
        }
    );
    assert!(matches!(
        parse_err("a = 1\na.b = 2").kind(),
        ErrorKind::DottedKeyInvalidType { .. }
    ));
    assert!(matches!(
        parse_err("[a]\nb = 1\n[a.b]").kind(),
        ErrorKind::DuplicateKey { .. }
    ));
    assert_eq!(parse_err("[a]\n[[a]]").kind(), &ErrorKind::RedefineAsArray);
    assert!(matches!(
        parse_err("[[a]]\n[a]").kind(),
        ErrorKind::DuplicateTable { .. }
    ));
}

#[test]
fn inline_values_cannot_be_extended() {
    let cases = [
        ("a = {x = 1}\n[a]", "table"),
        ("a = {x = 1}\na.y = 2", "table"),
        ("a = {x = 1}\n[a.b]", "table"),
        ("a = { b.c = 1 }\na.b.d = 2", "table"),
        ("a = [1]\n[[a]]", "array"),
        ("a = [{x = 1}]\n[a.b]", "array"),
    ];
    for (input, kind) in cases {
        let err = parse_err(input);
        match err.kind() {
            ErrorKind::ExtendInline { kind: found, .. } => assert_eq!(*found, kind, "{input}"),
            other => panic!("unexpected error for {input:?}: {other:?}"),
        }
    }
}

#[test]
fn array_of_tables_accumulate_in_order() {
    let doc = parse_ok("[[a]]\nx=1\n[[a]]\nx=2");
    let a = get(&doc, "a").as_array().unwrap();
    assert!(a.is_array_of_tables());
    assert_eq!(a.len(), 2);
    assert_eq!(get(&doc, "a.0.x").as_i64(), Some(1));
    assert_eq!(get(&doc, "a.1.x").as_i64(), Some(2));

    // sub-tables attach to the latest element
    let doc = parse_ok("[[fruit]]\nname = 'apple'\n[fruit.physical]\ncolor = 'red'\n[[fruit]]\nname = 'pear'");
    assert_eq!(get(&doc, "fruit.0.physical.color").as_str(), Some("red"));
    assert!(doc.get("fruit.1.physical").unwrap().is_none());

    let doc = parse_ok("[[a.b]]\n[[a.b]]\n[a.c]\nk = true");
    assert_eq!(get(&doc, "a.b").as_array().unwrap().len(), 2);
    assert_eq!(get(&doc, "a.c.k").as_bool(), Some(true));
}

#[test]
fn keys() {
    let doc = parse_ok("\"a b\" . c = 1\nsite.\"google.com\" = true\n'lit' = 2\n-_- = 3\n1234 = 4");
    assert_eq!(get(&doc, "\"a b\".c").as_i64(), Some(1));
    assert_eq!(get(&doc, "site.\"google.com\"").as_bool(), Some(true));
    assert_eq!(get(&doc, "lit").as_i64(), Some(2));
    assert_eq!(get(&doc, "-_-").as_i64(), Some(3));
    assert_eq!(get(&doc, "1234").as_i64(), Some(4));

    let doc = parse_ok("key = 1");
    let (key, _) = doc.root().get_key_value("key").unwrap();
    assert_eq!(key.span, Span::new(0, 3));

    assert_eq!(parse_err("= 1").kind(), &ErrorKind::EmptyKey);
    assert_eq!(parse_err("a..b = 1").kind(), &ErrorKind::EmptyKey);
    assert_eq!(parse_err("[]").kind(), &ErrorKind::EmptyKey);
}

#[test]
fn missing_values() {
    for input in ["a =", "a =\nb = 1", "a = # nothing", "a.b =   "] {
        assert_eq!(parse_err(input).kind(), &ErrorKind::MissingValue, "{input:?}");
    }
}

#[test]
fn error_positions() {
    let err = parse_err("x = @");
    assert_eq!(err.kind(), &ErrorKind::Unexpected('@'));
    assert_eq!(err.line(), Some(0));
    assert_eq!(err.column(), Some(4));
    assert_eq!(err.position(), 4);
    assert_eq!(err.to_string(), "unexpected character found: `@` at line 1, column 5");

    // columns count characters, not bytes
    let err = parse_err("a = '\u{e9}' @");
    assert_eq!(err.line(), Some(0));
    assert_eq!(err.column(), Some(8));
    assert_eq!(err.position(), 9);

    let err = parse_err("a = 1\nb = 2\nc = nope");
    assert_eq!(err.line(), Some(2));
    assert_eq!(err.column(), Some(4));
    assert_eq!(
        err.kind(),
        &ErrorKind::Wanted {
            expected: "a value",
            found: "an identifier"
        }
    );

    let err = parse_err("[a");
    assert_eq!(
        err.kind(),
        &ErrorKind::Wanted {
            expected: "a right bracket",
            found: "eof"
        }
    );
    assert_eq!(parse_err("a = ").kind(), &ErrorKind::MissingValue);
    assert_eq!(crate::parse_value("").unwrap_err().kind(), &ErrorKind::MissingValue);
}

#[test]
fn comments_and_whitespace() {
    let doc = parse_ok("# header\n\n  a = 1 # trailing\n\t[t] # table\n\tb = 2\n# end");
    assert_eq!(get(&doc, "a").as_i64(), Some(1));
    assert_eq!(get(&doc, "t.b").as_i64(), Some(2));

    // control characters are not allowed in comments
    assert!(crate::parse("a = 1 # bad \u{1} char").is_err());
    assert!(crate::parse("a = 1 b = 2").is_err());
}

#[test]
fn utf8_bom_and_crlf() {
    let doc = parse_ok("\u{feff}a = 1");
    assert_eq!(get(&doc, "a").as_i64(), Some(1));

    let doc = parse_ok("a = 1\r\n[t]\r\nb = \"\"\"x\r\ny\"\"\"\r\n");
    assert_eq!(get(&doc, "a").as_i64(), Some(1));
    assert_eq!(get(&doc, "t.b").as_str(), Some("x\r\ny"));

    assert!(crate::parse("a = 1\rb = 2").is_err());
}

#[test]
fn nesting_at_the_limit() {
    let depth = MAX_NESTING_DEPTH;
    let input = format!("a = {}{}", "[".repeat(depth), "]".repeat(depth));
    let doc = parse_ok(&input);
    let mut value = get(&doc, "a");
    let mut levels = 1;
    while let Some(inner) = value.as_array().and_then(|a| a.get(0)) {
        value = inner;
        levels += 1;
    }
    assert_eq!(levels, depth);
    assert_eq!(crate::parse(&doc.to_toml().unwrap()).unwrap(), doc);

    let input = format!("a = {}1{}", "{ b = ".repeat(depth), " }".repeat(depth));
    let doc = parse_ok(&input);
    let path = std::iter::repeat_n("b", depth).collect::<Vec<_>>().join(".");
    assert_eq!(get(&doc, &format!("a.{path}")).as_i64(), Some(1));

    let input = format!("a = {}1{}", "[{ b = ".repeat(depth / 2), " }]".repeat(depth / 2));
    parse_ok(&input);

    let keys = std::iter::repeat_n("k", depth).collect::<Vec<_>>().join(".");
    parse_ok(&format!("[{keys}]\n{keys} = 1"));
}

#[test]
fn nesting_over_the_limit() {
    let too_deep = ErrorKind::NestingTooDeep {
        limit: MAX_NESTING_DEPTH,
    };
    let depth = MAX_NESTING_DEPTH + 1;
    let cases = [
        format!("a = {}{}", "[".repeat(depth), "]".repeat(depth)),
        format!("a = {}1{}", "{ b = ".repeat(depth), " }".repeat(depth)),
        format!("a = {}1{}", "[{ b = ".repeat(depth / 2 + 1), " }]".repeat(depth / 2 + 1)),
        // dotted keys inside inline tables count too
        format!("a = {{ b = {{ {} = 1 }} }}", vec!["c"; MAX_NESTING_DEPTH].join(".")),
        format!("{} = 1", vec!["k"; depth].join(".")),
        format!("[{}]", vec!["k"; depth].join(".")),
        format!("[[{}]]", vec!["k"; depth].join(".")),
    ];
    for input in &cases {
        assert_eq!(parse_err(input).kind(), &too_deep, "input: {input:.40}");
    }
}

#[test]
fn hostile_nesting_is_an_error() {
    // Far beyond anything the call stack could drop or compare.
    let depth = 200_000;
    let input = format!("a = {}{}", "[".repeat(depth), "]".repeat(depth));
    let err = parse_err(&input);
    assert!(matches!(err.kind(), ErrorKind::NestingTooDeep { .. }));
    assert_eq!((err.line(), err.column()), (Some(0), Some(4 + MAX_NESTING_DEPTH)));

    let input = format!("a = {}1{}", "{b=".repeat(depth), "}".repeat(depth));
    assert!(matches!(parse_err(&input).kind(), ErrorKind::NestingTooDeep { .. }));

    let input = format!("{} = 1", vec!["k"; depth].join("."));
    assert!(matches!(parse_err(&input).kind(), ErrorKind::NestingTooDeep { .. }));
}

#[test]
fn large_tables_are_indexed() {
    let input: String = (0..10).map(|i| format!("k{i} = {i}\n")).collect();
    let doc = parse_ok(&input);
    assert!(doc.root().is_indexed());
    assert_eq!(get(&doc, "k7").as_i64(), Some(7));
    assert!(matches!(
        parse_err(&format!("{input}k3 = 0")).kind(),
        ErrorKind::DuplicateKey { .. }
    ));
}

#[test]
fn single_values() {
    assert_eq!(crate::parse_value("42").unwrap(), Value::from(42));
    assert_eq!(crate::parse_value("  'x' # note\n").unwrap(), Value::from("x"));
    let arr = crate::parse_value("[[\"qq\", \"111\"]]").unwrap();
    assert_eq!(arr.as_array().unwrap().len(), 1);
    let table = crate::parse_value("{ a = 1, b = [true] }").unwrap();
    assert_eq!(table.get("a").and_then(Value::as_i64), Some(1));

    assert!(crate::parse_value("1 2").is_err());
    assert!(crate::parse_value("a = 1").is_err());
}

#[test]
fn measure_stops_after_the_value() {
    let (value, len) = super::measure_value("[1, 2] # rest\nnext = 1").unwrap();
    assert_eq!(len, 6);
    assert_eq!(value.as_array().map(|a| a.len()), Some(2));

    let (_, len) = super::measure_value("\"\"\"a\nb\"\"\"\n").unwrap();
    assert_eq!(len, 9);
}

#[test]
fn key_paths() {
    let path = super::parse_key_path("a . \"b.c\" .'d'").unwrap();
    let names: Vec<&str> = path.iter().map(|k| k.as_str()).collect();
    assert_eq!(names, ["a", "b.c", "d"]);
    for bad in ["", "a.", "a b", ".a", "a.\"x"] {
        assert!(
            matches!(
                super::parse_key_path(bad).unwrap_err().kind(),
                ErrorKind::InvalidPath(_)
            ),
            "{bad:?}"
        );
    }
}
