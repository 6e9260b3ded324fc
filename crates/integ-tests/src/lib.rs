#![allow(missing_docs)]

use toml_patchwork::Document;

pub type File<'s> = codespan_reporting::files::SimpleFile<&'static str, &'s str>;

pub fn emit_diags(
    f: &File<'_>,
    error: impl IntoIterator<Item = codespan_reporting::diagnostic::Diagnostic<()>>,
) -> String {
    let mut output = codespan_reporting::term::termcolor::NoColor::new(Vec::new());

    for diag in error {
        codespan_reporting::term::emit_to_write_style(
            &mut output,
            &codespan_reporting::term::Config::default(),
            f,
            &diag,
        )
        .expect("failed to emit diagnostic");
    }

    String::from_utf8(output.into_inner()).unwrap()
}

/// Parses `toml`, panicking with a rendered diagnostic on failure.
pub fn parse_or_panic(name: &'static str, toml: &str) -> Document {
    match toml_patchwork::parse(toml) {
        Ok(doc) => doc,
        Err(error) => {
            let file = File::new(name, toml);
            panic!("unexpected toml errors:\n{}", emit_diags(&file, [error.to_diagnostic(())]));
        }
    }
}

/// Serializes and reparses `doc`, asserting the value tree survives and a
/// second serialization is identical.
pub fn assert_round_trip(name: &'static str, doc: &Document) -> String {
    let text = doc.to_toml().expect("failed to serialize");
    let reparsed = parse_or_panic(name, &text);
    pretty_assertions::assert_eq!(&reparsed, doc, "serialized:\n{text}");
    let again = reparsed.to_toml().expect("failed to serialize twice");
    pretty_assertions::assert_eq!(again, text);
    text
}

/// Loads a toml file from `data/` (or takes it inline) and checks that it
/// survives serialization.
#[macro_export]
macro_rules! round_trip {
    ($name:ident) => {
        #[test]
        fn $name() {
            let toml_str = std::fs::read_to_string(concat!("data/", stringify!($name), ".toml"))
                .expect(concat!("failed to load ", stringify!($name), ".toml"));
            let doc = $crate::parse_or_panic(stringify!($name), &toml_str);
            $crate::assert_round_trip(stringify!($name), &doc);
        }
    };
    ($name:ident, $toml:literal) => {
        #[test]
        fn $name() {
            let doc = $crate::parse_or_panic(stringify!($name), $toml);
            $crate::assert_round_trip(stringify!($name), &doc);
        }
    };
}

/// Asserts that `toml` fails to parse with an error matching `$kind`, and
/// that the error renders as a diagnostic pointing into the input.
#[macro_export]
macro_rules! invalid {
    ($name:ident, $toml:literal, $kind:pat) => {
        #[test]
        fn $name() {
            let error = match toml_patchwork::parse($toml) {
                Ok(doc) => panic!("expected an error but parsed {doc:#?}"),
                Err(error) => error,
            };
            assert!(
                matches!(error.kind(), $kind),
                "unexpected error kind: {:?}",
                error.kind()
            );
            assert_eq!(error.category(), toml_patchwork::ErrorCategory::Syntax);

            let file = $crate::File::new(stringify!($name), $toml);
            let rendered = $crate::emit_diags(&file, [error.to_diagnostic(())]);
            assert!(rendered.contains(stringify!($name)), "{rendered}");
        }
    };
}
