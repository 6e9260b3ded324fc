use super::*;

#[test]
fn unparsed_values_have_empty_spans() {
    assert!(Span::default().is_empty());
    assert!(!Span::new(0, 1).is_empty());
    assert_eq!(Range::from(Span::new(3, 7)), 3usize..7usize);
}

#[test]
fn spans_slice_the_source() {
    let text = "\"ключ\" = [1, 2]";
    let doc = crate::parse(text).unwrap();
    let (key, value) = doc.root().get_key_value("ключ").unwrap();
    assert_eq!(key.span.slice(text), Some("\"ключ\""));
    let array = value.as_array().unwrap();
    assert_eq!(array.span().slice(text), Some("[1, 2]"));

    let text = "key = \"värde\"";

    // `ä` is two bytes, splitting it yields nothing
    assert_eq!(Span::new(8, 9).slice(text), None);
    assert_eq!(Span::new(10, 100).slice(text), None);
}
