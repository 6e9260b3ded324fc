//! Section-scoped edits applied to the original text.
//!
//! Unlike [`Document::to_toml`], which rewrites the whole file, a patch only
//! touches the lines of the keys it updates. Comments, blank lines and every
//! other section stay byte-for-byte identical.

#[cfg(test)]
#[path = "./patch_tests.rs"]
mod tests;

use crate::parser::{Layout, measure_value, parse_key_path, parse_with_layout};
use crate::ser::{dotted_path, format_key, value_to_line, write_key};
use crate::table::TableKind;
use crate::value::{Key, Value};
use crate::{Document, Error, ErrorKind};
use regex::Regex;
use std::ops::Range;

/// Replaces or inserts `key = value` lines inside one section of `text`.
///
/// `section` is a dotted table path such as `bot` or `model.providers`;
/// `None` addresses the keys before the first header. A missing section is
/// appended at the end of the text.
///
/// The patched text is parsed again and compared against the same updates
/// applied to the parsed input. On any mismatch the original text is left
/// alone and [`ErrorKind::PatchVerification`] is returned.
///
/// # Examples
///
/// ```
/// use toml_patchwork::{patch_section, Value};
///
/// let text = "[bot]\nnickname = \"Fox\" # shown in chat\n";
/// let out = patch_section(text, Some("bot"), &[("nickname", Value::from("Kit"))])?;
/// assert_eq!(out, "[bot]\nnickname = \"Kit\" # shown in chat\n");
/// # Ok::<(), toml_patchwork::Error>(())
/// ```
pub fn patch_section(
    text: &str,
    section: Option<&str>,
    updates: &[(&str, Value)],
) -> Result<String, Error> {
    let mut patch = match section {
        Some(name) => SectionPatch::new(name),
        None => SectionPatch::root(),
    };
    for (key, value) in updates {
        patch = patch.set(*key, value.clone());
    }
    patch.apply(text)
}

/// A set of updates to one section, applied with [`SectionPatch::apply`].
#[derive(Clone, Debug)]
pub struct SectionPatch {
    section: Option<String>,
    /// Index into the array of tables named by `section`.
    element: Option<usize>,
    updates: Vec<(String, Value)>,
}

impl SectionPatch {
    /// Targets the table at the dotted path `section`.
    pub fn new(section: impl Into<String>) -> Self {
        SectionPatch {
            section: Some(section.into()),
            element: None,
            updates: Vec::new(),
        }
    }

    /// Targets the root table.
    pub fn root() -> Self {
        SectionPatch {
            section: None,
            element: None,
            updates: Vec::new(),
        }
    }

    /// Targets one table of the array of tables at `section`, counted from
    /// zero in the order its `[[section]]` headers appear.
    ///
    /// ```
    /// use toml_patchwork::{SectionPatch, Value};
    ///
    /// let text = "[[models]]\nname = \"a\"\n\n[[models]]\nname = \"b\" # fallback\n";
    /// let out = SectionPatch::element("models", 1)
    ///     .set("name", Value::from("c"))
    ///     .apply(text)?;
    /// assert_eq!(out, "[[models]]\nname = \"a\"\n\n[[models]]\nname = \"c\" # fallback\n");
    /// # Ok::<(), toml_patchwork::Error>(())
    /// ```
    pub fn element(section: impl Into<String>, index: usize) -> Self {
        SectionPatch {
            section: Some(section.into()),
            element: Some(index),
            updates: Vec::new(),
        }
    }

    /// Adds an update. A later update for the same key wins.
    pub fn set(mut self, key: impl Into<String>, value: Value) -> Self {
        let key = key.into();
        self.updates.retain(|(k, _)| *k != key);
        self.updates.push((key, value));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }

    pub fn apply(&self, text: &str) -> Result<String, Error> {
        let original = crate::parse(text)?;
        let section_name = self.section.as_deref().unwrap_or("");
        let path = match &self.section {
            Some(name) => parse_key_path(name)?,
            None => Vec::new(),
        };
        let header_present = match self.element {
            Some(index) => check_element(&original, &path, index, section_name)?,
            None => check_target(&original, &path, section_name)?,
        };

        let mut expected = original;
        match self.element {
            Some(index) => {
                let mut keys = path.clone();
                keys.push(Key::new(index.to_string()));
                for (key, value) in &self.updates {
                    keys.push(Key::new(key.as_str()));
                    expected.set_keys(&keys, value.clone())?;
                    keys.pop();
                }
            }
            None => expected.update_section(
                section_name,
                self.updates.iter().map(|(k, v)| (k.as_str(), v.clone())),
            )?,
        }

        let verification_failed = || -> Error {
            ErrorKind::PatchVerification {
                section: section_name.to_owned(),
            }
            .into()
        };
        let mut out = text.to_owned();
        for (key, value) in &self.updates {
            let rendered = value_to_line(value)?;
            // Offsets move with every edit, so the layout is taken afresh.
            let Ok((_, layout)) = parse_with_layout(&out) else {
                return Err(verification_failed());
            };
            let bounds = if path.is_empty() {
                Some(root_bounds(&out, &layout))
            } else {
                section_bounds(&out, &layout, &path, self.element)
            };
            match bounds {
                Some(range) => replace_or_insert(&mut out, &layout, range, key, &rendered)?,
                None if header_present || path.is_empty() => {
                    return Err(ErrorKind::UnsupportedTarget {
                        section: section_name.to_owned(),
                        reason: "its header could not be located",
                    }
                    .into());
                }
                None => append_section(&mut out, &path, key, &rendered),
            }
        }

        match crate::parse(&out) {
            Ok(patched) if patched == expected => Ok(out),
            _ => Err(verification_failed()),
        }
    }
}

/// Checks that `path` names an array of tables with at least `index + 1`
/// elements.
fn check_element(doc: &Document, path: &[Key], index: usize, section: &str) -> Result<bool, Error> {
    let unsupported = |reason: &'static str| -> Error {
        ErrorKind::UnsupportedTarget {
            section: section.to_owned(),
            reason,
        }
        .into()
    };
    let Some((last, parents)) = path.split_last() else {
        return Err(unsupported("it is not an array of tables"));
    };
    let mut table = doc.root();
    for key in parents {
        match table.get(&key.name) {
            Some(Value::Table(t)) if t.kind() != TableKind::Inline => table = t,
            Some(Value::Array(a)) if a.is_array_of_tables() => {
                return Err(unsupported("it is nested in an array of tables"));
            }
            _ => return Err(unsupported("it is not an array of tables")),
        }
    }
    match table.get(&last.name) {
        Some(Value::Array(a)) if a.is_array_of_tables() && index < a.len() => Ok(true),
        Some(Value::Array(a)) if a.is_array_of_tables() => {
            Err(unsupported("the array of tables has no such element"))
        }
        _ => Err(unsupported("it is not an array of tables")),
    }
}

/// Rejects sections the textual patcher cannot edit. Returns whether the
/// section already has a `[header]` in the text.
fn check_target(doc: &Document, path: &[Key], section: &str) -> Result<bool, Error> {
    let unsupported = |reason: &'static str| -> Error {
        ErrorKind::UnsupportedTarget {
            section: section.to_owned(),
            reason,
        }
        .into()
    };
    let mut table = doc.root();
    for key in path {
        match table.get(&key.name) {
            None => return Ok(false),
            Some(Value::Table(t)) => match t.kind() {
                TableKind::Inline => return Err(unsupported("it is an inline table")),
                _ => table = t,
            },
            Some(Value::Array(a)) if a.is_array_of_tables() => {
                return Err(unsupported("it is an array of tables"));
            }
            Some(_) => return Err(unsupported("it is not a table")),
        }
    }
    match table.kind() {
        TableKind::Dotted => Err(unsupported("it is defined by dotted keys")),
        TableKind::Header => Ok(true),
        _ => Ok(false),
    }
}

/// Escaped pattern matching one key written bare, basic-quoted or
/// literal-quoted.
fn key_pattern(name: &str) -> String {
    let mut alternatives = vec![regex::escape(&format_key(&Key::new(name)))];
    if crate::ser::is_bare_key(name) {
        alternatives.push(regex::escape(&format!("\"{name}\"")));
    }
    if !name.contains(['\'', '\n', '\r']) {
        alternatives.push(regex::escape(&format!("'{name}'")));
    }
    format!("(?:{})", alternatives.join("|"))
}

fn line_start(text: &str, at: usize) -> usize {
    text[..at].rfind('\n').map_or(0, |nl| nl + 1)
}

/// Byte range of the keys before the first header.
pub(crate) fn root_bounds(text: &str, layout: &Layout) -> Range<usize> {
    let end = layout
        .headers
        .first()
        .map_or(text.len(), |&at| line_start(text, at));
    0..end
}

/// Byte range of a section's body: from the line after its header up to the
/// next header or the end of the text. With `element` set the header is the
/// matching `[[path]]` line, otherwise the `[path]` line.
///
/// Header lookalikes inside multi-line strings and arrays are skipped, since
/// only offsets recorded in `layout` count as headers.
pub(crate) fn section_bounds(
    text: &str,
    layout: &Layout,
    path: &[Key],
    element: Option<usize>,
) -> Option<Range<usize>> {
    let dotted = path
        .iter()
        .map(|k| key_pattern(&k.name))
        .collect::<Vec<_>>()
        .join(r"[ \t]*\.[ \t]*");
    let (open, close) = match element {
        Some(_) => (r"\[\[", r"\]\]"),
        None => (r"\[", r"\]"),
    };
    let pattern =
        format!(r"(?m)^[ \t]*({open}[ \t]*{dotted}[ \t]*{close})[ \t]*(?:#.*)?\r?$");
    let re = Regex::new(&pattern).ok()?;
    let header = re
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .filter(|m| layout.is_header(m.start()))
        .nth(element.unwrap_or(0))?;
    let start = match text[header.end()..].find('\n') {
        Some(nl) => header.end() + nl + 1,
        None => text.len(),
    };
    let end = layout
        .next_header(header.start())
        .map_or(text.len(), |at| line_start(text, at));
    Some(start..end)
}

/// Offset just past `key =` for the `key = value` statement in `range`.
pub(crate) fn find_entry(
    text: &str,
    layout: &Layout,
    range: Range<usize>,
    key: &str,
) -> Option<(usize, usize)> {
    let pattern = format!(r"(?m)^[ \t]*({})[ \t]*=[ \t]*", key_pattern(key));
    let re = Regex::new(&pattern).ok()?;
    re.captures_iter(&text[range.clone()]).find_map(|caps| {
        let key = caps.get(1)?;
        let whole = caps.get(0)?;
        layout
            .is_entry(range.start + key.start())
            .then_some((range.start + whole.start(), range.start + whole.end()))
    })
}

fn replace_or_insert(
    out: &mut String,
    layout: &Layout,
    range: Range<usize>,
    key: &str,
    rendered: &str,
) -> Result<(), Error> {
    if let Some((_, value_start)) = find_entry(out, layout, range.clone(), key) {
        let (_, len) = measure_value(&out[value_start..])?;
        if out[value_start..value_start + len].contains('\n') {
            return Err(ErrorKind::MultilineTarget {
                key: key.to_owned(),
            }
            .into());
        }
        out.replace_range(value_start..value_start + len, rendered);
        return Ok(());
    }

    let mut line = String::new();
    write_key(&mut line, key);
    line.push_str(" = ");
    line.push_str(rendered);
    line.push('\n');

    let body = &out[range.clone()];
    let trimmed = body.trim_end_matches(['\n', '\r', ' ', '\t']);
    let at = if trimmed.is_empty() {
        if range.start > 0 && !out[..range.start].ends_with('\n') {
            // A header on the last line without a newline.
            out.insert(range.start, '\n');
            range.start + 1
        } else {
            range.start
        }
    } else {
        let last_line_end = range.start + trimmed.len();
        match out[last_line_end..range.end].find('\n') {
            Some(nl) => last_line_end + nl + 1,
            None => {
                // The section's last line runs to the end of the text.
                out.insert(last_line_end, '\n');
                last_line_end + 1
            }
        }
    };
    out.insert_str(at, &line);
    Ok(())
}

fn append_section(out: &mut String, path: &[Key], key: &str, rendered: &str) {
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
    if !out.trim().is_empty() {
        out.push('\n');
    }
    out.push('[');
    out.push_str(&dotted_path(path.iter().map(Key::as_str)));
    out.push_str("]\n");
    write_key(out, key);
    out.push_str(" = ");
    out.push_str(rendered);
    out.push('\n');
}
