//! A flat projection of a document for configuration forms.

#[cfg(test)]
#[path = "./view_tests.rs"]
mod tests;

use crate::parser::{Layout, measure_value, parse_with_layout};
use crate::patch::{find_entry, root_bounds, section_bounds};
use crate::value::{Key, Value};
use crate::Document;
use std::ops::Range;

/// One editable value.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ConfigField {
    /// Key within the section. Fields of an array of tables are named
    /// `[index].key`.
    pub name: String,
    /// Name of the owning section, empty for top-level values.
    pub section: String,
    pub value: Value,
    /// TOML type name of the value, see [`Value::type_str`].
    pub field_type: &'static str,
    /// Comment at the end of the key's line, or on the line above it.
    pub comment: Option<String>,
}

/// A top-level table or array of tables with its fields.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ConfigSection {
    /// Key of the table in the root, empty for the group of top-level
    /// values.
    pub name: String,
    /// Comment on the line directly above the section header.
    pub comment: Option<String>,
    pub fields: Vec<ConfigField>,
}

/// Splits a document into sections, scraping comments from `raw`, the text
/// `doc` was parsed from.
///
/// Top-level values that are neither tables nor arrays of tables are grouped
/// into a leading section named `""`.
pub fn sections(doc: &Document, raw: &str) -> Vec<ConfigSection> {
    let mut root = ConfigSection {
        name: String::new(),
        comment: None,
        fields: Vec::new(),
    };
    // Without a layout no comment can be located, but the values still are.
    let layout = parse_with_layout(raw)
        .map(|(_, layout)| layout)
        .unwrap_or_default();
    let text = Text { raw, layout: &layout };
    let root_region = root_bounds(raw, &layout);
    let mut sections = Vec::new();

    for (key, value) in doc.root() {
        match value {
            Value::Table(table) => {
                let path = [key.clone()];
                let region = section_bounds(raw, &layout, &path, None);
                let fields = table
                    .iter()
                    .map(|(k, v)| text.field(region.clone(), &key.name, k.as_str(), k, v))
                    .collect();
                sections.push(ConfigSection {
                    name: key.name.clone(),
                    comment: text.header_comment(&path, None),
                    fields,
                });
            }
            Value::Array(array) if array.is_array_of_tables() => {
                let path = [key.clone()];
                let mut fields = Vec::new();
                for (index, element) in array.iter().enumerate() {
                    let Some(table) = element.as_table() else {
                        continue;
                    };
                    let region = section_bounds(raw, &layout, &path, Some(index));
                    for (k, v) in table {
                        let name = format!("[{index}].{}", k.name);
                        fields.push(text.field(region.clone(), &key.name, &name, k, v));
                    }
                }
                sections.push(ConfigSection {
                    name: key.name.clone(),
                    comment: text.header_comment(&path, Some(0)),
                    fields,
                });
            }
            _ => root
                .fields
                .push(text.field(Some(root_region.clone()), "", &key.name, key, value)),
        }
    }

    if !root.fields.is_empty() {
        sections.insert(0, root);
    }
    sections
}

/// The source text a document was parsed from.
struct Text<'a> {
    raw: &'a str,
    layout: &'a Layout,
}

impl Text<'_> {
    fn field(
        &self,
        region: Option<Range<usize>>,
        section: &str,
        name: &str,
        key: &Key,
        value: &Value,
    ) -> ConfigField {
        ConfigField {
            name: name.to_owned(),
            section: section.to_owned(),
            value: value.clone(),
            field_type: value.type_str(),
            comment: region.and_then(|region| self.field_comment(region, &key.name)),
        }
    }

    fn header_comment(&self, path: &[Key], element: Option<usize>) -> Option<String> {
        let raw = self.raw;
        let body = section_bounds(raw, self.layout, path, element)?;
        // The header line ends right before the body starts.
        let header_end = raw[..body.start].strip_suffix('\n').unwrap_or(&raw[..body.start]);
        let header_start = header_end.rfind('\n').map_or(0, |nl| nl + 1);
        comment_above(raw, header_start)
    }

    fn field_comment(&self, region: Range<usize>, name: &str) -> Option<String> {
        let raw = self.raw;
        let (line_start, value_start) = find_entry(raw, self.layout, region, name)?;
        let rest = &raw[value_start..];
        let after_value = match measure_value(rest) {
            Ok((_, len)) => &rest[len..],
            Err(_) => rest,
        };
        let line = after_value.lines().next().unwrap_or("");
        if let Some(comment) = line.find('#').and_then(|at| comment_text(&line[at..])) {
            return Some(comment);
        }
        comment_above(raw, line_start)
    }
}

fn comment_text(line: &str) -> Option<String> {
    let text = line.trim().strip_prefix('#')?.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_owned())
    }
}

/// The comment line directly above `start`, the offset of a line start.
fn comment_above(raw: &str, start: usize) -> Option<String> {
    let before = raw[..start].strip_suffix('\n')?;
    let before = before.strip_suffix('\r').unwrap_or(before);
    let line = match before.rfind('\n') {
        Some(nl) => &before[nl + 1..],
        None => before,
    };
    comment_text(line)
}
