//! Flattening documents into searchable haystacks.
//!
//! Field order is fixed: title, subtitle, tags, body, description. Tags are
//! written as `tag-<name>` so an intentional tag hit stays distinguishable
//! from the same word in free text. The prefix itself is not document text:
//! matching skips the bytes reported by [`Haystack::markers`].

use crate::interface::Document;
use std::ops::Range;

pub const TAG_PREFIX: &str = "tag-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Title,
    Subtitle,
    Tags,
    Body,
    Description,
}

/// Byte span of one field inside the haystack text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpan {
    pub field: Field,
    pub start: usize,
    pub end: usize,
}

/// Searchable text of one document plus the field each byte came from.
/// Spans are ascending and separated by a single space.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Haystack {
    text: String,
    spans: Vec<FieldSpan>,
}

impl Haystack {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn spans(&self) -> &[FieldSpan] {
        &self.spans
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Field containing byte `offset`, or `None` for separators and out-of-range offsets.
    pub fn field_at(&self, offset: usize) -> Option<Field> {
        let idx = self.spans.partition_point(|s| s.end <= offset);
        self.spans
            .get(idx)
            .filter(|s| s.start <= offset)
            .map(|s| s.field)
    }

    /// Text of every span belonging to `field`, in haystack order.
    pub fn field_text(&self, field: Field) -> impl Iterator<Item = &str> + '_ {
        self.spans
            .iter()
            .filter(move |s| s.field == field)
            .map(|s| &self.text[s.start..s.end])
    }

    /// Byte ranges of the `tag-` prefixes inserted in front of each tag.
    pub fn markers(&self) -> impl Iterator<Item = Range<usize>> + '_ {
        self.spans
            .iter()
            .filter(|s| s.field == Field::Tags)
            .map(|s| s.start..s.start + TAG_PREFIX.len())
    }

    /// Whether `range` touches any inserted tag prefix.
    pub fn overlaps_marker(&self, range: &Range<usize>) -> bool {
        self.markers().any(|m| range.start < m.end && m.start < range.end)
    }

    fn push(&mut self, field: Field, value: &str) {
        if value.trim().is_empty() {
            return;
        }
        if !self.text.is_empty() {
            self.text.push(' ');
        }
        let start = self.text.len();
        self.text.push_str(value);
        self.spans.push(FieldSpan { field, start, end: self.text.len() });
    }

    fn push_tag(&mut self, tag: &str) {
        let tag = tag.trim();
        if tag.is_empty() {
            return;
        }
        self.push(Field::Tags, &format!("{TAG_PREFIX}{tag}"));
    }

    #[cfg(test)]
    pub(crate) fn span_range(&self, field: Field) -> Option<Range<usize>> {
        self.spans.iter().find(|s| s.field == field).map(|s| s.start..s.end)
    }
}

/// Build the haystack for a document. Pure: the same document always yields
/// the same text and spans.
pub fn normalize(doc: &Document) -> Haystack {
    let mut haystack = Haystack {
        text: String::with_capacity(
            doc.title.len()
                + doc.description.len()
                + doc.body.as_deref().map_or(0, str::len)
                + 64,
        ),
        spans: Vec::with_capacity(doc.tags.len() + 4),
    };

    haystack.push(Field::Title, &doc.title);
    if let Some(subtitle) = &doc.subtitle {
        haystack.push(Field::Subtitle, subtitle);
    }
    for tag in &doc.tags {
        haystack.push_tag(tag);
    }
    if let Some(body) = &doc.body {
        haystack.push(Field::Body, body);
    }
    haystack.push(Field::Description, &doc.description);
    haystack
}
