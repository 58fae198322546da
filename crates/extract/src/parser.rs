//! Lenient extraction of entity rows from a model reply.
//!
//! The reply is untrusted free text. Anything shaped like a four-column
//! markdown table row is a candidate; candidates that fail validation are
//! dropped one by one and never fail the whole reply.

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::trace;

use crate::schema::{EntityRecord, EntityType, EntityTypeMap};

static TABLE_ROW: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\|.*?\|.*?\|.*?\|.*?\|").expect("table row pattern is valid"));

/// Rows the model echoes from the instruction (header + separator).
const ECHOED_HEADER_ROWS: usize = 2;

#[derive(Debug, PartialEq)]
enum MalformedRow {
    FieldCount(usize),
    UnknownType(String),
    BadOffset(String),
    SpanOutOfRange { start: usize, end: usize },
    EmptyEntity,
}

struct Row<'a> {
    type_label: &'a str,
    entity: &'a str,
    start: &'a str,
    end: &'a str,
}

pub struct CompletionParser<'a> {
    types: &'a EntityTypeMap,
    use_index: bool,
}

impl<'a> CompletionParser<'a> {
    pub fn new(types: &'a EntityTypeMap, use_index: bool) -> Self {
        Self { types, use_index }
    }

    pub fn parse(&self, completion: &str, sentence: &str) -> Vec<EntityRecord> {
        let mut entities = Vec::new();
        let mut seen_texts: HashSet<&str> = HashSet::new();

        for candidate in TABLE_ROW
            .find_iter(completion)
            .skip(ECHOED_HEADER_ROWS)
            .map(|m| m.as_str())
        {
            let row = match split_row(candidate) {
                Ok(row) => row,
                Err(reason) => {
                    trace!(row = candidate, ?reason, "Dropping table row");
                    continue;
                }
            };

            let outcome = if self.use_index {
                self.resolve_reported_span(&row, sentence)
                    .map(|record| entities.push(record))
            } else {
                if !seen_texts.insert(row.entity) {
                    continue;
                }
                self.locate_in_sentence(&row, sentence)
                    .map(|records| entities.extend(records))
            };

            if let Err(reason) = outcome {
                trace!(row = candidate, ?reason, "Dropping table row");
            }
        }

        entities
    }

    fn entity_type(&self, row: &Row<'_>) -> Result<EntityType, MalformedRow> {
        self.types
            .label_to_code(row.type_label)
            .ok_or_else(|| MalformedRow::UnknownType(row.type_label.to_string()))
    }

    /// Index mode: keep the offsets the model reported, if they are usable.
    fn resolve_reported_span(
        &self,
        row: &Row<'_>,
        sentence: &str,
    ) -> Result<EntityRecord, MalformedRow> {
        let entity_type = self.entity_type(row)?;
        let start = parse_offset(row.start)?;
        let end = parse_offset(row.end)?;

        if row.entity.is_empty() {
            return Err(MalformedRow::EmptyEntity);
        }
        if start > end || end >= sentence.chars().count() {
            return Err(MalformedRow::SpanOutOfRange { start, end });
        }

        Ok(EntityRecord {
            entity: row.entity.to_string(),
            entity_type,
            start_idx: start,
            end_idx: end,
        })
    }

    /// Non-index mode: one record per literal occurrence of the entity text.
    fn locate_in_sentence(
        &self,
        row: &Row<'_>,
        sentence: &str,
    ) -> Result<Vec<EntityRecord>, MalformedRow> {
        if row.entity.is_empty() {
            return Err(MalformedRow::EmptyEntity);
        }

        let occurrences = find_char_spans(sentence, row.entity);
        if occurrences.is_empty() {
            return Ok(Vec::new());
        }

        let entity_type = self.entity_type(row)?;
        Ok(occurrences
            .into_iter()
            .map(|(start_idx, end_idx)| EntityRecord {
                entity: row.entity.to_string(),
                entity_type,
                start_idx,
                end_idx,
            })
            .collect())
    }
}

/// Convenience wrapper over [`CompletionParser`].
pub fn parse_completion(
    completion: &str,
    sentence: &str,
    types: &EntityTypeMap,
    use_index: bool,
) -> Vec<EntityRecord> {
    CompletionParser::new(types, use_index).parse(completion, sentence)
}

fn split_row(candidate: &str) -> Result<Row<'_>, MalformedRow> {
    let inner = &candidate[1..candidate.len() - 1];
    let fields: Vec<&str> = inner.split('|').map(str::trim).collect();

    match fields.as_slice() {
        &[type_label, entity, start, end] => Ok(Row {
            type_label,
            entity,
            start,
            end,
        }),
        // TABLE_ROW only yields four-field rows; this guards direct callers.
        _ => Err(MalformedRow::FieldCount(fields.len())),
    }
}

fn parse_offset(field: &str) -> Result<usize, MalformedRow> {
    field
        .parse::<usize>()
        .map_err(|_| MalformedRow::BadOffset(field.to_string()))
}

/// Inclusive character spans of every non-overlapping occurrence of `needle`.
fn find_char_spans(haystack: &str, needle: &str) -> Vec<(usize, usize)> {
    let needle_chars = needle.chars().count();

    haystack
        .match_indices(needle)
        .map(|(byte_start, _)| {
            let start = haystack[..byte_start].chars().count();
            (start, start + needle_chars - 1)
        })
        .collect()
}
