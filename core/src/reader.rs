//! Readers for `.I`/`.T`/`.A`/`.B`/`.W` record dumps (Cranfield layout).
//!
//! Parsing is permissive: anything out of place is reported with `warn!` and
//! skipped. Only I/O failures are errors.

use crate::{Corpus, RawText, Result, VsmError};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    Id,
    Title,
    Author,
    Biblio,
    Body,
    Unknown(char),
}

/// Recognize a marker line: a dot, one uppercase letter, then end of line or whitespace.
fn marker(line: &str) -> Option<(Marker, &str)> {
    let mut chars = line.chars();
    if chars.next() != Some('.') {
        return None;
    }
    let letter = chars.next().filter(|c| c.is_ascii_uppercase())?;
    let rest = &line[2..];
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let m = match letter {
        'I' => Marker::Id,
        'T' => Marker::Title,
        'A' => Marker::Author,
        'B' => Marker::Biblio,
        'W' => Marker::Body,
        other => Marker::Unknown(other),
    };
    Some((m, rest.trim()))
}

fn parse_id(rest: &str, line_no: usize, kind: &str) -> Option<u32> {
    match rest.parse::<u32>() {
        Ok(id) => Some(id),
        Err(_) => {
            warn!(line = line_no, kind, value = rest, "unparsable record id; skipping record");
            None
        }
    }
}

fn push_line(buf: &mut String, line: &str) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }
    if !buf.is_empty() {
        buf.push(' ');
    }
    buf.push_str(line);
}

#[derive(Default)]
struct DocFields {
    title: String,
    author: String,
    body: String,
}

impl DocFields {
    fn joined(self) -> String {
        [self.title, self.author, self.body]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Field {
    None,
    Title,
    Author,
    Biblio,
    Body,
    Skip,
}

/// Parse a document collection into records, in file order.
///
/// Record text is the title, author and body fields (each trimmed line joined
/// by single spaces) concatenated in that order; bibliography text is dropped.
pub fn parse_document_records(text: &str) -> Vec<RawText> {
    let mut records = Vec::new();
    let mut current: Option<(u32, DocFields)> = None;
    let mut field = Field::None;

    for (idx, line) in text.lines().enumerate() {
        let line_no = idx + 1;
        if let Some((m, rest)) = marker(line) {
            match m {
                Marker::Id => {
                    if let Some((id, fields)) = current.take() {
                        records.push(RawText { id, text: fields.joined() });
                    }
                    current = parse_id(rest, line_no, "document")
                        .map(|id| (id, DocFields::default()));
                    field = if current.is_some() { Field::None } else { Field::Skip };
                }
                Marker::Title => field = Field::Title,
                Marker::Author => field = Field::Author,
                Marker::Biblio => field = Field::Biblio,
                Marker::Body => field = Field::Body,
                Marker::Unknown(c) => {
                    warn!(line = line_no, marker = %c, "unknown field marker; ignoring its text");
                    field = Field::Skip;
                }
            }
            // Some dumps put field text on the marker line itself.
            if !matches!(m, Marker::Id) && !rest.is_empty() {
                if let Some((_, fields)) = current.as_mut() {
                    append_doc_field(fields, field, rest);
                }
            }
            continue;
        }

        match current.as_mut() {
            Some((_, fields)) => {
                if field == Field::None && !line.trim().is_empty() {
                    warn!(line = line_no, "text before any field marker; skipping");
                }
                append_doc_field(fields, field, line);
            }
            None => {
                if field != Field::Skip && !line.trim().is_empty() {
                    warn!(line = line_no, "text outside any record; skipping");
                }
            }
        }
    }

    if let Some((id, fields)) = current {
        records.push(RawText { id, text: fields.joined() });
    }
    debug!(records = records.len(), "parsed document records");
    records
}

fn append_doc_field(fields: &mut DocFields, field: Field, line: &str) {
    match field {
        Field::Title => push_line(&mut fields.title, line),
        Field::Author => push_line(&mut fields.author, line),
        Field::Body => push_line(&mut fields.body, line),
        Field::Biblio | Field::None | Field::Skip => {}
    }
}

/// Parse a query collection: `.I <id>`, then `.W`, then free text until the next `.I`.
pub fn parse_query_records(text: &str) -> Vec<RawText> {
    let mut records = Vec::new();
    let mut current: Option<(u32, String)> = None;
    let mut in_body = false;

    for (idx, line) in text.lines().enumerate() {
        let line_no = idx + 1;
        match marker(line) {
            Some((Marker::Id, rest)) => {
                if let Some((id, body)) = current.take() {
                    records.push(RawText { id, text: body });
                }
                current = parse_id(rest, line_no, "query").map(|id| (id, String::new()));
                in_body = false;
            }
            Some((Marker::Body, rest)) => {
                in_body = true;
                if let Some((_, body)) = current.as_mut() {
                    push_line(body, rest);
                }
            }
            Some((other, _)) => {
                warn!(
                    line = line_no,
                    marker = ?other,
                    "unexpected marker in query record; skipping line"
                );
            }
            None => match current.as_mut() {
                Some((_, body)) if in_body => push_line(body, line),
                Some(_) => {
                    if !line.trim().is_empty() {
                        warn!(line = line_no, "query text before .W marker; skipping");
                    }
                }
                None => {
                    if !line.trim().is_empty() {
                        warn!(line = line_no, "text outside any query record; skipping");
                    }
                }
            },
        }
    }

    if let Some((id, body)) = current {
        records.push(RawText { id, text: body });
    }
    debug!(records = records.len(), "parsed query records");
    records
}

fn into_corpus(records: Vec<RawText>, kind: &str) -> Corpus<String> {
    let mut corpus = Corpus::new();
    for record in records {
        if corpus.insert(record.id, record.text).is_some() {
            warn!(id = record.id, kind, "duplicate record id; later record replaces earlier one");
        }
    }
    corpus
}

pub fn parse_documents(text: &str) -> Corpus<String> {
    into_corpus(parse_document_records(text), "document")
}

pub fn parse_queries(text: &str) -> Corpus<String> {
    into_corpus(parse_query_records(text), "query")
}

fn read_to_string(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|e| VsmError::io(path, e))?;
    // Older collection dumps are not always clean UTF-8.
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

pub fn read_documents<P: AsRef<Path>>(path: P) -> Result<Corpus<String>> {
    let path = path.as_ref();
    let docs = parse_documents(&read_to_string(path)?);
    info!(path = %path.display(), num_docs = docs.len(), "read document collection");
    Ok(docs)
}

pub fn read_queries<P: AsRef<Path>>(path: P) -> Result<Corpus<String>> {
    let path = path.as_ref();
    let queries = parse_queries(&read_to_string(path)?);
    info!(path = %path.display(), num_queries = queries.len(), "read query collection");
    Ok(queries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_title_author_body() {
        let docs = parse_documents(".I 1\n.T\nTitle Text\n.A\nAuthor Name\n.W\nBody text here\n");
        assert_eq!(docs.len(), 1);
        assert_eq!(docs.get(1).map(String::as_str), Some("Title Text Author Name Body text here"));
    }

    #[test]
    fn bibliography_is_dropped_and_lines_joined() {
        let input = concat!(
            ".I 7\n.T\nexperimental investigation\n  of the aerodynamics .\n",
            ".A\nbrenckman,m.\n.B\nj. ae. scs. 25, 1958, 324.\n",
            ".W\nexperimental investigation\nof the wing .\n",
        );
        let docs = parse_documents(input);
        let expected = "experimental investigation of the aerodynamics . brenckman,m. \
                        experimental investigation of the wing .";
        assert_eq!(docs.get(7).map(String::as_str), Some(expected));
    }

    #[test]
    fn missing_fields_do_not_leave_double_spaces() {
        let docs = parse_documents(".I 2\n.W\nonly a body\n.I 3\n.T\nonly a title\n");
        assert_eq!(docs.get(2).map(String::as_str), Some("only a body"));
        assert_eq!(docs.get(3).map(String::as_str), Some("only a title"));
    }

    #[test]
    fn keeps_file_order_and_noncontiguous_ids() {
        let docs = parse_documents(".I 10\n.W\nten\n.I 2\n.W\ntwo\n.I 33\n.W\nthirty three\n");
        assert_eq!(docs.ids().collect::<Vec<_>>(), vec![10, 2, 33]);
    }

    #[test]
    fn malformed_records_are_tolerated() {
        let input = "stray preamble\n.I abc\n.W\nlost text\n\
                     .I 4\nno marker yet\n.X\nweird field\n.W\nreal body\n";
        let docs = parse_documents(input);
        assert_eq!(docs.len(), 1);
        assert_eq!(docs.get(4).map(String::as_str), Some("real body"));
    }

    #[test]
    fn dotted_text_is_not_a_marker() {
        let docs = parse_documents(".I 1\n.W\n.5 inch span\n.\nend\n");
        assert_eq!(docs.get(1).map(String::as_str), Some(".5 inch span . end"));
    }

    #[test]
    fn parses_queries() {
        let input = concat!(
            ".I 001\n.W\nwhat similarity laws must be obeyed when constructing\n",
            "aeroelastic models of heated high speed aircraft .\n",
            ".I 002\n.W\nwhat are the structural and aeroelastic problems\n",
        );
        let q = parse_queries(input);
        assert_eq!(q.ids().collect::<Vec<_>>(), vec![1, 2]);
        let expected = "what similarity laws must be obeyed when constructing \
                        aeroelastic models of heated high speed aircraft .";
        assert_eq!(q.get(1).map(String::as_str), Some(expected));
    }

    #[test]
    fn query_lines_before_body_marker_are_skipped() {
        let q = parse_queries(".I 5\nnoise line\n.W\njet engine\n");
        assert_eq!(q.get(5).map(String::as_str), Some("jet engine"));
    }

    #[test]
    fn duplicate_ids_replace_in_place() {
        let q = parse_queries(".I 1\n.W\nfirst\n.I 2\n.W\nsecond\n.I 1\n.W\nthird\n");
        assert_eq!(q.ids().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(q.get(1).map(String::as_str), Some("third"));
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = read_documents("/definitely/not/here/cran.all.1400").unwrap_err();
        assert!(matches!(err, VsmError::Io { .. }));
    }
}
