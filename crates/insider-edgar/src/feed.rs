//! Atom index feed walker.
//!
//! The EDGAR "current events" feed lists the most recently accepted Form 4
//! filings. Each entry carries the filer-side metadata only; issuer name and
//! ticker come later, from the filing document itself.

use chrono::{DateTime, Utc};
use quick_xml::Reader;
use quick_xml::events::Event;
use std::collections::HashSet;
use tracing::warn;

use insider_core::{AccessionId, FilingCandidate, IngestError, Result};

/// Current-events feed for Form 4 filings, without the count parameter.
pub(crate) const FEED_URL: &str =
    "https://www.sec.gov/cgi-bin/browse-edgar?action=getcurrent&type=4&owner=only&output=atom";

/// Fields accumulated for the entry currently being read.
#[derive(Debug, Default)]
struct EntryFields {
    title: String,
    updated: String,
    form_type: String,
    link: String,
}

/// Parses the atom feed into filing candidates, capped at `limit`.
///
/// Entries with unresolvable metadata are skipped with a warning; duplicate
/// accession ids keep their first occurrence so at most one ingestion runs
/// per filing. A document that is not an atom feed at all is a parse error.
pub fn parse_feed(xml: &[u8], limit: usize) -> Result<Vec<FilingCandidate>> {
    let text = std::str::from_utf8(xml)
        .map_err(|e| IngestError::Parse(format!("feed is not valid UTF-8: {e}")))?;

    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut candidates = Vec::new();
    let mut seen: HashSet<AccessionId> = HashSet::new();
    let mut saw_feed = false;
    let mut entry: Option<EntryFields> = None;
    let mut current_element: Vec<u8> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                let name = e.local_name().as_ref().to_vec();
                match name.as_slice() {
                    b"feed" => saw_feed = true,
                    b"entry" => entry = Some(EntryFields::default()),
                    b"link" => {
                        if let Some(fields) = entry.as_mut() {
                            if let Some(href) = attribute(&e, b"href")? {
                                fields.link = href;
                            }
                        }
                    }
                    b"category" => {
                        if let Some(fields) = entry.as_mut() {
                            if let Some(term) = attribute(&e, b"term")? {
                                fields.form_type = term;
                            }
                        }
                    }
                    _ => {}
                }
                current_element = name;
            }
            Ok(Event::Text(t)) => {
                if let Some(fields) = entry.as_mut() {
                    let value = t
                        .unescape()
                        .map_err(|e| IngestError::Parse(format!("feed text: {e}")))?;
                    match current_element.as_slice() {
                        b"title" => fields.title = value.into_owned(),
                        b"updated" => fields.updated = value.into_owned(),
                        _ => {}
                    }
                }
            }
            Ok(Event::End(e)) => {
                if e.local_name().as_ref() == b"entry" {
                    if let Some(fields) = entry.take() {
                        match resolve_entry(&fields) {
                            Some(candidate) => {
                                if seen.insert(candidate.accession_id.clone()) {
                                    candidates.push(candidate);
                                }
                            }
                            None => {
                                warn!(title = %fields.title, "skipping unresolvable feed entry");
                            }
                        }
                    }
                    if candidates.len() >= limit {
                        break;
                    }
                }
                current_element.clear();
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(IngestError::Parse(format!("malformed feed: {e}"))),
        }
    }

    if !saw_feed {
        return Err(IngestError::Parse(
            "document is not an atom feed".to_string(),
        ));
    }

    Ok(candidates)
}

/// Reads one attribute off a start tag.
fn attribute(e: &quick_xml::events::BytesStart<'_>, key: &[u8]) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr.map_err(|e| IngestError::Parse(format!("feed attribute: {e}")))?;
        if attr.key.local_name().as_ref() == key {
            let value = attr
                .unescape_value()
                .map_err(|e| IngestError::Parse(format!("feed attribute: {e}")))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// Turns one entry's fields into a candidate, or `None` when required
/// metadata is missing or malformed.
fn resolve_entry(fields: &EntryFields) -> Option<FilingCandidate> {
    let (filer_name, cik) = parse_title(&fields.title)?;
    let accession_id = accession_from_link(&fields.link)?;
    let filed_at = DateTime::parse_from_rfc3339(&fields.updated)
        .ok()?
        .with_timezone(&Utc);

    Some(FilingCandidate {
        accession_id,
        cik,
        filer_name,
        form_type: if fields.form_type.is_empty() {
            "4".to_string()
        } else {
            fields.form_type.clone()
        },
        index_url: fields.link.clone(),
        filed_at,
    })
}

/// Splits a feed entry title of the form "4 - Name (CIK) (Reporting)" into
/// the filer name and CIK.
fn parse_title(title: &str) -> Option<(String, String)> {
    let rest = title.split_once(" - ")?.1;
    let (name, tail) = rest.split_once('(')?;
    let cik = tail.split_once(')')?.0.trim();
    if cik.is_empty() || !cik.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((name.trim().to_string(), cik.to_string()))
}

/// Extracts the accession directory from an index page link.
fn accession_from_link(link: &str) -> Option<AccessionId> {
    let mut segments = link.trim_end_matches('/').rsplit('/');
    let _index_page = segments.next()?;
    let directory = segments.next()?;
    if directory.is_empty() || directory.contains(':') {
        None
    } else {
        Some(AccessionId::new(directory))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) const FEED_FIXTURE: &str = r#"<?xml version="1.0" encoding="ISO-8859-1" ?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Latest Filings - Thu, 05 Jun 2025 12:00:00 EDT</title>
  <entry>
    <title>4 - Doe Jane (0001111111) (Reporting)</title>
    <link rel="alternate" type="text/html" href="https://www.sec.gov/Archives/edgar/data/1111111/000111111125000001/0001111111-25-000001-index.htm"/>
    <category scheme="https://www.sec.gov/form-types" label="form type" term="4"/>
    <updated>2025-06-05T11:58:03-04:00</updated>
  </entry>
  <entry>
    <title>4 - Smith John (0002222222) (Reporting)</title>
    <link rel="alternate" type="text/html" href="https://www.sec.gov/Archives/edgar/data/2222222/000222222225000002/0002222222-25-000002-index.htm"/>
    <category scheme="https://www.sec.gov/form-types" label="form type" term="4"/>
    <updated>2025-06-05T11:57:44-04:00</updated>
  </entry>
  <entry>
    <title>malformed entry without separator</title>
    <link rel="alternate" type="text/html" href="https://www.sec.gov/Archives/edgar/data/3333333/000333333325000003/0003333333-25-000003-index.htm"/>
    <updated>2025-06-05T11:57:01-04:00</updated>
  </entry>
  <entry>
    <title>4 - Smith John (0002222222) (Reporting)</title>
    <link rel="alternate" type="text/html" href="https://www.sec.gov/Archives/edgar/data/2222222/000222222225000002/0002222222-25-000002-index.htm"/>
    <category scheme="https://www.sec.gov/form-types" label="form type" term="4"/>
    <updated>2025-06-05T11:57:44-04:00</updated>
  </entry>
</feed>"#;

    #[test]
    fn parses_entries_and_skips_unresolvable() {
        let candidates = parse_feed(FEED_FIXTURE.as_bytes(), 100).unwrap();

        // Two resolvable entries; the malformed title is skipped and the
        // duplicate accession keeps its first occurrence.
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].filer_name, "Doe Jane");
        assert_eq!(candidates[0].cik, "0001111111");
        assert_eq!(candidates[0].accession_id.as_str(), "000111111125000001");
        assert_eq!(candidates[0].form_type, "4");
        assert_eq!(candidates[1].accession_id.as_str(), "000222222225000002");
    }

    #[test]
    fn respects_limit() {
        let candidates = parse_feed(FEED_FIXTURE.as_bytes(), 1).unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].filer_name, "Doe Jane");
    }

    #[test]
    fn rejects_non_feed_documents() {
        let err = parse_feed(b"<html><body>blocked</body></html>", 10).unwrap_err();
        assert!(matches!(err, IngestError::Parse(_)));
    }

    #[test]
    fn title_parsing() {
        assert_eq!(
            parse_title("4 - Doe Jane (0001111111) (Reporting)"),
            Some(("Doe Jane".to_string(), "0001111111".to_string()))
        );
        assert_eq!(parse_title("no separator here"), None);
        assert_eq!(parse_title("4 - Doe Jane (not-a-cik)"), None);
    }

    #[test]
    fn accession_extraction() {
        let link =
            "https://www.sec.gov/Archives/edgar/data/1111111/000111111125000001/0001111111-25-000001-index.htm";
        assert_eq!(
            accession_from_link(link).unwrap().as_str(),
            "000111111125000001"
        );
        assert_eq!(accession_from_link("not-a-url"), None);
    }
}
