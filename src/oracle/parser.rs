//! Tolerant parser for free-text oracle replies.
//!
//! A reply is split into segments at every "Track Name:" label. Inside a
//! segment the key and tempo lines are found by label prefix, first match wins.
//! Segments missing any of the three fields are dropped whole. The parser never
//! fails; arbitrary text yields an empty list at worst.

use std::sync::OnceLock;
use regex::Regex;
use crate::MetadataRecord;

struct Patterns {
    title: Regex,
    key: Regex,
    tempo: Regex,
    number: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        // Leading list markers and markdown emphasis are allowed before a label
        title: Regex::new(r"(?im)^[\s>*#\-\d.)]*track[ \t]*name[ \t]*\**[ \t]*:[ \t]*\**").unwrap(),
        key: Regex::new(r"(?i)^[\s>*#\-]*key\s*\**\s*:(.*)$").unwrap(),
        tempo: Regex::new(r"(?i)^[\s>*#\-]*(?:bpm|tempo)(?:\s*\(bpm\))?\s*\**\s*:(.*)$").unwrap(),
        number: Regex::new(r"\d+(?:\.\d+)?").unwrap(),
    })
}

pub fn parse_response(response: &str) -> Vec<MetadataRecord> {
    let patterns = patterns();
    let starts: Vec<(usize, usize)> = patterns
        .title
        .find_iter(response)
        .map(|m| (m.start(), m.end()))
        .collect();

    let mut records = Vec::new();
    for (i, &(_, body_start)) in starts.iter().enumerate() {
        let body_end = starts.get(i + 1).map_or(response.len(), |next| next.0);
        let segment = &response[body_start..body_end];
        match parse_segment(segment, patterns) {
            Some(record) => records.push(record),
            None => log::debug!("Dropping incomplete oracle entry: {:?}", segment.trim()),
        }
    }
    records
}

fn parse_segment(segment: &str, patterns: &Patterns) -> Option<MetadataRecord> {
    let mut lines = segment.lines();
    let title = clean_value(lines.next()?);
    if title.is_empty() {
        return None;
    }

    let mut key = None;
    let mut tempo = None;
    for line in lines {
        if key.is_none() {
            if let Some(caps) = patterns.key.captures(line) {
                let value = clean_value(&caps[1]);
                if !value.is_empty() {
                    key = Some(value);
                    continue;
                }
            }
        }
        if tempo.is_none() {
            if let Some(caps) = patterns.tempo.captures(line) {
                tempo = patterns.number.find(&caps[1]).map(|m| m.as_str().to_string());
            }
        }
    }

    Some(MetadataRecord::new(title, key?, tempo?))
}

fn clean_value(raw: &str) -> String {
    raw.trim()
        .trim_matches(|c: char| c == '*' || c == '`' || c == '"')
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn single_entry() {
        let records = parse_response("Track Name: Artist - Song\nKey: A minor\nBPM: 128\n");
        assert_eq!(records, vec![MetadataRecord::new("Artist - Song", "A minor", "128")]);
    }

    #[test]
    fn entry_without_bpm_is_dropped() {
        let reply = "Track Name: Artist - One\nKey: C major\n\nTrack Name: Artist - Two\nKey: D minor\nBPM: 100\n";
        let records = parse_response(reply);
        assert_eq!(records, vec![MetadataRecord::new("Artist - Two", "D minor", "100")]);
    }

    #[test]
    fn tolerates_case_markdown_and_tempo_synonym() {
        let reply = "Here you go:\n\n1. **Track Name:** Artist - Song\n   - **key:** F# minor\n   - **Tempo:** approx. 122 BPM\n";
        let records = parse_response(reply);
        assert_eq!(records, vec![MetadataRecord::new("Artist - Song", "F# minor", "122")]);
    }

    #[test]
    fn first_duplicate_label_wins() {
        let reply = "Track Name: X - Y\nKey: E minor\nKey: G major\nBPM: 90\nBPM: 180\n";
        assert_eq!(parse_response(reply), vec![MetadataRecord::new("X - Y", "E minor", "90")]);
    }

    #[test]
    fn non_numeric_tempo_drops_entry() {
        let reply = "Track Name: X - Y\nKey: E minor\nBPM: unknown\n";
        assert!(parse_response(reply).is_empty());
    }

    #[test]
    fn reversed_field_order_yields_nothing() {
        let reply = "BPM: 128\nKey: A minor\nTrack Name: Artist - Song\n";
        assert!(parse_response(reply).is_empty());
    }

    #[test]
    fn total_on_arbitrary_text() {
        for reply in ["", "\n\n", "Track Name:", "Track Name:\nKey:\nBPM:", "I'm not sure about any of these.", "Track Name: a\nKey: b\nBPM: 1"] {
            let records = parse_response(reply);
            assert!(records.iter().all(|r| !r.raw_title.is_empty() && !r.key.is_empty() && !r.tempo.is_empty()));
        }
        assert_eq!(parse_response("Track Name: a\nKey: b\nBPM: 1").len(), 1);
    }

    #[test]
    fn many_entries_keep_reply_order() {
        let reply = "Track Name: B - Two\nKey: C\nBPM: 120.5\n\nTrack Name: A - One\nKey: D\nBPM: 99\n";
        let titles: Vec<String> = parse_response(reply).into_iter().map(|r| r.raw_title).collect();
        assert_eq!(titles, vec!["B - Two", "A - One"]);
    }
}
