use thiserror::Error;
use tracing::debug;

use super::Record;

const DELIMITER: char = ',';

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("upload is not valid UTF-8 (invalid byte at offset {offset})")]
    InvalidEncoding { offset: usize },
}

/// Records extracted from a buffer plus the number of rejected lines
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedUpload {
    pub records: Vec<Record>,
    /// Non-blank lines that did not yield a record
    pub skipped_lines: usize,
}

/// Parse a CSV buffer into registrant records.
///
/// Each line is split on commas. A line becomes a [`Record`] only when it has
/// at least two columns and neither of the first two is blank. Anything else
/// is dropped without error.
pub fn parse(buffer: &[u8]) -> Result<ParsedUpload, ParseError> {
    let text = std::str::from_utf8(buffer).map_err(|e| ParseError::InvalidEncoding {
        offset: e.valid_up_to(),
    })?;

    let mut parsed = ParsedUpload::default();

    for (index, line) in text.split('\n').enumerate() {
        match parse_line(line) {
            Some(record) => parsed.records.push(record),
            None if line.trim().is_empty() => {}
            None => {
                parsed.skipped_lines += 1;
                debug!(line = index + 1, "Skipping malformed line");
            }
        }
    }

    Ok(parsed)
}

fn parse_line(line: &str) -> Option<Record> {
    let mut columns = line.split(DELIMITER);
    let name = columns.next()?;
    let email = columns.next()?;

    if name.trim().is_empty() || email.trim().is_empty() {
        return None;
    }

    Some(Record {
        name: name.to_string(),
        email: email.replace('\r', ""),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, email: &str) -> Record {
        Record {
            name: name.to_string(),
            email: email.to_string(),
        }
    }

    #[test]
    fn test_rejects_short_and_blank_columns() {
        let parsed = parse(b"Alice,alice@x.com\n,bob@x.com\nCarol,\n").unwrap();

        assert_eq!(parsed.records, vec![record("Alice", "alice@x.com")]);
        assert_eq!(parsed.skipped_lines, 2);
    }

    #[test]
    fn test_strips_carriage_return_from_email() {
        let parsed = parse(b"Dan,dan@x.com\r\n").unwrap();
        assert_eq!(parsed.records, vec![record("Dan", "dan@x.com")]);
    }

    #[test]
    fn test_name_is_not_trimmed() {
        let parsed = parse(b"  Eve ,eve@x.com").unwrap();
        assert_eq!(parsed.records[0].name, "  Eve ");
    }

    #[test]
    fn test_extra_columns_are_ignored() {
        let parsed = parse(b"Frank,frank@x.com,ACME,extra\r\n").unwrap();
        assert_eq!(parsed.records, vec![record("Frank", "frank@x.com")]);
    }

    #[test]
    fn test_whitespace_only_columns_are_blank() {
        let parsed = parse(b"   ,x@y.com\nGina,  \t\nsingle-column\n").unwrap();
        assert!(parsed.records.is_empty());
        assert_eq!(parsed.skipped_lines, 3);
    }

    #[test]
    fn test_blank_lines_are_not_counted() {
        let parsed = parse(b"\n\r\nX,x@y.com\n\n").unwrap();
        assert_eq!(parsed.records.len(), 1);
        assert_eq!(parsed.skipped_lines, 0);
    }

    #[test]
    fn test_empty_buffer() {
        assert_eq!(parse(b"").unwrap(), ParsedUpload::default());
    }

    #[test]
    fn test_preserves_input_order() {
        let parsed = parse(b"A,a@x.com\nB,b@x.com\nC,c@x.com").unwrap();
        let names: Vec<_> = parsed.records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_parse_is_deterministic() {
        let buffer = b"X,x@y.com\n,broken\nY,y@y.com\r\n";
        assert_eq!(parse(buffer).unwrap(), parse(buffer).unwrap());
    }

    #[test]
    fn test_invalid_utf8() {
        let result = parse(b"Ok,ok@x.com\n\xff\xfe,bad");
        assert_eq!(result, Err(ParseError::InvalidEncoding { offset: 12 }));
    }
}
