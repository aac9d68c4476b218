use std::io::BufRead;

use tracing::debug;

use crate::common::{IndexError, Result};
use crate::index::TreeIndex;

use super::record_store::RecordStore;

fn is_blank(c: char) -> bool {
    c == ' ' || c == '\t'
}

/// Parses one `key, value` load line. `line_no` is 1-based and only used
/// in errors.
///
/// The key is a decimal `i32` before the first comma. Blanks after the comma
/// are skipped; a value opening with `'` or `"` runs to the matching quote
/// (or the end of the line if it is never closed), otherwise it is the rest
/// of the line. An empty value is allowed.
pub fn parse_load_line(line: &str, line_no: usize) -> Result<(i32, String)> {
    let invalid = |reason: String| IndexError::InvalidFileFormat {
        line: line_no,
        reason,
    };

    let line = line.strip_suffix('\r').unwrap_or(line);
    let (key_part, rest) = line
        .split_once(',')
        .ok_or_else(|| invalid("missing ',' between key and value".to_string()))?;

    let key_part = key_part.trim_matches(is_blank);
    let key = key_part
        .parse::<i32>()
        .map_err(|e| invalid(format!("bad key {:?}: {}", key_part, e)))?;

    let rest = rest.trim_start_matches(is_blank);
    let value = match rest.chars().next() {
        Some(quote @ ('\'' | '"')) => {
            let quoted = &rest[quote.len_utf8()..];
            match quoted.find(quote) {
                Some(end) => &quoted[..end],
                None => quoted,
            }
        }
        _ => rest,
    };

    Ok((key, value.to_string()))
}

/// Appends every line of `reader` to `records` and, when given, indexes the
/// returned locator under the line's key. Blank lines are skipped.
///
/// Returns the number of records loaded. Stops at the first malformed line;
/// records before it stay loaded.
pub fn load<R: BufRead, S: RecordStore>(
    reader: R,
    records: &mut S,
    mut index: Option<&mut TreeIndex>,
) -> Result<usize> {
    let mut loaded = 0;

    for (i, line) in reader.lines().enumerate() {
        let line_no = i + 1;
        let line = line.map_err(|source| IndexError::LoadReadFailed {
            line: line_no,
            source,
        })?;
        if line.trim().is_empty() {
            continue;
        }

        let (key, value) = parse_load_line(&line, line_no)?;
        let rid = records.append(key, &value)?;
        if let Some(index) = index.as_deref_mut() {
            index.insert(key, rid)?;
        }
        loaded += 1;
    }

    debug!(loaded, indexed = index.is_some(), "finished load");
    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_value() {
        assert_eq!(
            parse_load_line("42, hello world", 1).unwrap(),
            (42, "hello world".to_string())
        );
        assert_eq!(
            parse_load_line(" \t-7,\tvalue, with comma ", 1).unwrap(),
            (-7, "value, with comma ".to_string())
        );
    }

    #[test]
    fn test_parse_quoted_value() {
        assert_eq!(
            parse_load_line("1, 'quoted' trailing", 1).unwrap(),
            (1, "quoted".to_string())
        );
        assert_eq!(
            parse_load_line("2,\"it's\"", 1).unwrap(),
            (2, "it's".to_string())
        );
        assert_eq!(
            parse_load_line("3, 'never closed", 1).unwrap(),
            (3, "never closed".to_string())
        );
    }

    #[test]
    fn test_parse_empty_value() {
        assert_eq!(parse_load_line("5,", 1).unwrap(), (5, String::new()));
        assert_eq!(parse_load_line("5,   ", 1).unwrap(), (5, String::new()));
        assert_eq!(parse_load_line("5, ''", 1).unwrap(), (5, String::new()));
    }

    #[test]
    fn test_parse_strips_carriage_return() {
        assert_eq!(
            parse_load_line("9, dos line\r", 1).unwrap(),
            (9, "dos line".to_string())
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            parse_load_line("42 no comma", 3),
            Err(IndexError::InvalidFileFormat { line: 3, .. })
        ));
        assert!(matches!(
            parse_load_line("abc, value", 4),
            Err(IndexError::InvalidFileFormat { line: 4, .. })
        ));
        assert!(matches!(
            parse_load_line("2147483648, too big", 5),
            Err(IndexError::InvalidFileFormat { line: 5, .. })
        ));
    }
}
