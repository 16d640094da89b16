//! A1-notation helpers shared by the engine and the in-memory spreadsheet.

use crate::{Error, Result};

/// Zero-based column index to letters: 0 → `A`, 25 → `Z`, 26 → `AA`.
pub fn column_letter(index: usize) -> String {
    let mut n = index + 1;
    let mut out = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        out.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

/// Letters to zero-based column index. Case-insensitive.
pub fn column_index(letters: &str) -> Option<usize> {
    if letters.is_empty() {
        return None;
    }
    let mut n = 0usize;
    for c in letters.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        n = n * 26 + (c.to_ascii_uppercase() as u8 - b'A' + 1) as usize;
    }
    Some(n - 1)
}

/// Quote a tab title for use in a range (`Trip Plan` → `'Trip Plan'`).
pub fn quote_tab(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

/// Whole-tab range.
pub fn tab_range(title: &str) -> String {
    quote_tab(title)
}

/// Single cell; `row` is 1-based.
pub fn cell(title: &str, col: usize, row: usize) -> String {
    format!("{}!{}{}", quote_tab(title), column_letter(col), row)
}

/// Rectangular range; rows are 1-based, `end_row = None` means open-ended.
pub fn span(
    title: &str,
    start_col: usize,
    start_row: usize,
    end_col: usize,
    end_row: Option<usize>,
) -> String {
    let end_row = end_row.map(|r| r.to_string()).unwrap_or_default();
    format!(
        "{}!{}{}:{}{}",
        quote_tab(title),
        column_letter(start_col),
        start_row,
        column_letter(end_col),
        end_row
    )
}

/// Parsed form of an A1 range. Rows are 1-based; columns zero-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeRef {
    pub tab: String,
    pub start_col: usize,
    pub start_row: usize,
    /// `None` = to the last column.
    pub end_col: Option<usize>,
    /// `None` = to the last row.
    pub end_row: Option<usize>,
}

impl RangeRef {
    pub fn parse(range: &str) -> Result<Self> {
        let range = range.trim();
        let (tab_part, cells) = split_tab(range)?;
        let tab = unquote_tab(tab_part)?;

        let Some(cells) = cells else {
            return Ok(Self {
                tab,
                start_col: 0,
                start_row: 1,
                end_col: None,
                end_row: None,
            });
        };

        let (start, end) = match cells.split_once(':') {
            Some((a, b)) => (a, Some(b)),
            None => (cells, None),
        };
        let (start_col, start_row) = parse_cell(start, range)?;
        let start_col = start_col.unwrap_or(0);
        let start_row = start_row.unwrap_or(1);

        let (end_col, end_row) = match end {
            Some(end) => {
                let (c, r) = parse_cell(end, range)?;
                (c, r)
            }
            // A lone cell addresses exactly that cell.
            None => (Some(start_col), Some(start_row)),
        };

        Ok(Self {
            tab,
            start_col,
            start_row,
            end_col,
            end_row,
        })
    }
}

fn split_tab(range: &str) -> Result<(&str, Option<&str>)> {
    if range.starts_with('\'') {
        // Closing quote is the last `'` not part of an escaped `''` pair; find it by scanning.
        let bytes = range.as_bytes();
        let mut i = 1;
        while i < bytes.len() {
            if bytes[i] == b'\'' {
                if i + 1 < bytes.len() && bytes[i + 1] == b'\'' {
                    i += 2;
                    continue;
                }
                let tab = &range[..=i];
                let rest = &range[i + 1..];
                return match rest.strip_prefix('!') {
                    Some(cells) => Ok((tab, Some(cells))),
                    None if rest.is_empty() => Ok((tab, None)),
                    None => Err(Error::InvalidInput(format!("invalid range: {range}"))),
                };
            }
            i += 1;
        }
        return Err(Error::InvalidInput(format!("unterminated tab quote: {range}")));
    }
    match range.split_once('!') {
        Some((tab, cells)) => Ok((tab, Some(cells))),
        None => Ok((range, None)),
    }
}

fn unquote_tab(tab: &str) -> Result<String> {
    let out = match tab.strip_prefix('\'').and_then(|t| t.strip_suffix('\'')) {
        Some(inner) => inner.replace("''", "'"),
        None => tab.to_string(),
    };
    if out.trim().is_empty() {
        return Err(Error::InvalidInput("range has empty tab title".to_string()));
    }
    Ok(out)
}

fn parse_cell(cell: &str, range: &str) -> Result<(Option<usize>, Option<usize>)> {
    let letters: String = cell.chars().take_while(|c| c.is_ascii_alphabetic()).collect();
    let digits = &cell[letters.len()..];
    let col = if letters.is_empty() {
        None
    } else {
        Some(
            column_index(&letters)
                .ok_or_else(|| Error::InvalidInput(format!("invalid range: {range}")))?,
        )
    };
    let row = if digits.is_empty() {
        None
    } else {
        let n = digits
            .parse::<usize>()
            .map_err(|_| Error::InvalidInput(format!("invalid range: {range}")))?;
        if n == 0 {
            return Err(Error::InvalidInput(format!("row 0 in range: {range}")));
        }
        Some(n)
    };
    if col.is_none() && row.is_none() {
        return Err(Error::InvalidInput(format!("invalid range: {range}")));
    }
    Ok((col, row))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letters_cover_multi_letter_columns() {
        assert_eq!(column_letter(0), "A");
        assert_eq!(column_letter(8), "I");
        assert_eq!(column_letter(25), "Z");
        assert_eq!(column_letter(26), "AA");
        assert_eq!(column_letter(27), "AB");
        assert_eq!(column_letter(701), "ZZ");
        assert_eq!(column_letter(702), "AAA");
        for i in [0, 5, 25, 26, 51, 52, 701, 702, 5000] {
            assert_eq!(column_index(&column_letter(i)), Some(i));
        }
    }

    #[test]
    fn builds_quoted_ranges() {
        assert_eq!(cell("Locations", 6, 2), "'Locations'!G2");
        assert_eq!(cell("Tom's Trip", 0, 1), "'Tom''s Trip'!A1");
        assert_eq!(span("Itinerary", 0, 2, 3, None), "'Itinerary'!A2:D");
        assert_eq!(span("Itinerary", 0, 2, 3, Some(4)), "'Itinerary'!A2:D4");
    }

    #[test]
    fn parses_common_shapes() {
        let r = RangeRef::parse("'Locations'").unwrap();
        assert_eq!((r.tab.as_str(), r.start_col, r.start_row), ("Locations", 0, 1));
        assert_eq!((r.end_col, r.end_row), (None, None));

        let r = RangeRef::parse("'Tom''s Trip'!G2").unwrap();
        assert_eq!(r.tab, "Tom's Trip");
        assert_eq!((r.start_col, r.start_row, r.end_col, r.end_row), (6, 2, Some(6), Some(2)));

        let r = RangeRef::parse("Itinerary!A2:D").unwrap();
        assert_eq!((r.start_col, r.start_row, r.end_col, r.end_row), (0, 2, Some(3), None));

        let r = RangeRef::parse("'Locations'!A1:L1").unwrap();
        assert_eq!((r.end_col, r.end_row), (Some(11), Some(1)));
    }

    #[test]
    fn rejects_garbage() {
        assert!(RangeRef::parse("'Open!A1").is_err());
        assert!(RangeRef::parse("Tab!A0").is_err());
        assert!(RangeRef::parse("Tab!:").is_err());
    }
}
