//! A1 notation helpers.
//!
//! Rows and columns are 0-based in code and 1-based / lettered on the sheet.

/// A rectangular range. `None` ends are unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    pub start_row: usize,
    pub start_col: usize,
    pub end_row: Option<usize>,
    pub end_col: Option<usize>,
}

impl Range {
    pub fn contains_row(&self, row: usize) -> bool {
        row >= self.start_row && self.end_row.is_none_or(|end| row <= end)
    }

    pub fn contains_col(&self, col: usize) -> bool {
        col >= self.start_col && self.end_col.is_none_or(|end| col <= end)
    }
}

/// 0 -> "A", 25 -> "Z", 26 -> "AA".
pub fn column_letter(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// "A" -> 0, "AA" -> 26. Case-insensitive.
pub fn column_index(letters: &str) -> Option<usize> {
    if letters.is_empty() {
        return None;
    }
    let mut n: usize = 0;
    for c in letters.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        let v = (c.to_ascii_uppercase() as u8 - b'A') as usize + 1;
        n = n.checked_mul(26)?.checked_add(v)?;
    }
    Some(n - 1)
}

/// Cell reference for a 0-based position, e.g. (6, 3) -> "D7".
pub fn cell_ref(row: usize, col: usize) -> String {
    format!("{}{}", column_letter(col), row + 1)
}

/// Splits "D7" into (Some(col), Some(row)), "D" into (Some(col), None), "7" into (None, Some(row)).
fn parse_part(part: &str) -> Option<(Option<usize>, Option<usize>)> {
    let part = part.trim();
    if part.is_empty() {
        return None;
    }
    let split = part.find(|c: char| c.is_ascii_digit()).unwrap_or(part.len());
    let (letters, digits) = part.split_at(split);

    let col = if letters.is_empty() {
        None
    } else {
        Some(column_index(letters)?)
    };
    let row = if digits.is_empty() {
        None
    } else {
        let n: usize = digits.parse().ok()?;
        if n == 0 {
            return None;
        }
        Some(n - 1)
    };
    if col.is_none() && row.is_none() {
        return None;
    }
    Some((col, row))
}

/// Parses "A1:H1", "1:1", "A:C" or a single cell "D7".
pub fn parse_range(range: &str) -> Option<Range> {
    match range.split_once(':') {
        Some((start, end)) => {
            let (start_col, start_row) = parse_part(start)?;
            let (end_col, end_row) = parse_part(end)?;
            Some(Range {
                start_row: start_row.unwrap_or(0),
                start_col: start_col.unwrap_or(0),
                end_row,
                end_col,
            })
        }
        None => {
            let (col, row) = parse_part(range)?;
            Some(Range {
                start_row: row.unwrap_or(0),
                start_col: col.unwrap_or(0),
                end_row: row,
                end_col: col,
            })
        }
    }
}

/// Quotes a worksheet title for use in a range, doubling embedded quotes.
pub fn quote_worksheet(name: &str) -> String {
    format!("'{}'", name.replace('\'', "''"))
}

/// Full range reference, e.g. `'OPT-OUT LOGS'!A1:H1`.
pub fn qualified(worksheet: &str, range: Option<&str>) -> String {
    match range {
        Some(r) => format!("{}!{}", quote_worksheet(worksheet), r),
        None => quote_worksheet(worksheet),
    }
}
