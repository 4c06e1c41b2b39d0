//! Program images: the textual row format the CLI loads.
//!
//! A program file carries one 32-bit hexadecimal word per line, in
//! table order (row 0 first).  For geometries whose rows span two
//! words each row takes two lines, low word first.  Blank lines and
//! `#` comments are ignored.
use std::error;
use std::fmt::{self, Display, Formatter};

use base::prelude::*;

#[derive(Debug, PartialEq, Eq)]
pub enum ProgramError {
    BadWord { line: usize, text: String },
    OddWordCount(usize),
    TooManyRows { rows: usize, capacity: u16 },
}

impl Display for ProgramError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ProgramError::BadWord { line, text } => {
                write!(f, "line {line}: {text:?} is not a 32-bit hex word")
            }
            ProgramError::OddWordCount(words) => {
                write!(
                    f,
                    "program has {words} words; rows of this shape need two words each"
                )
            }
            ProgramError::TooManyRows { rows, capacity } => {
                write!(f, "program has {rows} rows but the table holds {capacity}")
            }
        }
    }
}

impl error::Error for ProgramError {}

/// Extract the hex words from a program file.
pub fn parse_words(text: &str) -> Result<Vec<u32>, ProgramError> {
    let mut words = Vec::new();
    for (number, raw) in text.lines().enumerate() {
        let line = match raw.find('#') {
            Some(at) => &raw[..at],
            None => raw,
        }
        .trim();
        if line.is_empty() {
            continue;
        }
        let digits = line.strip_prefix("0x").unwrap_or(line);
        match u32::from_str_radix(digits, 16) {
            Ok(word) => words.push(word),
            Err(_) => {
                return Err(ProgramError::BadWord {
                    line: number + 1,
                    text: line.to_string(),
                });
            }
        }
    }
    Ok(words)
}

/// Assemble file words into row images for a table of `capacity`
/// rows.  Excess bits beyond the row width are masked off by the
/// loader when the rows are staged.
pub fn rows_from_words(
    words: &[u32],
    layout: &RowLayout,
    capacity: u16,
) -> Result<Vec<RowImage>, ProgramError> {
    let rows: Vec<RowImage> = if layout.split_words() {
        if words.len() % 2 != 0 {
            return Err(ProgramError::OddWordCount(words.len()));
        }
        words
            .chunks(2)
            .map(|pair| RowImage::from_words(pair[0], pair[1]))
            .collect()
    } else {
        words.iter().map(|word| RowImage::new(u64::from(*word))).collect()
    };
    if rows.len() > usize::from(capacity) {
        return Err(ProgramError::TooManyRows {
            rows: rows.len(),
            capacity,
        });
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_skips_comments_and_blanks() {
        let text = "# header\n0x11223344\n\n  55667788  # trailing\n";
        assert_eq!(parse_words(text), Ok(vec![0x1122_3344, 0x5566_7788]));
    }

    #[test]
    fn test_parse_reports_the_bad_line() {
        let text = "0x1\nnope\n";
        assert_eq!(
            parse_words(text),
            Err(ProgramError::BadWord {
                line: 2,
                text: "nope".to_string()
            })
        );
    }

    #[test]
    fn test_split_rows_pair_low_word_then_high() {
        let layout = RowLayout::new(&Geometry::default());
        let rows = rows_from_words(&[0x0094_77a5, 0x0750_1ec4], &layout, 8).expect("pairs");
        assert_eq!(rows, vec![RowImage::from_words(0x0094_77a5, 0x0750_1ec4)]);
    }

    #[test]
    fn test_odd_word_count_is_rejected() {
        let layout = RowLayout::new(&Geometry::default());
        assert_eq!(
            rows_from_words(&[1, 2, 3], &layout, 8),
            Err(ProgramError::OddWordCount(3))
        );
    }

    #[test]
    fn test_narrow_rows_take_one_word_each() {
        let geometry = Geometry::new(2, 2, 0, 2, 2, vec![]).expect("valid test geometry");
        let layout = RowLayout::new(&geometry);
        let rows = rows_from_words(&[0x3, 0x7], &layout, 2).expect("single words");
        assert_eq!(rows, vec![RowImage::new(0x3), RowImage::new(0x7)]);
    }

    #[test]
    fn test_too_many_rows_is_rejected() {
        let geometry = Geometry::new(2, 2, 0, 2, 2, vec![]).expect("valid test geometry");
        let layout = RowLayout::new(&geometry);
        assert_eq!(
            rows_from_words(&[1, 2, 3], &layout, 2),
            Err(ProgramError::TooManyRows {
                rows: 3,
                capacity: 2
            })
        );
    }
}
