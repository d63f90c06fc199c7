use crate::utils::error::Result;
use std::io::{BufRead, Write};

pub const DEFAULT_STOP_KEYWORD: &str = "STOP";

/// Indices accepted in multi-selection mode, in the order they were entered,
/// plus one warning per rejected entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub indices: Vec<usize>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SingleSelection {
    Index(usize),
    Invalid(String),
}

fn read_trimmed_line<R: BufRead>(input: &mut R) -> Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

/// Reads exactly one index. Non-numeric input, end of input or an index
/// outside `0..len` is rejected.
pub fn select_single<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    len: usize,
) -> Result<SingleSelection> {
    write!(
        out,
        "Enter the index of the company for which you want to generate the email: "
    )?;
    out.flush()?;

    let Some(line) = read_trimmed_line(input)? else {
        return Ok(SingleSelection::Invalid("No input received".to_string()));
    };

    match line.parse::<usize>() {
        Ok(index) if index < len => Ok(SingleSelection::Index(index)),
        Ok(index) => Ok(SingleSelection::Invalid(format!(
            "Invalid index selected: {}",
            index
        ))),
        Err(_) => Ok(SingleSelection::Invalid(format!(
            "Invalid input '{}'. Please enter a valid number.",
            line
        ))),
    }
}

/// Reads indices until the stop keyword (case-insensitive) or end of input.
/// Duplicate, out-of-range and non-numeric entries are skipped with a warning.
pub fn select_many<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    len: usize,
    stop_keyword: &str,
) -> Result<Selection> {
    let mut selection = Selection::default();

    writeln!(
        out,
        "Enter the indices of the companies you want to generate emails for."
    )?;
    writeln!(out, "Type '{}' when you are finished.", stop_keyword)?;

    loop {
        write!(out, "Enter company index (or '{}'): ", stop_keyword)?;
        out.flush()?;

        let Some(line) = read_trimmed_line(input)? else {
            break;
        };
        if line.eq_ignore_ascii_case(stop_keyword) {
            break;
        }
        if line.is_empty() {
            continue;
        }

        let warning = match line.parse::<usize>() {
            Ok(index) if index >= len => format!(
                "Invalid index {}. Please enter a value between 0 and {}.",
                index,
                len.saturating_sub(1)
            ),
            Ok(index) if selection.indices.contains(&index) => {
                format!("Index {} already selected.", index)
            }
            Ok(index) => {
                selection.indices.push(index);
                continue;
            }
            Err(_) => format!(
                "Invalid input '{}'. Please enter a number or '{}'.",
                line, stop_keyword
            ),
        };

        tracing::warn!("⚠️ {}", warning);
        writeln!(out, "{}", warning)?;
        selection.warnings.push(warning);
    }

    Ok(selection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_single_accepts_in_range_index() {
        let mut out = Vec::new();
        let result = select_single(&mut Cursor::new("1\n"), &mut out, 3).unwrap();
        assert_eq!(result, SingleSelection::Index(1));
    }

    #[test]
    fn test_single_rejects_bad_input() {
        let mut out = Vec::new();
        for input in ["abc\n", "3\n", "-1\n", ""] {
            let result = select_single(&mut Cursor::new(input), &mut out, 3).unwrap();
            assert!(matches!(result, SingleSelection::Invalid(_)), "input {:?}", input);
        }
    }

    #[test]
    fn test_many_keeps_entry_order_and_warns() {
        let mut out = Vec::new();
        let input = "2\n0\n5\n2\nfoo\n\nstop\n1\n";
        let selection = select_many(&mut Cursor::new(input), &mut out, 3, "STOP").unwrap();

        assert_eq!(selection.indices, vec![2, 0]);
        assert_eq!(selection.warnings.len(), 3);
        assert!(selection.warnings[0].contains('5'));
        assert!(selection.warnings[1].contains("already selected"));
        assert!(selection.warnings[2].contains("foo"));

        let printed = String::from_utf8(out).unwrap();
        assert!(printed.contains("Type 'STOP' when you are finished."));
    }

    #[test]
    fn test_many_ends_at_end_of_input() {
        let mut out = Vec::new();
        let selection = select_many(&mut Cursor::new("1\n"), &mut out, 3, "STOP").unwrap();
        assert_eq!(selection.indices, vec![1]);
        assert!(selection.warnings.is_empty());
    }
}
