//! Operator choice among ambiguous search results.

use std::fmt;

use crate::lookup::raw::RawBook;

/// Picks one of `candidates` by index, or declines with `None`.
pub trait CandidateChooser: Send + Sync {
    fn choose(&self, title: &str, author: Option<&str>, candidates: &[RawBook]) -> Option<usize>;
}

/// Never picks anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoChooser;

impl CandidateChooser for NoChooser {
    fn choose(&self, _title: &str, _author: Option<&str>, _candidates: &[RawBook]) -> Option<usize> {
        None
    }
}

impl<F> CandidateChooser for F
where
    F: Fn(&str, Option<&str>, &[RawBook]) -> Option<usize> + Send + Sync,
{
    fn choose(&self, title: &str, author: Option<&str>, candidates: &[RawBook]) -> Option<usize> {
        self(title, author, candidates)
    }
}

/// One line of a candidate listing:
/// `     0: <<title:subtitle>>, author, 8.9/1200`.
pub struct CandidateLine<'a> {
    pub index: usize,
    pub book: &'a RawBook,
}

impl fmt::Display for CandidateLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:>6}: <<{}>>, {}, {}/{}",
            self.index,
            self.book.display_title(),
            self.book.first_author().unwrap_or("unknown"),
            self.book.rating.average,
            self.book.rating.num_raters
        )
    }
}

pub fn candidate_lines(candidates: &[RawBook]) -> impl Iterator<Item = CandidateLine<'_>> {
    candidates
        .iter()
        .enumerate()
        .map(|(index, book)| CandidateLine { index, book })
}

/// Parse an operator's answer into an index into `candidates`.
pub fn parse_selection(answer: &str, candidates: usize) -> Option<usize> {
    answer.trim().parse::<usize>().ok().filter(|&n| n < candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::raw::RawRating;
    use pretty_assertions::assert_eq;

    #[test]
    fn line_format() {
        let book = RawBook {
            title: "A".to_string(),
            subtitle: "S".to_string(),
            author: vec!["Y".to_string()],
            rating: RawRating {
                average: "8.9".to_string(),
                num_raters: 1200,
                ..Default::default()
            },
            ..Default::default()
        };
        let anonymous = RawBook {
            title: "B".to_string(),
            ..Default::default()
        };
        let books = vec![book, anonymous];
        let lines: Vec<String> = candidate_lines(&books).map(|l| l.to_string()).collect();
        assert_eq!(lines[0], "     0: <<A:S>>, Y, 8.9/1200");
        assert_eq!(lines[1], "     1: <<B>>, unknown, /0");
    }

    #[test]
    fn selection_parsing() {
        assert_eq!(parse_selection("1", 2), Some(1));
        assert_eq!(parse_selection(" 0\n", 2), Some(0));
        assert_eq!(parse_selection("2", 2), None);
        assert_eq!(parse_selection("-1", 2), None);
        assert_eq!(parse_selection("first", 2), None);
    }

    #[test]
    fn closures_are_choosers() {
        let pick_last = |_: &str, _: Option<&str>, c: &[RawBook]| c.len().checked_sub(1);
        let books = vec![RawBook::default(), RawBook::default()];
        assert_eq!(pick_last.choose("t", None, &books), Some(1));
        assert_eq!(NoChooser.choose("t", None, &books), None);
    }
}
