//! Line-level reading of script text.
//!
//! Comments and blank lines are dealt with here; word-level classification
//! happens in the parser.

/// One executable line of a script, comment-stripped, with its 1-based
/// position in the source file.
///
/// The text keeps its leading whitespace so that column positions reported
/// by the parser match the file as the user wrote it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    pub number: usize,
    pub text: String,
}

/// Split script text into executable lines.
///
/// `//` starts a comment anywhere on a line and runs to the end of that
/// line. Lines that are empty after comment stripping produce nothing.
pub fn split_into_lines(source: &str) -> Vec<SourceLine> {
    source
        .lines()
        .enumerate()
        .filter_map(|(index, raw)| {
            let code = match raw.find("//") {
                Some(at) => &raw[..at],
                None => raw,
            };
            if code.trim().is_empty() {
                return None;
            }
            Some(SourceLine {
                number: index + 1,
                text: code.to_owned(),
            })
        })
        .collect()
}
