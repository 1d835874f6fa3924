//! Front matter splitting
//!
//! A workflow document may open with a YAML header:
//!
//! ```text
//! ---
//! name: "review"
//! ---
//! Body text...
//! ```
//!
//! Only whitespace may precede the opening delimiter, including spaces on
//! the delimiter line itself. The FIRST closing
//! delimiter ends the header; any later `---` line belongs to the body.

use crate::util::constants::FRONT_MATTER_DELIMITER;

/// Result of splitting a document into header and body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrontMatter<'a> {
    /// Header text between the delimiters (None for body-only documents)
    pub header: Option<&'a str>,
    /// Everything after the closing delimiter (or the whole text)
    pub body: &'a str,
    /// 1-based document line of the first header line (0 without header)
    pub header_line: usize,
    /// 1-based document line where the body starts
    pub body_line: usize,
}

impl FrontMatter<'_> {
    pub fn has_header(&self) -> bool {
        self.header.is_some()
    }
}

fn is_opening(line: &str) -> bool {
    line.trim_end() == FRONT_MATTER_DELIMITER
}

fn is_closing(line: &str) -> bool {
    let t = line.trim_end();
    t.len() >= FRONT_MATTER_DELIMITER.len() && t.chars().all(|c| c == '-')
}

/// Split a document into `(header, body)`.
///
/// A document without a (closed) header is returned whole as the body.
pub fn split_front_matter(text: &str) -> FrontMatter<'_> {
    let body_only = FrontMatter {
        header: None,
        body: text,
        header_line: 0,
        body_line: 1,
    };

    let lead = text.len() - text.trim_start().len();
    let skipped_lines = text[..lead].matches('\n').count();

    let mut lines = text[lead..].split_inclusive('\n');
    let Some(first) = lines.next() else {
        return body_only;
    };
    if !is_opening(first) || !first.ends_with('\n') {
        return body_only;
    }

    let header_start = lead + first.len();
    let mut offset = header_start;
    let mut header_lines = 0;
    for line in lines {
        if is_closing(line) {
            return FrontMatter {
                header: Some(&text[header_start..offset]),
                body: &text[offset + line.len()..],
                header_line: skipped_lines + 2,
                body_line: skipped_lines + header_lines + 3,
            };
        }
        offset += line.len();
        header_lines += 1;
    }

    body_only
}
