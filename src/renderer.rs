// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Debian changelog rendering for parsed changelog entries.
//!
//! Each [`ChangelogEntry`] becomes one stanza:
//!
//! ```text
//! fping (5.1) unstable; urgency=low
//!
//!   * Changes
//!     - Added feature X with more detail
//!
//!  -- David Schweikert <david@schweikert.ch>  Sun, 10 Mar 2024 00:00:00 -0000
//! ```
//!
//! Items are wrapped to [`DebianOptions::max_line_length`] columns and
//! sections without items are left out.
//!
//! # Example
//!
//! ```
//! use md2deb::parser::{ChangelogEntry, Section};
//! use md2deb::renderer::{render_changelog, DebianOptions};
//!
//! let entries = vec![ChangelogEntry {
//!     version: "5.1".into(),
//!     date: "2024-03-10".into(),
//!     sections: vec![Section {
//!         title: "Changes".into(),
//!         items: vec!["Fixed bug Y".into()],
//!     }],
//! }];
//!
//! let text = render_changelog(&entries, &DebianOptions::default()).unwrap();
//! assert!(text.starts_with("fping (5.1) unstable; urgency=low\n"));
//! assert!(text.contains("    - Fixed bug Y\n"));
//! ```

use crate::parser::ChangelogEntry;
use chrono::NaiveDate;
use snafu::prelude::*;

/// Source package name, also expected at the start of version headers.
pub const PACKAGE_NAME: &str = "fping";
/// Target distribution written into every stanza header.
pub const DISTRIBUTION: &str = "unstable";
/// Upload urgency written into every stanza header.
pub const URGENCY: &str = "low";
/// Name shown in the stanza trailer.
pub const MAINTAINER_NAME: &str = "David Schweikert";
/// Address shown in the stanza trailer.
pub const MAINTAINER_EMAIL: &str = "david@schweikert.ch";
/// Maximum width of a wrapped item line, indentation included.
pub const MAX_LINE_LENGTH: usize = 80;

const ITEM_INDENT: &str = "    - ";
const CONTINUATION_INDENT: &str = "      ";

/// Error type for rendering failures.
#[derive(Debug, Snafu)]
pub enum RenderError {
    /// A version header carried a date that is not a valid calendar date.
    #[snafu(display("invalid release date {date:?} for version {version}: {source}"))]
    InvalidDate {
        /// Version of the offending entry.
        version: String,
        /// The date as written in the input.
        date: String,
        /// The underlying date parsing error.
        source: chrono::ParseError,
    },
}

/// Package and maintainer details written into every stanza.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebianOptions {
    /// Source package name.
    pub package: String,

    /// Distribution in the stanza header (e.g. `unstable`).
    pub distribution: String,

    /// Urgency in the stanza header (e.g. `low`).
    pub urgency: String,

    /// Maintainer name for the trailer line.
    pub maintainer_name: String,

    /// Maintainer e-mail address for the trailer line.
    pub maintainer_email: String,

    /// Maximum item line width, indentation included.
    pub max_line_length: usize,
}

impl Default for DebianOptions {
    fn default() -> Self {
        Self {
            package: PACKAGE_NAME.into(),
            distribution: DISTRIBUTION.into(),
            urgency: URGENCY.into(),
            maintainer_name: MAINTAINER_NAME.into(),
            maintainer_email: MAINTAINER_EMAIL.into(),
            max_line_length: MAX_LINE_LENGTH,
        }
    }
}

/// Renders entries as a Debian changelog.
///
/// Stanzas appear in the order given. The returned text ends with the
/// final stanza's trailer line and its newline; an empty slice renders
/// as an empty string.
///
/// # Errors
///
/// Returns [`RenderError::InvalidDate`] for the first entry whose date is
/// not a valid `YYYY-MM-DD` calendar date.
pub fn render_changelog(
    entries: &[ChangelogEntry],
    opts: &DebianOptions,
) -> Result<String, RenderError> {
    let mut lines = Vec::new();
    for entry in entries {
        render_entry(&mut lines, entry, opts)?;
    }
    Ok(lines.join("\n"))
}

fn render_entry(
    lines: &mut Vec<String>,
    entry: &ChangelogEntry,
    opts: &DebianOptions,
) -> Result<(), RenderError> {
    let date = format_debian_date(&entry.date).context(InvalidDateSnafu {
        version: &entry.version,
        date: &entry.date,
    })?;

    lines.push(format!(
        "{} ({}) {}; urgency={}",
        opts.package, entry.version, opts.distribution, opts.urgency
    ));
    lines.push(String::new());

    for section in entry.sections.iter().filter(|s| !s.items.is_empty()) {
        lines.push(format!("  * {}", section.title));
        lines.extend(
            section
                .items
                .iter()
                .map(|item| wrap_item(item, opts.max_line_length)),
        );
        lines.push(String::new());
    }

    lines.push(format!(
        " -- {} <{}>  {date}",
        opts.maintainer_name, opts.maintainer_email
    ));
    lines.push(String::new());
    Ok(())
}

/// Converts a `YYYY-MM-DD` date into the trailer date format.
///
/// The time is midnight and the offset is `-0000`, the RFC 2822 notation
/// for a time whose local offset is unknown.
///
/// # Errors
///
/// Returns the parse error if `date` is not a valid calendar date in
/// strict `YYYY-MM-DD` form.
///
/// # Example
///
/// ```
/// use md2deb::renderer::format_debian_date;
///
/// assert_eq!(
///     format_debian_date("2024-03-10").unwrap(),
///     "Sun, 10 Mar 2024 00:00:00 -0000"
/// );
/// assert!(format_debian_date("2024-13-40").is_err());
/// ```
pub fn format_debian_date(date: &str) -> Result<String, chrono::ParseError> {
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")?;
    Ok(date.format("%a, %d %b %Y 00:00:00 -0000").to_string())
}

/// Wraps one item into bullet form.
///
/// The first line is indented with `    - ` and the rest with six spaces.
/// Lines break on whitespace, after the hyphen of a hyphenated word, or
/// around an em-dash written as `--`; a word longer than a whole line is
/// split across lines. Tabs expand to 8-column stops and whitespace runs
/// are kept inside a line but dropped where a line breaks.
///
/// # Example
///
/// ```
/// use md2deb::renderer::wrap_item;
///
/// assert_eq!(wrap_item("one two three", 16), "    - one two\n      three");
/// ```
#[must_use]
pub fn wrap_item(text: &str, width: usize) -> String {
    let text = normalize_whitespace(text);
    let mut chunks = split_chunks(&text);
    chunks.reverse();

    let mut lines: Vec<String> = Vec::new();
    while !chunks.is_empty() {
        let indent = if lines.is_empty() {
            ITEM_INDENT
        } else {
            CONTINUATION_INDENT
        };
        let available = width.saturating_sub(indent.len());

        if !lines.is_empty() && chunks.last().is_some_and(|c| is_blank(c)) {
            chunks.pop();
        }

        let mut line: Vec<&str> = Vec::new();
        let mut line_len = 0;
        while let Some(&chunk) = chunks.last() {
            let len = char_len(chunk);
            if line_len + len > available {
                break;
            }
            line.push(chunk);
            line_len += len;
            chunks.pop();
        }

        if let Some(chunk) = chunks.last_mut()
            && char_len(*chunk) > available
        {
            // Too long for any line: fill what is left of this one.
            let room = if available < 1 { 1 } else { available - line_len };
            let (head, tail) = split_long_word(*chunk, room);
            line.push(head);
            *chunk = tail;
        }

        if line.last().is_some_and(|c| is_blank(c)) {
            line.pop();
        }
        if !line.is_empty() {
            lines.push(format!("{indent}{}", line.concat()));
        }
    }

    lines.join("\n")
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}

/// Expands tabs to 8-column stops and turns every ASCII whitespace
/// character into a plain space.
fn normalize_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut column = 0;
    for c in text.chars() {
        match c {
            '\t' => {
                let pad = 8 - column % 8;
                out.extend(std::iter::repeat_n(' ', pad));
                column += pad;
            }
            '\n' | '\r' => {
                out.push(' ');
                column = 0;
            }
            '\x0b' | '\x0c' => {
                out.push(' ');
                column += 1;
            }
            _ => {
                out.push(c);
                column += 1;
            }
        }
    }
    out
}

/// Splits normalized text into alternating runs of spaces and word pieces.
fn split_chunks(text: &str) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut rest = text;
    while let Some(first) = rest.chars().next() {
        let is_space = first == ' ';
        let end = rest
            .find(|c: char| (c == ' ') != is_space)
            .unwrap_or(rest.len());
        let (run, tail) = rest.split_at(end);
        if is_space {
            chunks.push(run);
        } else {
            chunks.extend(split_word(run));
        }
        rest = tail;
    }
    chunks
}

/// Splits a whitespace-free word at its break opportunities.
///
/// A hyphen is a break point when it follows two letters (or a
/// letter-hyphen-letter run) and precedes a letter, an optional hyphen and
/// another letter, so `command-line-tool` yields `command-`, `line-`,
/// `tool`. A run of two or more hyphens between words stands alone, so
/// `yes--no` yields `yes`, `--`, `no`. Underscores count as letters.
fn split_word(word: &str) -> Vec<&str> {
    let chars: Vec<(usize, char)> = word.char_indices().collect();
    let at = |i: usize| chars.get(i).map(|&(_, c)| c);
    let is_letter = |i: usize| at(i).is_some_and(|c| c == '_' || c.is_alphabetic());
    let is_word = |i: usize| at(i).is_some_and(|c| c == '_' || c.is_alphanumeric());
    let is_dash = |i: usize| at(i) == Some('-');
    let follows_punct = |i: usize| {
        i.checked_sub(1)
            .and_then(at)
            .is_some_and(|c| c == '_' || c.is_alphanumeric() || "!\"'&.,?".contains(c))
    };
    // End of a `--` run starting at `i` that is followed by a word character.
    let em_dash_end = |i: usize| {
        let mut j = i;
        while is_dash(j) {
            j += 1;
        }
        (j - i >= 2 && is_word(j)).then_some(j)
    };
    let hyphen_breaks = |i: usize| {
        let before = i.checked_sub(2).is_some_and(|k| is_letter(k) && is_letter(k + 1))
            || i.checked_sub(3)
                .is_some_and(|k| is_letter(k) && is_dash(k + 1) && is_letter(k + 2));
        let after = is_letter(i + 1) && (is_letter(i + 2) || (is_dash(i + 2) && is_letter(i + 3)));
        is_dash(i) && before && after
    };
    let offset = |i: usize| chars.get(i).map_or(word.len(), |&(o, _)| o);

    let mut pieces = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let end = if let Some(end) = em_dash_end(start).filter(|_| follows_punct(start)) {
            end
        } else {
            let mut i = start + 1;
            loop {
                if i >= chars.len() {
                    break chars.len();
                }
                if hyphen_breaks(i) {
                    break i + 1;
                }
                if follows_punct(i) && em_dash_end(i).is_some() {
                    break i;
                }
                i += 1;
            }
        };
        pieces.push(&word[offset(start)..offset(end)]);
        start = end;
    }
    pieces
}

/// Splits an over-long word so its head fills `room` columns, preferring
/// to break just after the last hyphen that fits.
fn split_long_word(chunk: &str, room: usize) -> (&str, &str) {
    let chars: Vec<char> = chunk.chars().collect();
    let mut end = room.min(chars.len());
    if chars.len() > room
        && let Some(hyphen) = chars[..room].iter().rposition(|&c| c == '-')
        && hyphen > 0
        && chars[..hyphen].iter().any(|&c| c != '-')
    {
        end = hyphen + 1;
    }
    let split = chunk.char_indices().nth(end).map_or(chunk.len(), |(i, _)| i);
    chunk.split_at(split)
}
