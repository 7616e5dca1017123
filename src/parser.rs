// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Line-oriented parsing of Markdown changelogs.
//!
//! The parser understands one fixed Markdown convention:
//!
//! - a `Next` line opens an unreleased block, which is skipped up to the
//!   next version header
//! - `fping <version> (<YYYY-MM-DD>)` starts a release entry
//! - `## <title>` starts a section inside the current entry
//! - `- <text>` starts an item, and lines indented by two or more spaces
//!   continue it
//!
//! Anything else is ignored. Parsing never fails; release dates are kept
//! as written and only checked when the changelog is rendered.
//!
//! # Example
//!
//! ```
//! use md2deb::parser::parse_changelog;
//!
//! let markdown = "\
//! fping 5.1 (2024-03-10)
//! ### Changes
//! - Added feature X
//!   with more detail
//! ";
//!
//! let changelog = parse_changelog(markdown);
//! assert_eq!(changelog.entries.len(), 1);
//! assert_eq!(changelog.entries[0].version, "5.1");
//! assert_eq!(
//!     changelog.entries[0].sections[0].items,
//!     ["Added feature X with more detail"]
//! );
//! ```

use crate::renderer::PACKAGE_NAME;
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::LazyLock;

static VERSION_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^{}\s+([0-9.]+)\s+\((\d{{4}}-\d{{2}}-\d{{2}})\)",
        regex::escape(PACKAGE_NAME)
    ))
    .expect("Invalid regex")
});

static SECTION_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^##\s+(.*)").expect("Invalid regex"));

static BULLET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*-\s+(.*)").expect("Invalid regex"));

static CONTINUATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s{2,}(.*)").expect("Invalid regex"));

/// The title line of the unreleased block.
const UNRELEASED_MARKER: &str = "Next";

/// The result of parsing a Markdown changelog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Changelog {
    /// Release entries in the order they appear in the input.
    pub entries: Vec<ChangelogEntry>,

    /// Suspicious constructs noticed while parsing.
    ///
    /// These never stop the parse, but callers may want to report them.
    pub warnings: Vec<ParseWarning>,
}

/// One released version and its changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangelogEntry {
    /// Dotted version string, e.g. `5.1`.
    pub version: String,

    /// Release date exactly as written in the header (`YYYY-MM-DD`).
    ///
    /// Not validated here; see [`crate::renderer::format_debian_date`].
    pub date: String,

    /// Sections in order of first appearance.
    pub sections: Vec<Section>,
}

/// A titled group of change items within one entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    /// Section title, e.g. `Changes` or `Bugfixes`.
    pub title: String,

    /// Change descriptions, each one joined onto a single line.
    pub items: Vec<String>,
}

/// A non-fatal problem found in the input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParseWarning {
    /// A section title was repeated within one entry.
    ///
    /// The later block replaces the items of the earlier one; the section
    /// keeps its original position.
    DuplicateSection {
        /// Version of the entry containing the repeated section.
        version: String,
        /// The repeated title.
        title: String,
    },
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateSection { version, title } => write!(
                f,
                "section \"{title}\" appears more than once in version {version}; \
                 earlier items were dropped"
            ),
        }
    }
}

/// Accumulator threaded through a single pass over the input lines.
#[derive(Default)]
struct ParseState {
    changelog: Changelog,
    current: Option<ChangelogEntry>,
    /// Index into `current.sections`.
    section: Option<usize>,
    pending: Option<String>,
    skipping_unreleased: bool,
}

impl ParseState {
    fn feed(&mut self, line: &str) {
        if line.trim() == UNRELEASED_MARKER {
            self.skipping_unreleased = true;
            return;
        }

        let version = VERSION_HEADER.captures(line);
        if self.skipping_unreleased {
            if version.is_none() {
                return;
            }
            self.skipping_unreleased = false;
        }

        if let Some(caps) = version {
            self.close_entry();
            self.current = Some(ChangelogEntry {
                version: caps[1].to_owned(),
                date: caps[2].to_owned(),
                sections: Vec::new(),
            });
            return;
        }

        if self.current.is_none() {
            return;
        }

        if let Some(caps) = SECTION_HEADER.captures(line) {
            self.commit_pending();
            self.open_section(caps[1].trim());
            return;
        }

        if self.section.is_some()
            && let Some(caps) = BULLET.captures(line)
        {
            self.commit_pending();
            self.pending = Some(caps[1].to_owned());
            return;
        }

        if let Some(pending) = self.pending.as_mut()
            && let Some(caps) = CONTINUATION.captures(line)
        {
            pending.push(' ');
            pending.push_str(caps[1].trim());
            return;
        }

        if line.trim().is_empty() {
            self.commit_pending();
        }
    }

    fn open_section(&mut self, title: &str) {
        // An untitled header closes the section; its bullets are dropped.
        if title.is_empty() {
            self.section = None;
            return;
        }
        let Some(entry) = self.current.as_mut() else {
            return;
        };

        let index = if let Some(index) = entry.sections.iter().position(|s| s.title == title) {
            // Same-titled block replaces the earlier one in place.
            entry.sections[index].items.clear();
            self.changelog
                .warnings
                .push(ParseWarning::DuplicateSection {
                    version: entry.version.clone(),
                    title: title.to_owned(),
                });
            index
        } else {
            entry.sections.push(Section {
                title: title.to_owned(),
                items: Vec::new(),
            });
            entry.sections.len() - 1
        };

        self.section = Some(index);
    }

    /// Moves the item being assembled into the current section.
    fn commit_pending(&mut self) {
        let Some(item) = self.pending.take() else {
            return;
        };
        let item = item.trim();
        if item.is_empty() {
            return;
        }
        if let (Some(entry), Some(index)) = (self.current.as_mut(), self.section) {
            entry.sections[index].items.push(item.to_owned());
        }
    }

    fn close_entry(&mut self) {
        self.commit_pending();
        self.section = None;
        if let Some(entry) = self.current.take() {
            self.changelog.entries.push(entry);
        }
    }

    fn finish(mut self) -> Changelog {
        self.close_entry();
        self.changelog
    }
}

/// Parses the full text of a Markdown changelog.
///
/// Entries, sections and items keep their input order; nothing is sorted.
/// Lines that match none of the recognized patterns are dropped.
///
/// # Example
///
/// ```
/// use md2deb::parser::parse_changelog;
///
/// let changelog = parse_changelog("no releases here\n");
/// assert!(changelog.entries.is_empty());
/// ```
#[must_use]
pub fn parse_changelog(text: &str) -> Changelog {
    let mut state = ParseState::default();
    for line in text.lines() {
        state.feed(line);
    }
    state.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items<'a>(entry: &'a ChangelogEntry, title: &str) -> &'a [String] {
        &entry
            .sections
            .iter()
            .find(|s| s.title == title)
            .unwrap_or_else(|| panic!("no section {title}"))
            .items
    }

    #[test]
    fn parses_basic_entry() {
        let changelog = parse_changelog(
            "fping 5.1 (2024-03-10)\n\
             ## Changes\n\
             - Added feature X\n  with more detail\n\
             - Fixed bug Y\n",
        );

        assert_eq!(changelog.entries.len(), 1);
        let entry = &changelog.entries[0];
        assert_eq!(entry.version, "5.1");
        assert_eq!(entry.date, "2024-03-10");
        assert_eq!(
            items(entry, "Changes"),
            ["Added feature X with more detail", "Fixed bug Y"]
        );
        assert!(changelog.warnings.is_empty());
    }

    #[test]
    fn returns_nothing_without_version_headers() {
        let changelog = parse_changelog("# fping\n\n## Changes\n- orphan item\n");
        assert!(changelog.entries.is_empty());
    }

    #[test]
    fn returns_nothing_for_empty_input() {
        assert_eq!(parse_changelog(""), Changelog::default());
    }

    #[test]
    fn skips_unreleased_block() {
        let changelog = parse_changelog(
            "Next\n\
             ====\n\
             ## Changes\n\
             - unreleased work\n\
             fping 5.0 (2023-11-01)\n\
             ## Changes\n\
             - released work\n",
        );

        assert_eq!(changelog.entries.len(), 1);
        assert_eq!(items(&changelog.entries[0], "Changes"), ["released work"]);
    }

    #[test]
    fn marker_is_matched_after_trimming() {
        let changelog = parse_changelog(
            "  Next  \n- hidden\nfping 5.0 (2023-11-01)\n## Changes\n- shown\n",
        );
        assert_eq!(items(&changelog.entries[0], "Changes"), ["shown"]);
    }

    #[test]
    fn joins_continuation_lines() {
        let changelog = parse_changelog(
            "fping 5.1 (2024-03-10)\n\
             ## Changes\n\
             - first part\n\
             \x20\x20  second part  \n\
             \x20\x20third part\n",
        );
        assert_eq!(
            items(&changelog.entries[0], "Changes"),
            ["first part second part third part"]
        );
    }

    #[test]
    fn blank_line_terminates_item() {
        let changelog = parse_changelog(
            "fping 5.1 (2024-03-10)\n\
             ## Changes\n\
             - one\n\
             \n\
             \x20\x20not a continuation\n\
             - two\n",
        );
        assert_eq!(items(&changelog.entries[0], "Changes"), ["one", "two"]);
    }

    #[test]
    fn indented_dash_starts_new_item() {
        let changelog = parse_changelog(
            "fping 5.1 (2024-03-10)\n## Changes\n- outer\n  - inner\n",
        );
        assert_eq!(items(&changelog.entries[0], "Changes"), ["outer", "inner"]);
    }

    #[test]
    fn bullet_before_any_section_is_ignored() {
        let changelog = parse_changelog(
            "fping 5.1 (2024-03-10)\n- stray\n  still stray\n## Changes\n- kept\n",
        );
        let entry = &changelog.entries[0];
        assert_eq!(entry.sections.len(), 1);
        assert_eq!(items(entry, "Changes"), ["kept"]);
    }

    #[test]
    fn keeps_empty_sections_in_model() {
        let changelog = parse_changelog(
            "fping 5.1 (2024-03-10)\n## Empty\n## Changes\n- item\n",
        );
        let entry = &changelog.entries[0];
        assert_eq!(entry.sections.len(), 2);
        assert!(items(entry, "Empty").is_empty());
    }

    #[test]
    fn preserves_entry_and_section_order() {
        let changelog = parse_changelog(
            "fping 5.2 (2024-05-01)\n\
             ## Zeta\n- z\n\
             ## Alpha\n- a\n\
             fping 5.1 (2024-03-10)\n\
             ## Changes\n- c\n",
        );

        let versions: Vec<_> = changelog.entries.iter().map(|e| e.version.as_str()).collect();
        assert_eq!(versions, ["5.2", "5.1"]);

        let titles: Vec<_> = changelog.entries[0]
            .sections
            .iter()
            .map(|s| s.title.as_str())
            .collect();
        assert_eq!(titles, ["Zeta", "Alpha"]);
    }

    #[test]
    fn version_header_flushes_pending_item() {
        let changelog = parse_changelog(
            "fping 5.2 (2024-05-01)\n## Changes\n- last\nfping 5.1 (2024-03-10)\n",
        );
        assert_eq!(items(&changelog.entries[0], "Changes"), ["last"]);
        assert!(changelog.entries[1].sections.is_empty());
    }

    #[test]
    fn section_header_flushes_pending_item() {
        let changelog = parse_changelog(
            "fping 5.1 (2024-03-10)\n## Changes\n- change\n## Bugfixes\n- fix\n",
        );
        let entry = &changelog.entries[0];
        assert_eq!(items(entry, "Changes"), ["change"]);
        assert_eq!(items(entry, "Bugfixes"), ["fix"]);
    }

    #[test]
    fn trims_section_titles() {
        let changelog = parse_changelog("fping 5.1 (2024-03-10)\n##   Changes   \n- x\n");
        assert_eq!(changelog.entries[0].sections[0].title, "Changes");
    }

    #[test]
    fn keeps_malformed_dates_verbatim() {
        let changelog = parse_changelog("fping 5.1 (2024-13-40)\n");
        assert_eq!(changelog.entries[0].date, "2024-13-40");
    }

    #[test]
    fn ignores_headers_for_other_packages() {
        let changelog = parse_changelog("fpingx 5.1 (2024-03-10)\nping 5.1 (2024-03-10)\n");
        assert!(changelog.entries.is_empty());
    }

    #[test]
    fn handles_crlf_line_endings() {
        let changelog =
            parse_changelog("fping 5.1 (2024-03-10)\r\n## Changes\r\n- one\r\n  two\r\n");
        assert_eq!(items(&changelog.entries[0], "Changes"), ["one two"]);
    }

    #[test]
    fn duplicate_section_replaces_items_and_warns() {
        let changelog = parse_changelog(
            "fping 5.1 (2024-03-10)\n\
             ## Changes\n- first\n\
             ## Bugfixes\n- fix\n\
             ## Changes\n- second\n",
        );

        let entry = &changelog.entries[0];
        let titles: Vec<_> = entry.sections.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, ["Changes", "Bugfixes"]);
        assert_eq!(items(entry, "Changes"), ["second"]);
        assert_eq!(
            changelog.warnings,
            [ParseWarning::DuplicateSection {
                version: "5.1".into(),
                title: "Changes".into(),
            }]
        );
    }

    #[test]
    fn warning_display_names_section_and_version() {
        let warning = ParseWarning::DuplicateSection {
            version: "5.1".into(),
            title: "Changes".into(),
        };
        let message = warning.to_string();
        assert!(message.contains("\"Changes\""));
        assert!(message.contains("5.1"));
    }

    #[test]
    fn untitled_section_header_drops_its_items() {
        let changelog = parse_changelog(
            "fping 5.1 (2024-03-10)\n\
             ## Changes\n- before\n\
             ##   \n- orphan\n  orphan detail\n\
             ## Bugfixes\n- kept\n",
        );

        let entry = &changelog.entries[0];
        let titles: Vec<_> = entry.sections.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, ["Changes", "Bugfixes"]);
        assert_eq!(items(entry, "Changes"), ["before"]);
        assert_eq!(items(entry, "Bugfixes"), ["kept"]);
    }

    #[test]
    fn unreleased_marker_keeps_item_pending_from_previous_entry() {
        let changelog = parse_changelog(
            "fping 5.2 (2024-05-01)\n\
             ## Changes\n- last\n\
             Next\n- hidden\n\
             fping 5.1 (2024-03-10)\n\
             ## Changes\n- older\n",
        );

        assert_eq!(changelog.entries.len(), 2);
        assert_eq!(items(&changelog.entries[0], "Changes"), ["last"]);
        assert_eq!(items(&changelog.entries[1], "Changes"), ["older"]);
    }

    #[test]
    fn whitespace_only_indented_line_continues_item() {
        let changelog = parse_changelog(
            "fping 5.1 (2024-03-10)\n## Changes\n- one\n    \n  two\n \n  three\n",
        );
        assert_eq!(items(&changelog.entries[0], "Changes"), ["one  two"]);
    }

    #[test]
    fn drops_items_that_are_only_whitespace() {
        let changelog = parse_changelog("fping 5.1 (2024-03-10)\n## Changes\n-  \n- real\n");
        assert_eq!(items(&changelog.entries[0], "Changes"), ["real"]);
    }
}
