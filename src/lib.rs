// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Convert a Markdown changelog to Debian changelog format.
//!
//! This crate provides parsing and rendering functionality for turning the
//! project's `CHANGELOG.md` into a `debian/changelog` file during CI.
//!
//! # Overview
//!
//! The conversion is a single batch transform:
//!
//! 1. Parse the Markdown text into release entries, sections and items
//! 2. Render the entries as Debian changelog stanzas with wrapped items
//!
//! # Example
//!
//! ```no_run
//! use md2deb::{parser, renderer};
//!
//! let markdown = std::fs::read_to_string("CHANGELOG.md").unwrap();
//! let changelog = parser::parse_changelog(&markdown);
//!
//! let opts = renderer::DebianOptions::default();
//! let debian = renderer::render_changelog(&changelog.entries, &opts).unwrap();
//! println!("{debian}");
//! ```
//!
//! # Modules
//!
//! - [`parser`]: Markdown changelog parsing and the entry data model
//! - [`renderer`]: Debian changelog generation with fixed package details

#![deny(missing_docs)]

pub mod parser;
pub mod renderer;
