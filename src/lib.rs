// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Profile statistics rendered into README marker regions.
//!
//! A run fetches repository, contribution and profile data from GitHub plus an
//! optional Atom/RSS feed, folds the records into named statistics, and
//! replaces the interior of every recognized `<!--START:NAME-->` /
//! `<!--END:NAME-->` pair in a Markdown document. The document is rewritten
//! atomically and only when every recognized marker could be rendered.
//!
//! The pure stages are usable on their own:
//!
//! ```
//! use chrono::NaiveDate;
//! use readme_stats::{AggregateOptions, RawItem, RepositoryItem, aggregate, render};
//!
//! let repository = RepositoryItem {
//!     full_name:  "octocat/hello".to_owned(),
//!     name:       "hello".to_owned(),
//!     language:   Some("Rust".to_owned()),
//!     stars:      42,
//!     forks:      3,
//!     fork:       false,
//!     archived:   false,
//!     updated_at: None,
//!     topics:     Vec::new()
//! };
//! let today = NaiveDate::from_ymd_opt(2025, 1, 1).expect("valid date");
//! let stats = aggregate([RawItem::Repository(repository)], AggregateOptions::new(today));
//!
//! let rendered = render("Stars: <!--START:STARS-->0<!--END:STARS-->", &stats)?;
//! assert_eq!(rendered, "Stars: <!--START:STARS-->42<!--END:STARS-->");
//! # Ok::<(), readme_stats::Error>(())
//! ```

mod aggregate;
mod config;
mod document;
mod error;
mod feed;
mod github;
mod model;
mod pipeline;
mod response;
mod source;
mod stats;
mod template;
#[cfg(test)]
mod test_server;

pub use aggregate::{AggregateOptions, Aggregator, PLACEHOLDER, aggregate, describe_age, keys};
pub use config::{
    DEFAULT_AFFILIATION, DEFAULT_API_URL, DEFAULT_LIMIT, DEFAULT_README_PATH, RawSettings,
    Settings,
};
pub use document::Document;
pub use error::{Error, io_error};
pub use feed::{FeedClient, parse_feed};
pub use github::{GitHubClient, PAGE_SIZE};
pub use model::{ContributionItem, FeedEntry, ProfileItem, RawItem, RepositoryItem};
pub use pipeline::{Outcome, Report, collect, execute, run};
pub use source::{LiveSource, MAX_PAGES, RepositoryPages, StatsSource};
pub use stats::{StatRecord, StatTable, StatValue, Stats, format_integer};
pub use template::{
    Layout, MARKERS, MarkerTemplate, Region, Segment, lookup_marker, parse_segments,
    recognized_markers, render,
};
