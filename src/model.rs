// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Raw records fetched from the data sources.
//!
//! Items are read-only snapshots of remote state. They live for a single run
//! and are discarded once the aggregator has folded them into statistics.

use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::{Deserialize, Serialize};

/// One unprocessed record returned by a data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize,)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RawItem
{
    /// Account-level aggregates exposed directly by the API.
    Profile(ProfileItem,),
    /// One repository and its counters.
    Repository(RepositoryItem,),
    /// Work authored by the account inside one repository.
    Contribution(ContributionItem,),
    /// One entry of the auxiliary feed.
    FeedEntry(FeedEntry,),
}

/// Profile aggregates for the target account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize,)]
pub struct ProfileItem
{
    /// Account login.
    pub login:        String,
    /// Display name, when the account sets one.
    pub name:         Option<String,>,
    /// Number of followers.
    pub followers:    u64,
    /// Number of followed accounts.
    pub following:    u64,
    /// Number of public repositories reported by the profile.
    pub public_repos: u64,
    /// Number of public gists.
    pub public_gists: u64,
    /// Account creation time.
    pub created_at:   Option<DateTime<Utc,>,>,
}

/// Repository metadata used for star, fork and language statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize,)]
pub struct RepositoryItem
{
    /// `owner/name` identifier.
    pub full_name:  String,
    /// Repository name without the owner.
    pub name:       String,
    /// Primary language detected by the host.
    pub language:   Option<String,>,
    /// Stargazer count.
    pub stars:      u64,
    /// Fork count.
    pub forks:      u64,
    /// Whether the repository itself is a fork.
    pub fork:       bool,
    /// Whether the repository is archived.
    pub archived:   bool,
    /// Last push, falling back to the last metadata update.
    pub updated_at: Option<DateTime<Utc,>,>,
    /// Topics attached to the repository.
    pub topics:     Vec<String,>,
}

/// Commits and line changes authored by the account in one repository.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize,)]
pub struct ContributionItem
{
    /// `owner/name` identifier of the repository.
    pub repository: String,
    /// Commits authored by the account.
    pub commits:    u64,
    /// Lines added by those commits.
    pub additions:  u64,
    /// Lines removed by those commits.
    pub deletions:  u64,
}

/// Entry parsed from an Atom or RSS feed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize,)]
pub struct FeedEntry
{
    /// Entry title with markup entities decoded.
    pub title:      String,
    /// Link to the entry, when present.
    pub link:       Option<String,>,
    /// Publication or update time, when parseable.
    pub published:  Option<DateTime<Utc,>,>,
    /// Categories attached to the entry.
    pub categories: Vec<String,>,
}

impl FeedEntry
{
    /// Link parsed as an absolute `http` or `https` URL.
    ///
    /// Other schemes and unparseable links yield `None`. The serialized form
    /// percent-encodes characters such as `<`, `>` and spaces.
    pub fn web_link(&self,) -> Option<Url,>
    {
        self.link.as_deref().and_then(parse_web_link,)
    }
}

pub(crate) fn parse_web_link(raw: &str,) -> Option<Url,>
{
    Url::parse(raw.trim(),)
        .ok()
        .filter(|url| matches!(url.scheme(), "http" | "https"),)
}

impl std::fmt::Display for RepositoryItem
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_,>,) -> std::fmt::Result
    {
        write!(f, "{} (★ {}, {} forks)", self.full_name, self.stars, self.forks)
    }
}

impl std::fmt::Display for ContributionItem
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_,>,) -> std::fmt::Result
    {
        write!(
            f,
            "{} ({} commits, +{} -{} lines)",
            self.repository, self.commits, self.additions, self.deletions
        )
    }
}
