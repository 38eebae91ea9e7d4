// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Reduction of raw records into display-ready statistics.
//!
//! The aggregator is a pure fold: it never touches the network, the disk or
//! the clock. Callers feed it batches as pages arrive and call
//! [`Aggregator::finish`] once the sources are drained. Every key listed in
//! [`keys::ALWAYS_PRESENT`] is produced even for empty input.
//!
//! Ranking rules are explicit so repeated runs agree regardless of API
//! ordering:
//!
//! * languages rank by repository count, ties by ascending name;
//! * repositories rank by stars, ties by ascending full name;
//! * the most recently updated repository wins, ties by ascending full name;
//! * feed entries rank newest first, undated entries last, ties by ascending
//!   title.

use std::{cmp::Ordering, collections::BTreeMap};

use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};

use crate::{
    config::DEFAULT_LIMIT,
    model::{FeedEntry, ProfileItem, RawItem, RepositoryItem},
    stats::{StatRecord, StatTable, StatValue, Stats},
};

/// Value rendered when a textual statistic has no data.
pub const PLACEHOLDER: &str = "N/A";

/// Statistic keys produced by the aggregator.
pub mod keys
{
    /// Number of repositories returned by the source.
    pub const REPO_COUNT: &str = "repo_count";
    /// Number of archived repositories.
    pub const ARCHIVED_COUNT: &str = "archived_count";
    /// Sum of stargazers over all repositories.
    pub const TOTAL_STARS: &str = "total_stars";
    /// Sum of forks over all repositories.
    pub const TOTAL_FORKS: &str = "total_forks";
    /// Most used primary language.
    pub const TOP_LANGUAGE: &str = "top_language";
    /// Ranked languages as list items.
    pub const TOP_LANGUAGES: &str = "top_languages";
    /// Ranked languages as a table.
    pub const LANGUAGES: &str = "languages";
    /// Repository with the most stars.
    pub const MOST_STARRED: &str = "most_starred";
    /// Ranked repositories as a table.
    pub const TOP_REPOSITORIES: &str = "top_repositories";
    /// Most used repository topics as list items.
    pub const TOP_TOPICS: &str = "top_topics";
    /// Most recently updated repository.
    pub const LAST_UPDATED: &str = "last_updated";
    /// Commits authored by the account.
    pub const COMMITS: &str = "commits";
    /// Lines added by the account.
    pub const LOC_ADD: &str = "loc_add";
    /// Lines removed by the account.
    pub const LOC_DEL: &str = "loc_del";
    /// Net lines of code (`loc_add - loc_del`).
    pub const LOC_TOTAL: &str = "loc_total";
    /// Profile display name, falling back to the login.
    pub const NAME: &str = "name";
    /// Follower count.
    pub const FOLLOWERS: &str = "followers";
    /// Followed account count.
    pub const FOLLOWING: &str = "following";
    /// Public repository count reported by the profile.
    pub const PUBLIC_REPOS: &str = "public_repos";
    /// Public gist count.
    pub const PUBLIC_GISTS: &str = "public_gists";
    /// Account creation date.
    pub const MEMBER_SINCE: &str = "member_since";
    /// Latest feed entries.
    pub const RECENT_ACTIVITY: &str = "recent_activity";
    /// Most frequent feed entry categories as list items.
    pub const TOP_CATEGORIES: &str = "top_categories";
    /// Time elapsed since the configured birthday.
    pub const AGE: &str = "age";

    /// Keys produced for every input, including an empty one.
    pub const ALWAYS_PRESENT: &[&str] = &[
        REPO_COUNT,
        ARCHIVED_COUNT,
        TOTAL_STARS,
        TOTAL_FORKS,
        TOP_LANGUAGE,
        TOP_LANGUAGES,
        LANGUAGES,
        MOST_STARRED,
        TOP_REPOSITORIES,
        TOP_TOPICS,
        LAST_UPDATED,
        COMMITS,
        LOC_ADD,
        LOC_DEL,
        LOC_TOTAL,
        NAME,
        FOLLOWERS,
        FOLLOWING,
        PUBLIC_REPOS,
        PUBLIC_GISTS,
        MEMBER_SINCE,
        RECENT_ACTIVITY,
        TOP_CATEGORIES,
    ];
}

/// Inputs that influence aggregation besides the raw records.
#[derive(Debug, Clone, Copy, PartialEq, Eq,)]
pub struct AggregateOptions
{
    /// Reference date for the `age` statistic.
    pub today:      NaiveDate,
    /// Birthday; the `age` statistic is omitted when `None`.
    pub birthday:   Option<NaiveDate,>,
    /// Number of entries in ranked lists and tables.
    pub top_n:      usize,
    /// Number of feed entries kept.
    pub feed_limit: usize,
}

impl AggregateOptions
{
    /// Creates options with default limits and no birthday.
    pub fn new(today: NaiveDate,) -> Self
    {
        Self {
            today,
            birthday: None,
            top_n: DEFAULT_LIMIT,
            feed_limit: DEFAULT_LIMIT,
        }
    }
}

/// Incremental reducer over [`RawItem`] batches.
#[derive(Debug, Clone,)]
pub struct Aggregator
{
    options:      AggregateOptions,
    repo_count:   u64,
    archived:     u64,
    stars:        u64,
    forks:        u64,
    languages:    BTreeMap<String, u64,>,
    topics:       BTreeMap<String, u64,>,
    top_repos:    Vec<RepositoryItem,>,
    last_updated: Option<(DateTime<Utc,>, String,),>,
    commits:      u64,
    additions:    u64,
    deletions:    u64,
    profile:      Option<ProfileItem,>,
    feed:         Vec<FeedEntry,>,
    categories:   BTreeMap<String, u64,>,
}

impl Aggregator
{
    /// Creates an empty aggregator.
    pub fn new(options: AggregateOptions,) -> Self
    {
        Self {
            options,
            repo_count: 0,
            archived: 0,
            stars: 0,
            forks: 0,
            languages: BTreeMap::new(),
            topics: BTreeMap::new(),
            top_repos: Vec::new(),
            last_updated: None,
            commits: 0,
            additions: 0,
            deletions: 0,
            profile: None,
            feed: Vec::new(),
            categories: BTreeMap::new(),
        }
    }

    /// Folds a batch of items into the running totals.
    pub fn absorb<I,>(&mut self, items: I,)
    where
        I: IntoIterator<Item = RawItem,>,
    {
        for item in items {
            self.push(item,);
        }
    }

    /// Folds a single item into the running totals.
    pub fn push(&mut self, item: RawItem,)
    {
        match item {
            RawItem::Profile(profile,) => self.profile = Some(profile,),
            RawItem::Repository(repository,) => self.push_repository(repository,),
            RawItem::Contribution(contribution,) => {
                self.commits = self.commits.saturating_add(contribution.commits,);
                self.additions = self.additions.saturating_add(contribution.additions,);
                self.deletions = self.deletions.saturating_add(contribution.deletions,);
            }
            RawItem::FeedEntry(entry,) => {
                count_tags(&mut self.categories, &entry.categories,);
                self.feed.push(entry,);
            }
        }
    }

    fn push_repository(&mut self, repository: RepositoryItem,)
    {
        self.repo_count += 1;
        if repository.archived {
            self.archived += 1;
        }
        self.stars = self.stars.saturating_add(repository.stars,);
        self.forks = self.forks.saturating_add(repository.forks,);

        if let Some(language,) = repository.language.as_deref().map(str::trim,)
            && !language.is_empty()
        {
            *self.languages.entry(language.to_owned(),).or_default() += 1;
        }
        count_tags(&mut self.topics, &repository.topics,);

        if let Some(updated_at,) = repository.updated_at {
            let newer = match &self.last_updated {
                None => true,
                Some((current, name,),) => {
                    updated_at > *current
                        || (updated_at == *current && repository.full_name < *name)
                }
            };
            if newer {
                self.last_updated = Some((updated_at, repository.full_name.clone(),),);
            }
        }

        self.top_repos.push(repository,);
        self.top_repos.sort_by(rank_repositories,);
        self.top_repos.truncate(self.options.top_n.max(1,),);
    }

    /// Produces the final statistics.
    pub fn finish(self,) -> Stats
    {
        let mut stats = Stats::default();
        let languages = ranked_counts(&self.languages, self.options.top_n,);

        stats.insert(integer(keys::REPO_COUNT, self.repo_count,),);
        stats.insert(integer(keys::ARCHIVED_COUNT, self.archived,),);
        stats.insert(integer(keys::TOTAL_STARS, self.stars,),);
        stats.insert(integer(keys::TOTAL_FORKS, self.forks,),);
        stats.insert(text(
            keys::TOP_LANGUAGE,
            languages.first().map(|(name, _,)| name.to_string(),),
        ),);
        stats.insert(StatRecord::new(
            keys::TOP_LANGUAGES,
            StatValue::List(
                languages
                    .iter()
                    .map(|(name, count,)| format!("{name} ({count})"),)
                    .collect(),
            ),
        ),);
        stats.insert(StatRecord::new(
            keys::LANGUAGES,
            StatValue::Table(StatTable {
                header: vec!["Language".to_owned(), "Repositories".to_owned()],
                rows:   languages
                    .iter()
                    .map(|(name, count,)| vec![name.to_string(), count.to_string()],)
                    .collect(),
            },),
        ),);

        let ranked = &self.top_repos[..self.top_repos.len().min(self.options.top_n,)];
        stats.insert(text(
            keys::MOST_STARRED,
            ranked
                .first()
                .filter(|repository| repository.stars > 0,)
                .map(|repository| format!("{} (★ {})", repository.full_name, repository.stars),),
        ),);
        stats.insert(StatRecord::new(
            keys::TOP_REPOSITORIES,
            StatValue::Table(StatTable {
                header: vec![
                    "Repository".to_owned(),
                    "Stars".to_owned(),
                    "Forks".to_owned(),
                    "Language".to_owned()
                ],
                rows:   ranked
                    .iter()
                    .map(|repository| {
                        vec![
                            repository.full_name.clone(),
                            repository.stars.to_string(),
                            repository.forks.to_string(),
                            repository
                                .language
                                .clone()
                                .unwrap_or_else(|| PLACEHOLDER.to_owned()),
                        ]
                    },)
                    .collect(),
            },),
        ),);
        stats.insert(ranked_list(
            keys::TOP_TOPICS,
            &self.topics,
            self.options.top_n,
        ),);
        stats.insert(text(
            keys::LAST_UPDATED,
            self.last_updated
                .as_ref()
                .map(|(at, name,)| format!("{name} ({})", at.format("%Y-%m-%d")),),
        ),);

        stats.insert(integer(keys::COMMITS, self.commits,),);
        stats.insert(integer(keys::LOC_ADD, self.additions,),);
        stats.insert(integer(keys::LOC_DEL, self.deletions,),);
        stats.insert(StatRecord::new(
            keys::LOC_TOTAL,
            StatValue::Integer(to_i64(self.additions,).saturating_sub(to_i64(self.deletions,),),),
        ),);

        let profile = self.profile.unwrap_or_default();
        stats.insert(text(
            keys::NAME,
            profile
                .name
                .clone()
                .filter(|name| !name.trim().is_empty(),)
                .or_else(|| Some(profile.login.clone(),).filter(|login| !login.is_empty(),),),
        ),);
        stats.insert(integer(keys::FOLLOWERS, profile.followers,),);
        stats.insert(integer(keys::FOLLOWING, profile.following,),);
        stats.insert(integer(keys::PUBLIC_REPOS, profile.public_repos,),);
        stats.insert(integer(keys::PUBLIC_GISTS, profile.public_gists,),);
        stats.insert(text(
            keys::MEMBER_SINCE,
            profile
                .created_at
                .map(|at| at.format("%Y-%m-%d",).to_string(),),
        ),);

        let mut feed = self.feed;
        feed.sort_by(rank_feed_entries,);
        stats.insert(StatRecord::new(
            keys::RECENT_ACTIVITY,
            StatValue::List(
                feed.iter()
                    .take(self.options.feed_limit,)
                    .map(format_feed_entry,)
                    .collect(),
            ),
        ),);
        stats.insert(ranked_list(
            keys::TOP_CATEGORIES,
            &self.categories,
            self.options.top_n,
        ),);

        if let Some(birthday,) = self.options.birthday {
            stats.insert(text(keys::AGE, describe_age(birthday, self.options.today,),),);
        }

        stats
    }
}

/// Reduces `items` into statistics in one call.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use readme_stats::{AggregateOptions, StatValue, aggregate};
///
/// let today = NaiveDate::from_ymd_opt(2025, 1, 1).expect("valid date");
/// let stats = aggregate(Vec::new(), AggregateOptions::new(today));
/// assert_eq!(stats.get("total_stars"), Some(&StatValue::Integer(0)));
/// assert_eq!(stats.get("top_language"), Some(&StatValue::Text("N/A".to_owned())));
/// ```
pub fn aggregate<I,>(items: I, options: AggregateOptions,) -> Stats
where
    I: IntoIterator<Item = RawItem,>,
{
    let mut aggregator = Aggregator::new(options,);
    aggregator.absorb(items,);
    aggregator.finish()
}

/// Describes the time elapsed between `birthday` and `today`.
///
/// Months are counted in whole calendar months; a birthday on a day missing
/// from the target month anchors on that month's last day. The suffix `!!!`
/// marks the anniversary itself. Returns `None` for a birthday in the future.
pub fn describe_age(birthday: NaiveDate, today: NaiveDate,) -> Option<String,>
{
    if birthday > today {
        return None;
    }

    let mut months = (today.year() - birthday.year()) * 12 + today.month() as i32
        - birthday.month() as i32;
    if today.day() < birthday.day() {
        months -= 1;
    }

    let months = u32::try_from(months,).ok()?;
    let anchor = birthday.checked_add_months(Months::new(months,),)?;
    let days = (today - anchor).num_days();
    let (years, months,) = (months / 12, months % 12,);

    Some(format!(
        "{years} year{}, {months} month{}, {days} day{}{}",
        plural(i64::from(years)),
        plural(i64::from(months)),
        plural(days),
        if months == 0 && days == 0 { " !!!" } else { "" }
    ),)
}

fn plural(value: i64,) -> &'static str
{
    if value == 1 { "" } else { "s" }
}

fn rank_repositories(left: &RepositoryItem, right: &RepositoryItem,) -> Ordering
{
    right
        .stars
        .cmp(&left.stars,)
        .then_with(|| left.full_name.cmp(&right.full_name,),)
}

fn rank_feed_entries(left: &FeedEntry, right: &FeedEntry,) -> Ordering
{
    match (left.published, right.published,) {
        (Some(a,), Some(b,),) => b.cmp(&a,),
        (Some(_,), None,) => Ordering::Less,
        (None, Some(_,),) => Ordering::Greater,
        (None, None,) => Ordering::Equal,
    }
    .then_with(|| left.title.cmp(&right.title,),)
}

/// Ranks counted names by count, ties by ascending name.
fn ranked_counts(counts: &BTreeMap<String, u64,>, limit: usize,) -> Vec<(&str, u64,),>
{
    let mut ranked: Vec<(&str, u64,),> = counts
        .iter()
        .map(|(name, count,)| (name.as_str(), *count,),)
        .collect();
    ranked.sort_by(|left, right| right.1.cmp(&left.1,).then_with(|| left.0.cmp(right.0,),),);
    ranked.truncate(limit,);
    ranked
}

fn ranked_list(key: &str, counts: &BTreeMap<String, u64,>, limit: usize,) -> StatRecord
{
    StatRecord::new(
        key,
        StatValue::List(
            ranked_counts(counts, limit,)
                .iter()
                .map(|(name, count,)| format!("{name} ({count})"),)
                .collect(),
        ),
    )
}

fn count_tags(counts: &mut BTreeMap<String, u64,>, tags: &[String],)
{
    for tag in tags.iter().map(|tag| tag.trim(),).filter(|tag| !tag.is_empty(),) {
        *counts.entry(tag.to_owned(),).or_default() += 1;
    }
}

/// Formats one activity line; links other than `http`/`https` are dropped.
fn format_feed_entry(entry: &FeedEntry,) -> String
{
    let title = escape_markdown(entry.title.trim(),);
    let mut item = match entry.web_link() {
        Some(link,) => format!(
            "[{title}]({})",
            link.as_str().replace('(', "%28").replace(')', "%29")
        ),
        None => title,
    };

    if let Some(published,) = entry.published {
        item.push_str(&format!(" ({})", published.format("%Y-%m-%d")),);
    }

    item
}

fn escape_markdown(text: &str,) -> String
{
    text.replace('&', "&amp;",)
        .replace('<', "&lt;",)
        .replace('>', "&gt;",)
        .replace('[', "\\[",)
        .replace(']', "\\]",)
}

fn integer(key: &str, value: u64,) -> StatRecord
{
    StatRecord::new(key, StatValue::Integer(to_i64(value,),),)
}

fn text(key: &str, value: Option<String,>,) -> StatRecord
{
    StatRecord::new(
        key,
        StatValue::Text(value.unwrap_or_else(|| PLACEHOLDER.to_owned(),),),
    )
}

fn to_i64(value: u64,) -> i64
{
    i64::try_from(value,).unwrap_or(i64::MAX,)
}
