// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! One run: resolve settings, fetch, aggregate, render, persist.
//!
//! Every step either succeeds or aborts the run; the document is written only
//! after rendering succeeded for every recognized marker.

use chrono::{NaiveDate, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use crate::{
    aggregate::{AggregateOptions, Aggregator},
    config::{RawSettings, Settings},
    document::Document,
    error::Error,
    model::RawItem,
    source::{LiveSource, RepositoryPages, StatsSource},
    stats::Stats,
    template::{recognized_markers, render},
};

/// What happened to the document.
#[derive(Debug, Clone, PartialEq, Eq,)]
pub enum Outcome
{
    /// The document was rewritten.
    Updated,
    /// Rendering produced the current content; nothing was written.
    Unchanged,
    /// Dry run; carries the rendered document that would have been written.
    DryRun(String,),
}

/// Result of a successful run.
#[derive(Debug, Clone, PartialEq, Eq,)]
pub struct Report
{
    /// Effect on the document.
    pub outcome: Outcome,
    /// Statistics computed during the run.
    pub stats:   Stats,
}

/// Resolves configuration and performs a run against the live services.
///
/// Configuration is validated before any network call or file access.
///
/// # Errors
///
/// Returns the first error raised by any step; see [`Error`].
///
/// # Example
///
/// ```no_run
/// use readme_stats::{Outcome, RawSettings, run};
///
/// # async fn example() -> Result<(), readme_stats::Error> {
/// let raw = RawSettings {
///     token: Some("ghp_token".to_owned()),
///     user: Some("octocat".to_owned()),
///     ..RawSettings::default()
/// };
/// let report = run(raw, false).await?;
/// assert_ne!(report.outcome, Outcome::DryRun(String::new()));
/// # Ok(())
/// # }
/// ```
pub async fn run(raw: RawSettings, dry_run: bool,) -> Result<Report, Error,>
{
    let settings = Settings::resolve(raw,)?;
    debug!("Resolved settings: {:?}", settings);

    let source = LiveSource::new(&settings,)?;
    execute(&settings, &source, Utc::now().date_naive(), dry_run,).await
}

/// Performs a run against `source`, using `today` as the reference date.
///
/// # Errors
///
/// Returns [`Error::Io`] when the document cannot be read or written,
/// propagates source errors, and returns [`Error::IncompleteData`] when a
/// marker needs a statistic that was not computed. The document is left
/// untouched in every error case.
pub async fn execute<S,>(
    settings: &Settings,
    source: &S,
    today: NaiveDate,
    dry_run: bool,
) -> Result<Report, Error,>
where
    S: StatsSource,
{
    let mut document = Document::load(&settings.readme_path,)?;

    let markers = recognized_markers(document.content(),);
    if markers.is_empty() {
        warn!(
            "{} contains no recognized markers; it will not change",
            document.path().display()
        );
    } else {
        info!("Found markers: {}", markers.join(", "));
    }

    let stats = collect(settings, source, today,).await?;
    let rendered = render(document.content(), &stats,)?;

    let outcome = if dry_run {
        info!("Dry run; {} left untouched", document.path().display());
        Outcome::DryRun(rendered,)
    } else if document.persist(rendered,)? {
        Outcome::Updated
    } else {
        Outcome::Unchanged
    };

    Ok(Report {
        outcome,
        stats,
    },)
}

/// Fetches every record from `source` and folds it into statistics.
///
/// Repositories are consumed page by page; contribution statistics are
/// requested for each repository that is not a fork.
///
/// # Errors
///
/// Propagates the first source error.
pub async fn collect<S,>(settings: &Settings, source: &S, today: NaiveDate,) -> Result<Stats, Error,>
where
    S: StatsSource,
{
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.yellow} [{elapsed_precise}] {msg}",)
            .unwrap_or_else(|_| ProgressStyle::default_spinner(),),
    );

    let options = AggregateOptions {
        today,
        birthday: settings.birthday,
        top_n: settings.top_n,
        feed_limit: settings.feed_limit,
    };
    let mut aggregator = Aggregator::new(options,);

    let mut pages = RepositoryPages::new(source,);
    let mut repositories = 0usize;
    loop {
        pb.set_message(format!("Fetching repositories (page {})...", pages.pages_fetched() + 1),);
        let Some(batch,) = pages.next_batch().await? else {
            break;
        };

        for repository in &batch {
            if repository.fork {
                debug!("Skipping contributions of fork {}", repository);
                continue;
            }
            pb.set_message(format!("Counting contributions in {}...", repository.full_name),);
            if let Some(contribution,) = source.contributions(&repository.full_name,).await? {
                debug!("Counted {}", contribution);
                aggregator.push(RawItem::Contribution(contribution,),);
            }
        }

        repositories += batch.len();
        aggregator.absorb(batch.into_iter().map(RawItem::Repository,),);
    }
    info!(
        "Processed {} repositories across {} pages",
        repositories,
        pages.pages_fetched()
    );

    pb.set_message("Fetching profile...",);
    aggregator.push(RawItem::Profile(source.profile().await?,),);

    pb.set_message("Fetching feed...",);
    let entries = source.feed().await?;
    info!("Fetched {} feed entries", entries.len());
    aggregator.absorb(entries.into_iter().map(RawItem::FeedEntry,),);

    pb.finish_and_clear();
    Ok(aggregator.finish(),)
}

#[cfg(test)]
mod tests
{
    use std::{cell::RefCell, fs, path::Path};

    use tempfile::tempdir;

    use super::*;
    use crate::{
        aggregate::keys,
        model::{ContributionItem, FeedEntry, ProfileItem, RepositoryItem},
        stats::StatValue,
    };

    #[derive(Default,)]
    struct FakeSource
    {
        repositories:  Vec<RepositoryItem,>,
        contributions: Vec<ContributionItem,>,
        feed:          Vec<FeedEntry,>,
        fail_profile:  bool,
        calls:         RefCell<Vec<String,>,>,
    }

    impl StatsSource for FakeSource
    {
        async fn profile(&self,) -> Result<ProfileItem, Error,>
        {
            self.calls.borrow_mut().push("profile".to_owned(),);
            if self.fail_profile {
                return Err(Error::authentication("GET /users/octocat returned 401: Bad credentials",),);
            }
            Ok(ProfileItem {
                login: "octocat".to_owned(),
                followers: 1200,
                ..ProfileItem::default()
            },)
        }

        async fn repository_page(&self, page: u32,) -> Result<Vec<RepositoryItem,>, Error,>
        {
            self.calls.borrow_mut().push(format!("page {page}"),);
            if page == 1 {
                Ok(self.repositories.clone(),)
            } else {
                Ok(Vec::new(),)
            }
        }

        async fn contributions(
            &self,
            repository: &str,
        ) -> Result<Option<ContributionItem,>, Error,>
        {
            self.calls.borrow_mut().push(format!("contributions {repository}"),);
            Ok(self
                .contributions
                .iter()
                .find(|item| item.repository == repository,)
                .cloned(),)
        }

        async fn feed(&self,) -> Result<Vec<FeedEntry,>, Error,>
        {
            self.calls.borrow_mut().push("feed".to_owned(),);
            Ok(self.feed.clone(),)
        }
    }

    fn repository(name: &str, stars: u64, fork: bool,) -> RepositoryItem
    {
        RepositoryItem {
            full_name: format!("octocat/{name}"),
            name: name.to_owned(),
            language: Some("Rust".to_owned(),),
            stars,
            forks: 1,
            fork,
            archived: false,
            updated_at: None,
            topics: Vec::new(),
        }
    }

    fn settings_for(readme: &Path,) -> Settings
    {
        Settings::resolve(RawSettings {
            token: Some("ghp_token".to_owned(),),
            user: Some("octocat".to_owned(),),
            readme: Some(readme.to_path_buf(),),
            feed_url: Some("none".to_owned(),),
            ..RawSettings::default()
        },)
        .expect("settings should resolve",)
    }

    fn today() -> NaiveDate
    {
        NaiveDate::from_ymd_opt(2025, 6, 1,).expect("valid date",)
    }

    fn modified(path: &Path,) -> std::time::SystemTime
    {
        fs::metadata(path,)
            .and_then(|metadata| metadata.modified(),)
            .expect("mtime",)
    }

    #[tokio::test]
    async fn renders_and_writes_recognized_markers()
    {
        let dir = tempdir().expect("failed to create temp dir",);
        let path = dir.path().join("README.md",);
        fs::write(
            &path,
            "# Me\nStars: <!--START:STARS-->0<!--END:STARS-->\n<!--START:COMMITS--><!--END:COMMITS-->\n<!--START:UNKNOWN-->keep<!--END:UNKNOWN-->\n",
        )
        .expect("failed to write README",);

        let source = FakeSource {
            repositories: vec![repository("a", 40, false), repository("b", 2, true)],
            contributions: vec![
                ContributionItem {
                    repository: "octocat/a".to_owned(),
                    commits:    1234,
                    additions:  10,
                    deletions:  5
                },
                ContributionItem {
                    repository: "octocat/b".to_owned(),
                    commits:    99,
                    additions:  1,
                    deletions:  1
                },
            ],
            ..FakeSource::default()
        };

        let report = execute(&settings_for(&path,), &source, today(), false,)
            .await
            .expect("run should succeed",);

        assert_eq!(report.outcome, Outcome::Updated);
        assert_eq!(report.stats.get(keys::TOTAL_STARS), Some(&StatValue::Integer(42)));
        assert_eq!(
            fs::read_to_string(&path).expect("read failed"),
            "# Me\nStars: <!--START:STARS-->42<!--END:STARS-->\n<!--START:COMMITS-->1,234<!--END:COMMITS-->\n<!--START:UNKNOWN-->keep<!--END:UNKNOWN-->\n"
        );
        assert!(
            !source
                .calls
                .borrow()
                .contains(&"contributions octocat/b".to_owned()),
            "forks are not queried for contributions"
        );
    }

    #[tokio::test]
    async fn second_run_leaves_file_unchanged()
    {
        let dir = tempdir().expect("failed to create temp dir",);
        let path = dir.path().join("README.md",);
        fs::write(&path, "<!--START:REPOS-->1<!--END:REPOS-->",).expect("failed to write README",);

        let source = FakeSource {
            repositories: vec![repository("a", 1, false)],
            ..FakeSource::default()
        };

        let report = execute(&settings_for(&path,), &source, today(), false,)
            .await
            .expect("run should succeed",);
        assert_eq!(report.outcome, Outcome::Unchanged);
    }

    #[tokio::test]
    async fn dry_run_does_not_write()
    {
        let dir = tempdir().expect("failed to create temp dir",);
        let path = dir.path().join("README.md",);
        fs::write(&path, "<!--START:STARS-->0<!--END:STARS-->",).expect("failed to write README",);

        let source = FakeSource {
            repositories: vec![repository("a", 7, false)],
            ..FakeSource::default()
        };

        let report = execute(&settings_for(&path,), &source, today(), true,)
            .await
            .expect("run should succeed",);

        assert_eq!(
            report.outcome,
            Outcome::DryRun("<!--START:STARS-->7<!--END:STARS-->".to_owned())
        );
        assert_eq!(
            fs::read_to_string(&path).expect("read failed"),
            "<!--START:STARS-->0<!--END:STARS-->"
        );
    }

    #[tokio::test]
    async fn missing_statistic_aborts_without_writing()
    {
        let dir = tempdir().expect("failed to create temp dir",);
        let path = dir.path().join("README.md",);
        let original = "<!--START:STARS-->0<!--END:STARS-->\n<!--START:AGE-->?<!--END:AGE-->\n";
        fs::write(&path, original,).expect("failed to write README",);
        let before = modified(&path,);

        let source = FakeSource {
            repositories: vec![repository("a", 7, false)],
            ..FakeSource::default()
        };

        let error = execute(&settings_for(&path,), &source, today(), false,)
            .await
            .expect_err("age is not computed without a birthday",);

        match error {
            Error::IncompleteData {
                marker,
                key,
            } => {
                assert_eq!(marker, "AGE");
                assert_eq!(key, keys::AGE);
            }
            other => panic!("expected incomplete data error, got {other:?}"),
        }
        assert_eq!(fs::read_to_string(&path).expect("read failed"), original);
        assert_eq!(modified(&path), before);
    }

    #[tokio::test]
    async fn source_errors_abort_without_writing()
    {
        let dir = tempdir().expect("failed to create temp dir",);
        let path = dir.path().join("README.md",);
        fs::write(&path, "<!--START:STARS-->0<!--END:STARS-->",).expect("failed to write README",);

        let source = FakeSource {
            fail_profile: true,
            ..FakeSource::default()
        };

        let error = execute(&settings_for(&path,), &source, today(), false,)
            .await
            .expect_err("profile failure must abort",);

        assert!(matches!(error, Error::Authentication { .. }));
        assert_eq!(
            fs::read_to_string(&path).expect("read failed"),
            "<!--START:STARS-->0<!--END:STARS-->"
        );
        assert!(!source.calls.borrow().contains(&"feed".to_owned()));
    }

    #[tokio::test]
    async fn missing_credential_fails_before_touching_anything()
    {
        let dir = tempdir().expect("failed to create temp dir",);
        let path = dir.path().join("README.md",);
        let original = "<!--START:STARS-->0<!--END:STARS-->";
        fs::write(&path, original,).expect("failed to write README",);
        let before = modified(&path,);

        let raw = RawSettings {
            user: Some("octocat".to_owned(),),
            readme: Some(path.clone(),),
            ..RawSettings::default()
        };

        let error = run(raw, false,).await.expect_err("missing token must fail",);

        match error {
            Error::Configuration {
                message,
            } => assert!(message.contains("ACCESS_TOKEN")),
            other => panic!("expected configuration error, got {other:?}"),
        }
        assert_eq!(fs::read_to_string(&path).expect("read failed"), original);
        assert_eq!(modified(&path), before);
    }

    #[tokio::test]
    async fn missing_document_is_an_io_error()
    {
        let dir = tempdir().expect("failed to create temp dir",);
        let path = dir.path().join("absent.md",);

        let error = execute(&settings_for(&path,), &FakeSource::default(), today(), false,)
            .await
            .expect_err("absent document must fail",);
        assert!(matches!(error, Error::Io { .. }));
    }

    #[tokio::test]
    async fn collect_orders_requests()
    {
        let dir = tempdir().expect("failed to create temp dir",);
        let path = dir.path().join("README.md",);

        let source = FakeSource {
            repositories: vec![repository("a", 1, false)],
            ..FakeSource::default()
        };

        let stats = collect(&settings_for(&path,), &source, today(),)
            .await
            .expect("collect should succeed",);

        assert_eq!(stats.get(keys::FOLLOWERS), Some(&StatValue::Integer(1200)));
        assert_eq!(
            *source.calls.borrow(),
            vec!["page 1", "contributions octocat/a", "profile", "feed"]
        );
    }
}
