// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Data source abstraction consumed by the pipeline.

use tracing::debug;

use crate::{
    config::Settings,
    error::Error,
    feed::FeedClient,
    github::{GitHubClient, PAGE_SIZE},
    model::{ContributionItem, FeedEntry, ProfileItem, RepositoryItem},
};

/// Upper bound on repository pages requested in one run. A listing that is
/// still full at this point fails rather than yielding partial data.
pub const MAX_PAGES: u32 = 100;

/// Remote data consumed by the aggregator.
///
/// Every call is a single request awaited to completion; implementations are
/// not expected to retry.
#[allow(async_fn_in_trait)]
pub trait StatsSource
{
    /// Account-level aggregates.
    async fn profile(&self,) -> Result<ProfileItem, Error,>;

    /// One page of repositories, starting at page `1`. A page shorter than
    /// [`PAGE_SIZE`] is the last one.
    async fn repository_page(&self, page: u32,) -> Result<Vec<RepositoryItem,>, Error,>;

    /// Work authored by the account in `repository` (`owner/name`), or `None`
    /// when there is nothing to count.
    async fn contributions(&self, repository: &str,) -> Result<Option<ContributionItem,>, Error,>;

    /// Entries of the auxiliary feed; empty when no feed is configured.
    async fn feed(&self,) -> Result<Vec<FeedEntry,>, Error,>;
}

/// Lazy, restartable sequence of repository batches.
///
/// # Example
///
/// ```no_run
/// use readme_stats::{RepositoryPages, StatsSource};
///
/// # async fn example<S: StatsSource>(source: &S) -> Result<(), readme_stats::Error> {
/// let mut pages = RepositoryPages::new(source);
/// while let Some(batch) = pages.next_batch().await? {
///     println!("{} repositories", batch.len());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug,)]
pub struct RepositoryPages<'a, S,>
{
    source:    &'a S,
    next_page: u32,
    exhausted: bool,
}

impl<'a, S,> RepositoryPages<'a, S,>
where
    S: StatsSource,
{
    /// Starts at the first page.
    pub fn new(source: &'a S,) -> Self
    {
        Self {
            source,
            next_page: 1,
            exhausted: false,
        }
    }

    /// Fetches the next non-empty batch, or `None` once the listing ended.
    ///
    /// # Errors
    ///
    /// Propagates the source error; the sequence can be resumed or restarted
    /// afterwards. Returns [`Error::Payload`] when [`MAX_PAGES`] full pages
    /// were read without reaching the end of the listing.
    pub async fn next_batch(&mut self,) -> Result<Option<Vec<RepositoryItem,>,>, Error,>
    {
        if self.exhausted {
            return Ok(None,);
        }

        if self.next_page > MAX_PAGES {
            return Err(Error::payload(format!(
                "repository listing did not end after {MAX_PAGES} pages of {PAGE_SIZE}"
            ),),);
        }

        let batch = self.source.repository_page(self.next_page,).await?;
        debug!("Repository page {} returned {} items", self.next_page, batch.len());
        self.next_page += 1;

        if batch.len() < PAGE_SIZE {
            self.exhausted = true;
        }

        if batch.is_empty() { Ok(None,) } else { Ok(Some(batch,),) }
    }

    /// Rewinds to the first page.
    pub fn restart(&mut self,)
    {
        self.next_page = 1;
        self.exhausted = false;
    }

    /// Number of pages requested since the last restart.
    pub fn pages_fetched(&self,) -> u32
    {
        self.next_page - 1
    }
}

/// Production source combining the GitHub API and the optional feed.
#[derive(Debug, Clone,)]
pub struct LiveSource
{
    github: GitHubClient,
    feed:   Option<FeedClient,>,
}

impl LiveSource
{
    /// Builds both clients from validated settings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] when a client cannot be constructed.
    pub fn new(settings: &Settings,) -> Result<Self, Error,>
    {
        Ok(Self {
            github: GitHubClient::new(settings,)?,
            feed:   FeedClient::from_settings(settings,)?,
        },)
    }
}

impl StatsSource for LiveSource
{
    async fn profile(&self,) -> Result<ProfileItem, Error,>
    {
        self.github.profile().await
    }

    async fn repository_page(&self, page: u32,) -> Result<Vec<RepositoryItem,>, Error,>
    {
        self.github.repository_page(page,).await
    }

    async fn contributions(&self, repository: &str,) -> Result<Option<ContributionItem,>, Error,>
    {
        self.github.contributions(repository,).await
    }

    async fn feed(&self,) -> Result<Vec<FeedEntry,>, Error,>
    {
        match &self.feed {
            Some(client,) => client.fetch().await,
            None => {
                debug!("Feed disabled");
                Ok(Vec::new(),)
            }
        }
    }
}

#[cfg(test)]
mod tests
{
    use std::cell::RefCell;

    use super::*;

    struct PagedSource
    {
        total:    usize,
        requests: RefCell<Vec<u32,>,>,
        fail_on:  Option<u32,>,
    }

    impl PagedSource
    {
        fn new(total: usize,) -> Self
        {
            Self {
                total,
                requests: RefCell::new(Vec::new(),),
                fail_on: None,
            }
        }
    }

    fn repository(index: usize,) -> RepositoryItem
    {
        RepositoryItem {
            full_name:  format!("octocat/repo-{index:04}"),
            name:       format!("repo-{index:04}"),
            language:   None,
            stars:      0,
            forks:      0,
            fork:       false,
            archived:   false,
            updated_at: None,
            topics:     Vec::new(),
        }
    }

    impl StatsSource for PagedSource
    {
        async fn profile(&self,) -> Result<ProfileItem, Error,>
        {
            Ok(ProfileItem::default(),)
        }

        async fn repository_page(&self, page: u32,) -> Result<Vec<RepositoryItem,>, Error,>
        {
            self.requests.borrow_mut().push(page,);
            if self.fail_on == Some(page,) {
                return Err(Error::transport("connection reset",),);
            }
            let start = (page as usize - 1) * PAGE_SIZE;
            let end = (start + PAGE_SIZE).min(self.total,);
            Ok((start..end.max(start,)).map(repository,).collect(),)
        }

        async fn contributions(
            &self,
            _repository: &str,
        ) -> Result<Option<ContributionItem,>, Error,>
        {
            Ok(None,)
        }

        async fn feed(&self,) -> Result<Vec<FeedEntry,>, Error,>
        {
            Ok(Vec::new(),)
        }
    }

    async fn drain<S: StatsSource,>(pages: &mut RepositoryPages<'_, S,>,) -> Vec<RepositoryItem,>
    {
        let mut all = Vec::new();
        while let Some(batch,) = pages.next_batch().await.expect("page should load",) {
            all.extend(batch,);
        }
        all
    }

    #[tokio::test]
    async fn stops_after_short_page()
    {
        let source = PagedSource::new(PAGE_SIZE + 7,);
        let mut pages = RepositoryPages::new(&source,);

        let all = drain(&mut pages,).await;

        assert_eq!(all.len(), PAGE_SIZE + 7);
        assert_eq!(*source.requests.borrow(), vec![1, 2]);
        assert_eq!(pages.pages_fetched(), 2);
        assert!(pages.next_batch().await.expect("exhausted").is_none());
        assert_eq!(source.requests.borrow().len(), 2);
    }

    #[tokio::test]
    async fn full_last_page_needs_one_more_request()
    {
        let source = PagedSource::new(PAGE_SIZE,);
        let mut pages = RepositoryPages::new(&source,);

        let all = drain(&mut pages,).await;

        assert_eq!(all.len(), PAGE_SIZE);
        assert_eq!(*source.requests.borrow(), vec![1, 2]);
    }

    #[tokio::test]
    async fn empty_listing_yields_nothing()
    {
        let source = PagedSource::new(0,);
        let mut pages = RepositoryPages::new(&source,);

        assert!(pages.next_batch().await.expect("page should load").is_none());
        assert_eq!(*source.requests.borrow(), vec![1]);
    }

    #[tokio::test]
    async fn restart_replays_from_first_page()
    {
        let source = PagedSource::new(3,);
        let mut pages = RepositoryPages::new(&source,);

        let first = drain(&mut pages,).await;
        pages.restart();
        let second = drain(&mut pages,).await;

        assert_eq!(first, second);
        assert_eq!(*source.requests.borrow(), vec![1, 1]);
    }

    #[tokio::test]
    async fn errors_propagate_and_sequence_resumes()
    {
        let mut source = PagedSource::new(PAGE_SIZE + 1,);
        source.fail_on = Some(2,);
        let mut pages = RepositoryPages::new(&source,);

        assert!(pages.next_batch().await.expect("first page").is_some());
        let error = pages.next_batch().await.expect_err("second page fails",);
        assert!(matches!(error, Error::Transport { .. }));
        assert_eq!(pages.pages_fetched(), 1);
    }

    #[tokio::test]
    async fn endless_listing_fails_after_page_cap()
    {
        let source = PagedSource::new(PAGE_SIZE * MAX_PAGES as usize + 1,);
        let mut pages = RepositoryPages::new(&source,);

        for _ in 0..MAX_PAGES {
            assert!(pages.next_batch().await.expect("page should load").is_some());
        }
        let error = pages.next_batch().await.expect_err("listing should not end silently",);

        assert!(matches!(error, Error::Payload { .. }));
        assert_eq!(source.requests.borrow().len(), MAX_PAGES as usize);
    }
}
