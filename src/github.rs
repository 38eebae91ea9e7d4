// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! GitHub REST client for profile, repository and contribution records.
//!
//! Requests go through an authenticated [`Octocrab`] instance. Responses are
//! read raw so that status codes can be mapped onto the crate's error
//! taxonomy before any decoding happens.

use chrono::{DateTime, Utc};
use octocrab::{Octocrab, service::middleware::retry::RetryConfig};
use serde::{Deserialize, de::DeserializeOwned};
use tracing::{debug, warn};

use crate::{
    config::Settings,
    error::Error,
    model::{ContributionItem, ProfileItem, RepositoryItem},
    response::{ResponseMeta, classify_failure},
};

/// Page size requested from list endpoints.
pub const PAGE_SIZE: usize = 100;

/// Profile response of `GET /users/{user}`.
#[derive(Debug, Clone, Deserialize,)]
struct UserResponse
{
    login:        String,
    #[serde(default)]
    name:         Option<String,>,
    #[serde(default)]
    followers:    u64,
    #[serde(default)]
    following:    u64,
    #[serde(default)]
    public_repos: u64,
    #[serde(default)]
    public_gists: u64,
    #[serde(default)]
    created_at:   Option<DateTime<Utc,>,>,
}

/// Repository entry of `GET /user/repos`.
#[derive(Debug, Clone, Deserialize,)]
struct RepositoryResponse
{
    full_name:        String,
    name:             String,
    #[serde(default)]
    language:         Option<String,>,
    #[serde(default)]
    stargazers_count: u64,
    #[serde(default)]
    forks_count:      u64,
    #[serde(default)]
    fork:             bool,
    #[serde(default)]
    archived:         bool,
    #[serde(default)]
    pushed_at:        Option<DateTime<Utc,>,>,
    #[serde(default)]
    updated_at:       Option<DateTime<Utc,>,>,
    #[serde(default)]
    topics:           Vec<String,>,
}

/// GitHub API contributor statistics response structure.
#[derive(Debug, Clone, Deserialize,)]
struct ContributorStats
{
    #[serde(default)]
    weeks:  Vec<WeeklyStats,>,
    author: Option<Author,>,
}

/// Weekly contribution statistics.
#[derive(Debug, Clone, Deserialize,)]
struct WeeklyStats
{
    #[serde(default)]
    a: u64,
    #[serde(default)]
    d: u64,
    #[serde(default)]
    c: u64,
}

/// Contributor author information.
#[derive(Debug, Clone, Deserialize,)]
struct Author
{
    login: String,
}

impl From<UserResponse,> for ProfileItem
{
    fn from(user: UserResponse,) -> Self
    {
        Self {
            login:        user.login,
            name:         user.name,
            followers:    user.followers,
            following:    user.following,
            public_repos: user.public_repos,
            public_gists: user.public_gists,
            created_at:   user.created_at,
        }
    }
}

impl From<RepositoryResponse,> for RepositoryItem
{
    fn from(repository: RepositoryResponse,) -> Self
    {
        Self {
            full_name:  repository.full_name,
            name:       repository.name,
            language:   repository.language,
            stars:      repository.stargazers_count,
            forks:      repository.forks_count,
            fork:       repository.fork,
            archived:   repository.archived,
            updated_at: repository.pushed_at.or(repository.updated_at,),
            topics:     repository.topics,
        }
    }
}

/// Authenticated client scoped to one account.
#[derive(Debug, Clone,)]
pub struct GitHubClient
{
    octocrab:    Octocrab,
    user:        String,
    affiliation: String,
}

impl GitHubClient
{
    /// Builds a client from validated settings.
    ///
    /// Automatic retries are disabled: every request is sent once and its
    /// failure surfaces immediately.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] when the API URL is rejected or the
    /// underlying client cannot be constructed.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use readme_stats::{GitHubClient, RawSettings, Settings};
    ///
    /// # async fn example() -> Result<(), readme_stats::Error> {
    /// let settings = Settings::resolve(RawSettings {
    ///     token: Some("ghp_token".to_owned()),
    ///     user: Some("octocat".to_owned()),
    ///     ..RawSettings::default()
    /// })?;
    /// let client = GitHubClient::new(&settings)?;
    /// let profile = client.profile().await?;
    /// println!("{} has {} followers", profile.login, profile.followers);
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(settings: &Settings,) -> Result<Self, Error,>
    {
        let octocrab = Octocrab::builder()
            .add_retry_config(RetryConfig::None,)
            .personal_token(settings.token.clone(),)
            .base_uri(settings.api_url.as_str(),)
            .map_err(|e| Error::configuration(format!("invalid GITHUB_API_URL: {e}"),),)?
            .build()
            .map_err(|e| {
                Error::configuration(format!("failed to initialize GitHub client: {e}"),)
            },)?;

        Ok(Self {
            octocrab,
            user: settings.user.clone(),
            affiliation: settings.affiliation.clone(),
        },)
    }

    /// Fetches profile aggregates.
    ///
    /// # Errors
    ///
    /// Propagates authentication, rate limit, transport and payload errors.
    pub async fn profile(&self,) -> Result<ProfileItem, Error,>
    {
        let route = format!("/users/{}", self.user);
        let (meta, body,) = self.get(&route,).await?;
        if !meta.is_success() {
            return Err(classify_failure(&format!("GET {route}"), &meta, &body,),);
        }

        let user: UserResponse = decode(&route, &body,)?;
        Ok(user.into(),)
    }

    /// Fetches one page of repositories, starting at page `1`.
    ///
    /// # Errors
    ///
    /// Propagates authentication, rate limit, transport and payload errors.
    pub async fn repository_page(&self, page: u32,) -> Result<Vec<RepositoryItem,>, Error,>
    {
        let route = format!(
            "/user/repos?affiliation={}&sort=full_name&direction=asc&per_page={PAGE_SIZE}&page={page}",
            self.affiliation
        );
        let (meta, body,) = self.get(&route,).await?;
        if !meta.is_success() {
            return Err(classify_failure(&format!("GET {route}"), &meta, &body,),);
        }

        let repositories: Vec<RepositoryResponse,> = decode(&route, &body,)?;
        debug!("Fetched {} repositories on page {}", repositories.len(), page);
        Ok(repositories.into_iter().map(RepositoryItem::from,).collect(),)
    }

    /// Fetches commits and line changes authored by the account in
    /// `repository` (given as `owner/name`).
    ///
    /// Returns `None` when statistics are still being computed (`202`), the
    /// repository is empty (`204`/`409`), or the account has no commits there.
    ///
    /// # Errors
    ///
    /// Propagates authentication, rate limit, transport and payload errors.
    pub async fn contributions(
        &self,
        repository: &str,
    ) -> Result<Option<ContributionItem,>, Error,>
    {
        let route = format!("/repos/{repository}/stats/contributors");
        let (meta, body,) = self.get(&route,).await?;

        match meta.status {
            202 => {
                warn!(
                    "Contributor statistics for {} are still being computed; counting zero",
                    repository
                );
                return Ok(None,);
            }
            204 | 409 => {
                debug!("Repository {} is empty", repository);
                return Ok(None,);
            }
            _ if !meta.is_success() => {
                return Err(classify_failure(&format!("GET {route}"), &meta, &body,),);
            }
            _ => {}
        }

        if body.trim().is_empty() {
            return Ok(None,);
        }

        let stats: Vec<ContributorStats,> = decode(&route, &body,)?;
        Ok(sum_contributions(stats, &self.user, repository,),)
    }

    async fn get(&self, route: &str,) -> Result<(ResponseMeta, String,), Error,>
    {
        let response = self
            .octocrab
            ._get(route,)
            .await
            .map_err(|e| Error::transport(format!("GET {route} failed: {e}"),),)?;

        let meta = ResponseMeta::from_lookup(response.status().as_u16(), |name| {
            response
                .headers()
                .get(name,)
                .and_then(|value| value.to_str().ok(),)
                .map(str::to_owned,)
        },);

        let body = self
            .octocrab
            .body_to_string(response,)
            .await
            .map_err(|e| Error::transport(format!("failed to read body of GET {route}: {e}"),),)?;

        Ok((meta, body,),)
    }
}

fn decode<T,>(route: &str, body: &str,) -> Result<T, Error,>
where
    T: DeserializeOwned,
{
    serde_json::from_str(body,)
        .map_err(|e| Error::payload(format!("unexpected response from GET {route}: {e}"),),)
}

fn sum_contributions(
    stats: Vec<ContributorStats,>,
    user: &str,
    repository: &str,
) -> Option<ContributionItem,>
{
    let own = stats.into_iter().find(|stat| {
        stat.author
            .as_ref()
            .is_some_and(|author| author.login.eq_ignore_ascii_case(user,),)
    },)?;

    let item = ContributionItem {
        repository: repository.to_owned(),
        commits:    own.weeks.iter().map(|week| week.c,).sum(),
        additions:  own.weeks.iter().map(|week| week.a,).sum(),
        deletions:  own.weeks.iter().map(|week| week.d,).sum(),
    };

    if item.commits == 0 { None } else { Some(item,) }
}
