// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Run configuration sourced from the process environment.
//!
//! [`RawSettings`] mirrors the environment variables (each also accepted as a
//! command-line flag) and keeps every value optional so that missing input is
//! reported as [`Error::Configuration`] instead of a parser failure.
//! [`Settings::resolve`] validates everything once, before any network call or
//! file access happens.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::Args;
use reqwest::Url;

use crate::error::Error;

/// Default REST endpoint used when `GITHUB_API_URL` is not set.
pub const DEFAULT_API_URL: &str = "https://api.github.com";
/// Default document location relative to the working directory.
pub const DEFAULT_README_PATH: &str = "README.md";
/// Default repository affiliation filter.
pub const DEFAULT_AFFILIATION: &str = "owner";
/// Default number of entries in "top" lists and in the activity feed.
pub const DEFAULT_LIMIT: usize = 5;

const MAX_LIMIT: usize = 100;
const ALLOWED_AFFILIATIONS: &[&str] = &["owner", "collaborator", "organization_member",];
const FEED_DISABLED: &str = "none";

/// Unvalidated configuration as supplied by the environment or flags.
#[derive(Debug, Clone, Default, Args,)]
pub struct RawSettings
{
    /// GitHub access token.
    #[arg(long = "token", env = "ACCESS_TOKEN", hide_env_values = true)]
    pub token: Option<String,>,

    /// Account whose statistics are rendered.
    #[arg(long = "user", env = "USER_NAME")]
    pub user: Option<String,>,

    /// Bearer credential sent to the feed endpoint.
    #[arg(long = "feed-token", env = "FEED_TOKEN", hide_env_values = true)]
    pub feed_token: Option<String,>,

    /// Feed URL, or `none` to skip the feed. Defaults to the account's
    /// public activity feed.
    #[arg(long = "feed-url", env = "FEED_URL")]
    pub feed_url: Option<String,>,

    /// Document rewritten in place.
    #[arg(long = "readme", env = "README_PATH", value_name = "PATH")]
    pub readme: Option<PathBuf,>,

    /// Birthday in `YYYY-MM-DD` format; enables the `age` statistic.
    #[arg(long = "birthday", env = "BIRTHDAY", value_name = "DATE")]
    pub birthday: Option<String,>,

    /// Comma separated repository affiliations.
    #[arg(long = "affiliation", env = "REPO_AFFILIATION")]
    pub affiliation: Option<String,>,

    /// Base URL of the GitHub REST API.
    #[arg(long = "api-url", env = "GITHUB_API_URL")]
    pub api_url: Option<String,>,

    /// Number of feed entries rendered.
    #[arg(long = "feed-limit", env = "FEED_LIMIT")]
    pub feed_limit: Option<String,>,

    /// Number of entries in "top" lists.
    #[arg(long = "top-n", env = "TOP_N")]
    pub top_n: Option<String,>,
}

/// Validated, immutable configuration for a single run.
#[derive(Clone, PartialEq, Eq,)]
pub struct Settings
{
    /// GitHub access token.
    pub token:       String,
    /// Account login.
    pub user:        String,
    /// Feed endpoint, `None` when the feed is disabled.
    pub feed_url:    Option<Url,>,
    /// Optional bearer credential for the feed.
    pub feed_token:  Option<String,>,
    /// Document rewritten in place.
    pub readme_path: PathBuf,
    /// Birthday used for the `age` statistic.
    pub birthday:    Option<NaiveDate,>,
    /// Normalized affiliation filter, e.g. `owner,collaborator`.
    pub affiliation: String,
    /// REST API base URL without trailing slash.
    pub api_url:     String,
    /// Number of feed entries rendered.
    pub feed_limit:  usize,
    /// Number of entries in "top" lists.
    pub top_n:       usize,
}

impl std::fmt::Debug for Settings
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_,>,) -> std::fmt::Result
    {
        f.debug_struct("Settings",)
            .field("token", &"***",)
            .field("user", &self.user,)
            .field("feed_url", &self.feed_url.as_ref().map(Url::as_str,),)
            .field("feed_token", &self.feed_token.as_ref().map(|_| "***",),)
            .field("readme_path", &self.readme_path,)
            .field("birthday", &self.birthday,)
            .field("affiliation", &self.affiliation,)
            .field("api_url", &self.api_url,)
            .field("feed_limit", &self.feed_limit,)
            .field("top_n", &self.top_n,)
            .finish()
    }
}

impl Settings
{
    /// Validates raw input and applies defaults.
    ///
    /// Required keys are checked first so a run without credentials fails
    /// before anything else is inspected.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] when `ACCESS_TOKEN` or `USER_NAME` is
    /// missing or blank, or when any optional value is malformed.
    ///
    /// # Examples
    ///
    /// ```
    /// use readme_stats::{RawSettings, Settings};
    ///
    /// let raw = RawSettings {
    ///     token: Some("ghp_example".to_owned()),
    ///     user: Some("octocat".to_owned()),
    ///     ..RawSettings::default()
    /// };
    /// let settings = Settings::resolve(raw)?;
    /// assert_eq!(settings.readme_path.to_str(), Some("README.md"));
    /// assert_eq!(
    ///     settings.feed_url.as_ref().map(|url| url.as_str()),
    ///     Some("https://github.com/octocat.atom")
    /// );
    /// # Ok::<(), readme_stats::Error>(())
    /// ```
    pub fn resolve(raw: RawSettings,) -> Result<Self, Error,>
    {
        let token = required(raw.token, "ACCESS_TOKEN",)?;
        let user = normalize_login(&required(raw.user, "USER_NAME",)?,)?;

        let feed_url = match non_blank(raw.feed_url,) {
            Some(value,) if value.eq_ignore_ascii_case(FEED_DISABLED,) => None,
            Some(value,) => Some(parse_url(&value, "FEED_URL",)?,),
            None => Some(parse_url(&format!("https://github.com/{user}.atom"), "FEED_URL",)?,),
        };

        let api_url = match non_blank(raw.api_url,) {
            Some(value,) => {
                parse_url(&value, "GITHUB_API_URL",)?;
                value.trim_end_matches('/',).to_owned()
            }
            None => DEFAULT_API_URL.to_owned(),
        };

        let birthday = non_blank(raw.birthday,)
            .map(|value| {
                NaiveDate::parse_from_str(&value, "%Y-%m-%d",).map_err(|e| {
                    Error::configuration(format!("BIRTHDAY must be formatted as YYYY-MM-DD: {e}"),)
                },)
            },)
            .transpose()?;

        let affiliation = match non_blank(raw.affiliation,) {
            Some(value,) => normalize_affiliation(&value,)?,
            None => DEFAULT_AFFILIATION.to_owned(),
        };

        Ok(Self {
            token,
            user,
            feed_url,
            feed_token: non_blank(raw.feed_token,),
            readme_path: raw
                .readme
                .filter(|path| !path.as_os_str().is_empty(),)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_README_PATH,),),
            birthday,
            affiliation,
            api_url,
            feed_limit: parse_limit(raw.feed_limit, "FEED_LIMIT",)?,
            top_n: parse_limit(raw.top_n, "TOP_N",)?,
        },)
    }
}

fn non_blank(value: Option<String,>,) -> Option<String,>
{
    value
        .map(|value| value.trim().to_owned(),)
        .filter(|value| !value.is_empty(),)
}

fn required(value: Option<String,>, name: &str,) -> Result<String, Error,>
{
    non_blank(value,).ok_or_else(|| Error::configuration(format!("{name} must be set"),),)
}

fn normalize_login(input: &str,) -> Result<String, Error,>
{
    let valid = input.len() <= 39
        && !input.starts_with('-',)
        && !input.ends_with('-',)
        && input.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '-',);

    if !valid {
        return Err(Error::configuration(format!(
            "USER_NAME '{input}' is not a valid GitHub login"
        ),),);
    }

    Ok(input.to_owned(),)
}

fn normalize_affiliation(input: &str,) -> Result<String, Error,>
{
    let mut parts: Vec<&str,> = Vec::new();
    for part in input.split(',',).map(str::trim,).filter(|part| !part.is_empty(),) {
        if !ALLOWED_AFFILIATIONS.contains(&part,) {
            return Err(Error::configuration(format!(
                "REPO_AFFILIATION contains unsupported value '{part}'"
            ),),);
        }
        if !parts.contains(&part,) {
            parts.push(part,);
        }
    }

    if parts.is_empty() {
        return Err(Error::configuration("REPO_AFFILIATION cannot be empty",),);
    }

    Ok(parts.join(",",),)
}

fn parse_url(input: &str, name: &str,) -> Result<Url, Error,>
{
    let url = Url::parse(input,)
        .map_err(|e| Error::configuration(format!("{name} is not a valid URL: {e}"),),)?;

    match url.scheme() {
        "http" | "https" => Ok(url,),
        scheme => Err(Error::configuration(format!(
            "{name} must use http or https, got '{scheme}'"
        ),),),
    }
}

fn parse_limit(value: Option<String,>, name: &str,) -> Result<usize, Error,>
{
    let Some(value,) = non_blank(value,) else {
        return Ok(DEFAULT_LIMIT,);
    };

    match value.parse::<usize,>() {
        Ok(limit,) if (1..=MAX_LIMIT).contains(&limit,) => Ok(limit,),
        _ => Err(Error::configuration(format!(
            "{name} must be an integer between 1 and {MAX_LIMIT}"
        ),),),
    }
}
