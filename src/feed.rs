// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Auxiliary activity feed: HTTP retrieval and Atom/RSS parsing.

use std::{borrow::Cow, sync::LazyLock, time::Duration};

use chrono::{DateTime, Utc};
use quick_xml::{
    Reader,
    events::{BytesStart, Event},
};
use regex::Regex;
use reqwest::Url;
use tracing::debug;

use crate::{
    config::Settings,
    error::Error,
    model::{FeedEntry, parse_web_link},
    response::{ResponseMeta, classify_failure},
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30,);
const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

static TAG_PATTERN: LazyLock<Regex,> =
    LazyLock::new(|| Regex::new(r"<[^>]*>",).expect("tag pattern is valid",),);

/// Client for the configured feed endpoint.
#[derive(Debug, Clone,)]
pub struct FeedClient
{
    http:  reqwest::Client,
    url:   Url,
    token: Option<String,>,
}

impl FeedClient
{
    /// Builds a feed client, or returns `Ok(None)` when the feed is disabled.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] when the HTTP client cannot be built.
    pub fn from_settings(settings: &Settings,) -> Result<Option<Self,>, Error,>
    {
        match &settings.feed_url {
            Some(url,) => Self::new(url.clone(), settings.feed_token.clone(),).map(Some,),
            None => Ok(None,),
        }
    }

    /// Builds a client for `url`, sending `token` as a bearer credential.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] when the HTTP client cannot be built.
    pub fn new(url: Url, token: Option<String,>,) -> Result<Self, Error,>
    {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT,)
            .timeout(REQUEST_TIMEOUT,)
            .build()
            .map_err(|e| Error::configuration(format!("failed to initialize feed client: {e}"),),)?;

        Ok(Self {
            http,
            url,
            token,
        },)
    }

    /// Downloads and parses the feed.
    ///
    /// The request URL is kept out of error messages since it may embed a
    /// credential.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] on network failures and unexpected
    /// statuses, [`Error::Authentication`] or [`Error::RateLimit`] when the
    /// endpoint rejects the request, and [`Error::Payload`] when the body is
    /// not a valid feed.
    pub async fn fetch(&self,) -> Result<Vec<FeedEntry,>, Error,>
    {
        let mut request = self.http.get(self.url.clone(),);
        if let Some(token,) = &self.token {
            request = request.bearer_auth(token,);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::transport(format!("GET feed failed: {}", e.without_url()),),)?;

        let meta = ResponseMeta::from_lookup(response.status().as_u16(), |name| {
            response
                .headers()
                .get(name,)
                .and_then(|value| value.to_str().ok(),)
                .map(str::to_owned,)
        },);

        let body = response.text().await.map_err(|e| {
            Error::transport(format!("failed to read feed body: {}", e.without_url()),)
        },)?;

        if !meta.is_success() {
            return Err(classify_failure("GET feed", &meta, &body,),);
        }

        let entries = parse_feed(&body,)?;
        debug!("Parsed {} feed entries", entries.len());
        Ok(entries,)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq,)]
enum Field
{
    Title,
    Link,
    Published,
    Updated,
    Category,
}

#[derive(Debug, Default,)]
struct PendingEntry
{
    title:      String,
    html_title: bool,
    link:       Option<String,>,
    published:  String,
    updated:    String,
    categories: Vec<String,>,
    category:   String,
}

impl PendingEntry
{
    fn finish(self,) -> Option<FeedEntry,>
    {
        let title = clean_title(&self.title, self.html_title,);
        if title.is_empty() {
            return None;
        }

        let published = parse_timestamp(&self.published,).or_else(|| parse_timestamp(&self.updated,),);

        Some(FeedEntry {
            title,
            link: self
                .link
                .as_deref()
                .and_then(parse_web_link,)
                .map(String::from,),
            published,
            categories: self.categories,
        },)
    }

    fn push(&mut self, field: Field, text: &str,)
    {
        let target = match field {
            Field::Title => &mut self.title,
            Field::Link => self.link.get_or_insert_with(String::new,),
            Field::Published => &mut self.published,
            Field::Updated => &mut self.updated,
            Field::Category => &mut self.category,
        };
        target.push_str(text,);
    }
}

/// Parses an Atom or RSS document into entries, in document order.
///
/// Titles are whitespace-collapsed, and Atom titles declared `type="html"` are
/// also stripped of markup. Entries without a title are skipped. Links are
/// kept only when they parse as absolute `http`/`https` URLs. Timestamps are read as RFC 3339 (Atom) or RFC 2822
/// (RSS); Atom entries without `published` fall back to `updated`.
///
/// # Errors
///
/// Returns [`Error::Payload`] when the document is not well-formed XML or its
/// root element is neither `<feed>` nor `<rss>`/`<rdf:RDF>`.
///
/// # Examples
///
/// ```
/// use readme_stats::parse_feed;
///
/// let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom">
///   <entry>
///     <title>Released v1.0</title>
///     <link rel="alternate" href="https://example.com/v1"/>
///     <published>2025-01-02T03:04:05Z</published>
///   </entry>
/// </feed>"#;
///
/// let entries = parse_feed(xml)?;
/// assert_eq!(entries.len(), 1);
/// assert_eq!(entries[0].title, "Released v1.0");
/// assert_eq!(entries[0].link.as_deref(), Some("https://example.com/v1"));
/// # Ok::<(), readme_stats::Error>(())
/// ```
pub fn parse_feed(xml: &str,) -> Result<Vec<FeedEntry,>, Error,>
{
    let mut reader = Reader::from_str(xml,);
    reader.config_mut().trim_text(true,);

    let mut entries = Vec::new();
    let mut root_seen = false;
    let mut current: Option<PendingEntry,> = None;
    let mut field: Option<Field,> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| xml_error(&reader, e.to_string(),),)?;

        match event {
            Event::Start(element,) => {
                let name = element.local_name();
                let name = name.as_ref();
                if !root_seen {
                    check_root(name,)?;
                    root_seen = true;
                    continue;
                }
                if let Some(entry,) = current.as_mut() {
                    field = open_field(name, &element, entry,)?;
                } else if matches!(name, b"entry" | b"item") {
                    current = Some(PendingEntry::default(),);
                }
            }
            Event::Empty(element,) => {
                let name = element.local_name();
                let name = name.as_ref();
                if !root_seen {
                    check_root(name,)?;
                    root_seen = true;
                    continue;
                }
                if let Some(entry,) = current.as_mut() {
                    open_field(name, &element, entry,)?;
                }
            }
            Event::Text(text,) => {
                if let (Some(entry,), Some(active,),) = (current.as_mut(), field,) {
                    let text = text
                        .unescape()
                        .map_err(|e| xml_error(&reader, e.to_string(),),)?;
                    entry.push(active, &text,);
                }
            }
            Event::CData(data,) => {
                if let (Some(entry,), Some(active,),) = (current.as_mut(), field,) {
                    let text = std::str::from_utf8(&data,)
                        .map_err(|e| xml_error(&reader, e.to_string(),),)?;
                    entry.push(active, text,);
                }
            }
            Event::End(element,) => {
                let name = element.local_name();
                match name.as_ref() {
                    b"entry" | b"item" => {
                        field = None;
                        if let Some(entry,) = current.take().and_then(PendingEntry::finish,) {
                            entries.push(entry,);
                        }
                    }
                    b"category" => {
                        if let Some(entry,) = current.as_mut() {
                            let term = std::mem::take(&mut entry.category,);
                            let term = term.trim();
                            if !term.is_empty() {
                                entry.categories.push(term.to_owned(),);
                            }
                        }
                        field = None;
                    }
                    _ => field = None,
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !root_seen {
        return Err(Error::payload("feed document is empty",),);
    }

    Ok(entries,)
}

fn check_root(name: &[u8],) -> Result<(), Error,>
{
    match name {
        b"feed" | b"rss" | b"RDF" => Ok((),),
        other => Err(Error::payload(format!(
            "expected an Atom or RSS document, found <{}>",
            String::from_utf8_lossy(other)
        ),),),
    }
}

/// Handles an element inside an entry and returns the field its text feeds.
fn open_field(
    name: &[u8],
    element: &BytesStart<'_,>,
    entry: &mut PendingEntry,
) -> Result<Option<Field,>, Error,>
{
    let field = match name {
        b"title" => {
            let kind = attribute(element, "type",)?;
            entry.html_title = matches!(kind.as_deref(), Some("html" | "xhtml"));
            Some(Field::Title,)
        }
        b"published" | b"pubDate" | b"date" => Some(Field::Published,),
        b"updated" => Some(Field::Updated,),
        b"link" => match attribute(element, "href",)? {
            Some(href,) => {
                let rel = attribute(element, "rel",)?;
                let alternate = rel.as_deref().is_none_or(|rel| rel == "alternate",);
                if alternate && entry.link.is_none() {
                    entry.link = Some(href.trim().to_owned(),);
                }
                None
            }
            None if entry.link.is_none() => Some(Field::Link,),
            None => None,
        },
        b"category" => match attribute(element, "term",)? {
            Some(term,) => {
                let term = term.trim();
                if !term.is_empty() {
                    entry.categories.push(term.to_owned(),);
                }
                None
            }
            None => Some(Field::Category,),
        },
        _ => None,
    };
    Ok(field,)
}

fn attribute(element: &BytesStart<'_,>, name: &str,) -> Result<Option<String,>, Error,>
{
    let Some(attr,) = element
        .try_get_attribute(name,)
        .map_err(|e| Error::payload(format!("invalid feed attribute '{name}': {e}"),),)?
    else {
        return Ok(None,);
    };

    attr.unescape_value()
        .map(|value| Some(value.into_owned(),),)
        .map_err(|e| Error::payload(format!("invalid feed attribute '{name}': {e}"),),)
}

fn xml_error(reader: &Reader<&[u8],>, detail: String,) -> Error
{
    Error::payload(format!(
        "invalid feed XML at byte {}: {detail}",
        reader.buffer_position()
    ),)
}

fn clean_title(raw: &str, markup: bool,) -> String
{
    let text = if markup { TAG_PATTERN.replace_all(raw, "",) } else { Cow::Borrowed(raw,) };
    text.split_whitespace().collect::<Vec<_,>,>().join(" ",)
}

fn parse_timestamp(raw: &str,) -> Option<DateTime<Utc,>,>
{
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    DateTime::parse_from_rfc3339(raw,)
        .or_else(|_| DateTime::parse_from_rfc2822(raw,),)
        .map(|at| at.with_timezone(&Utc,),)
        .ok()
}
