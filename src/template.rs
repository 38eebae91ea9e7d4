// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Marker-delimited template rendering.
//!
//! A document is split into literal text and regions delimited by
//! `<!--START:NAME-->` and `<!--END:NAME-->`. Rendering rebuilds the document
//! segment by segment, replacing only the interior of regions whose name is
//! registered in [`MARKERS`]. Markers themselves and everything outside them
//! are copied unchanged, which makes rendering idempotent.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::{
    aggregate::{PLACEHOLDER, keys},
    error::Error,
    stats::{StatTable, StatValue, Stats, format_integer},
};

const START_SENTINEL: &str = "<!--START:";
const END_SENTINEL: &str = "<!--END:";

static START_MARKER: LazyLock<Regex,> = LazyLock::new(|| {
    Regex::new(r"<!--START:([A-Za-z0-9_]+)-->",).expect("start marker pattern is valid",)
},);

/// How a statistic is laid out between its markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq,)]
pub enum Layout
{
    /// Bare value on the marker line.
    Inline,
    /// Markdown bullet list on its own lines.
    List,
    /// Markdown table on its own lines.
    Table,
}

/// Registered marker and the statistic it renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq,)]
pub struct MarkerTemplate
{
    /// Marker name, matched exactly.
    pub name:   &'static str,
    /// Statistic key looked up in [`Stats`].
    pub key:    &'static str,
    /// Layout of the rendered value.
    pub layout: Layout,
}

const fn marker(name: &'static str, key: &'static str, layout: Layout,) -> MarkerTemplate
{
    MarkerTemplate {
        name,
        key,
        layout,
    }
}

/// Markers recognized by the renderer.
pub const MARKERS: &[MarkerTemplate] = &[
    marker("STARS", keys::TOTAL_STARS, Layout::Inline,),
    marker("TOTAL_STARS", keys::TOTAL_STARS, Layout::Inline,),
    marker("FORKS", keys::TOTAL_FORKS, Layout::Inline,),
    marker("TOTAL_FORKS", keys::TOTAL_FORKS, Layout::Inline,),
    marker("REPOS", keys::REPO_COUNT, Layout::Inline,),
    marker("REPO_COUNT", keys::REPO_COUNT, Layout::Inline,),
    marker("ARCHIVED", keys::ARCHIVED_COUNT, Layout::Inline,),
    marker("ARCHIVED_COUNT", keys::ARCHIVED_COUNT, Layout::Inline,),
    marker("LANGUAGE", keys::TOP_LANGUAGE, Layout::Inline,),
    marker("TOP_LANGUAGE", keys::TOP_LANGUAGE, Layout::Inline,),
    marker("TOP_LANGUAGES", keys::TOP_LANGUAGES, Layout::List,),
    marker("LANGUAGES", keys::LANGUAGES, Layout::Table,),
    marker("MOST_STARRED", keys::MOST_STARRED, Layout::Inline,),
    marker("TOP_REPOSITORIES", keys::TOP_REPOSITORIES, Layout::Table,),
    marker("TOP_TOPICS", keys::TOP_TOPICS, Layout::List,),
    marker("LAST_UPDATED", keys::LAST_UPDATED, Layout::Inline,),
    marker("COMMITS", keys::COMMITS, Layout::Inline,),
    marker("LOC_ADD", keys::LOC_ADD, Layout::Inline,),
    marker("LOC_DEL", keys::LOC_DEL, Layout::Inline,),
    marker("LOC_TOTAL", keys::LOC_TOTAL, Layout::Inline,),
    marker("NAME", keys::NAME, Layout::Inline,),
    marker("FOLLOWERS", keys::FOLLOWERS, Layout::Inline,),
    marker("FOLLOWING", keys::FOLLOWING, Layout::Inline,),
    marker("PUBLIC_REPOS", keys::PUBLIC_REPOS, Layout::Inline,),
    marker("PUBLIC_GISTS", keys::PUBLIC_GISTS, Layout::Inline,),
    marker("MEMBER_SINCE", keys::MEMBER_SINCE, Layout::Inline,),
    marker("ACTIVITY", keys::RECENT_ACTIVITY, Layout::List,),
    marker("RECENT_ACTIVITY", keys::RECENT_ACTIVITY, Layout::List,),
    marker("TOP_CATEGORIES", keys::TOP_CATEGORIES, Layout::List,),
    marker("AGE", keys::AGE, Layout::Inline,),
];

/// Returns the registered template for a marker name.
pub fn lookup_marker(name: &str,) -> Option<&'static MarkerTemplate,>
{
    MARKERS.iter().find(|template| template.name == name,)
}

/// Piece of a parsed document.
#[derive(Debug, Clone, Copy, PartialEq, Eq,)]
pub enum Segment<'a,>
{
    /// Text outside any matched marker pair.
    Literal(&'a str,),
    /// Matched marker pair and its interior.
    Region(Region<'a,>,),
}

/// Matched `START`/`END` marker pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq,)]
pub struct Region<'a,>
{
    /// Marker name shared by both sentinels.
    pub name:     &'a str,
    /// Start sentinel as written.
    pub start:    &'a str,
    /// Text strictly between the sentinels.
    pub interior: &'a str,
    /// End sentinel as written.
    pub end:      &'a str,
}

/// Splits `document` into literal and region segments.
///
/// A start marker without a matching end marker is kept as literal text, and
/// so is a start marker whose interior would contain another sentinel.
/// Concatenating the segments reproduces `document` exactly.
///
/// # Examples
///
/// ```
/// use readme_stats::{Segment, parse_segments};
///
/// let segments = parse_segments("a<!--START:STARS-->1<!--END:STARS-->b");
/// assert_eq!(segments.len(), 3);
/// assert_eq!(segments[0], Segment::Literal("a"));
/// assert!(matches!(segments[1], Segment::Region(region) if region.interior == "1"));
/// ```
pub fn parse_segments(document: &str,) -> Vec<Segment<'_,>,>
{
    let mut segments = Vec::new();
    let mut literal_start = 0;
    let mut cursor = 0;

    while let Some(captures,) = START_MARKER.captures_at(document, cursor,) {
        let (Some(start,), Some(name,),) = (captures.get(0,), captures.get(1,),) else {
            break;
        };

        let end_marker = format!("<!--END:{}-->", name.as_str());
        let Some(offset,) = document[start.end()..].find(&end_marker,) else {
            cursor = start.end();
            continue;
        };

        let end_start = start.end() + offset;
        let end_stop = end_start + end_marker.len();

        // Innermost pair wins: an outer start that encloses other sentinels
        // stays literal.
        if contains_sentinel(&document[start.end()..end_start],) {
            cursor = start.end();
            continue;
        }

        if literal_start < start.start() {
            segments.push(Segment::Literal(&document[literal_start..start.start()],),);
        }
        segments.push(Segment::Region(Region {
            name:     name.as_str(),
            start:    start.as_str(),
            interior: &document[start.end()..end_start],
            end:      &document[end_start..end_stop],
        },),);

        literal_start = end_stop;
        cursor = end_stop;
    }

    if literal_start < document.len() {
        segments.push(Segment::Literal(&document[literal_start..],),);
    }

    segments
}

/// Renders `stats` into every recognized marker region of `document`.
///
/// # Errors
///
/// Returns [`Error::IncompleteData`] when a recognized marker refers to a key
/// missing from `stats`, and [`Error::Payload`] when a rendered value would
/// itself contain a `<!--START:` or `<!--END:` sentinel. No partial output is
/// produced in either case.
///
/// # Examples
///
/// ```
/// use readme_stats::{StatRecord, StatValue, Stats, render};
///
/// let stats: Stats = [StatRecord::new("total_stars", StatValue::Integer(42))]
///     .into_iter()
///     .collect();
/// let rendered = render("<!--START:STARS--><!--END:STARS-->", &stats)?;
/// assert_eq!(rendered, "<!--START:STARS-->42<!--END:STARS-->");
/// # Ok::<(), readme_stats::Error>(())
/// ```
pub fn render(document: &str, stats: &Stats,) -> Result<String, Error,>
{
    let mut output = String::with_capacity(document.len(),);

    for segment in parse_segments(document,) {
        match segment {
            Segment::Literal(text,) => output.push_str(text,),
            Segment::Region(region,) => {
                output.push_str(region.start,);
                match lookup_marker(region.name,) {
                    Some(template,) => {
                        let value =
                            stats
                                .get(template.key,)
                                .ok_or_else(|| Error::IncompleteData {
                                    marker: region.name.to_owned(),
                                    key:    template.key.to_owned(),
                                },)?;
                        let rendered = render_value(value, template.layout,);
                        if contains_sentinel(&rendered,) {
                            return Err(Error::payload(format!(
                                "statistic {} rendered into marker {} contains a marker sentinel",
                                template.key, region.name
                            ),),);
                        }
                        output.push_str(&rendered,);
                    }
                    None => {
                        debug!("Leaving unrecognized marker {} untouched", region.name);
                        output.push_str(region.interior,);
                    }
                }
                output.push_str(region.end,);
            }
        }
    }

    Ok(output,)
}

/// Names of recognized markers present in `document`, in document order.
pub fn recognized_markers(document: &str,) -> Vec<&str,>
{
    parse_segments(document,)
        .into_iter()
        .filter_map(|segment| match segment {
            Segment::Region(region,) if lookup_marker(region.name,).is_some() => Some(region.name,),
            _ => None,
        },)
        .collect()
}

fn contains_sentinel(text: &str,) -> bool
{
    text.contains(START_SENTINEL,) || text.contains(END_SENTINEL,)
}

fn render_value(value: &StatValue, layout: Layout,) -> String
{
    match layout {
        Layout::Inline => inline(value,),
        Layout::List => format!("\n{}\n", bullet_list(value)),
        Layout::Table => format!("\n{}\n", markdown_table(value)),
    }
}

fn inline(value: &StatValue,) -> String
{
    let joined = match value {
        StatValue::Integer(number,) => return format_integer(*number,),
        StatValue::Text(text,) => return text.clone(),
        StatValue::List(items,) => items.join(", ",),
        StatValue::Table(table,) => table
            .rows
            .iter()
            .filter_map(|row| row.first().cloned(),)
            .collect::<Vec<_,>,>()
            .join(", ",),
    };

    if joined.is_empty() { PLACEHOLDER.to_owned() } else { joined }
}

fn bullet_list(value: &StatValue,) -> String
{
    let items: Vec<String,> = match value {
        StatValue::Integer(number,) => vec![format_integer(*number)],
        StatValue::Text(text,) => vec![text.clone()],
        StatValue::List(items,) => items.clone(),
        StatValue::Table(table,) => table.rows.iter().map(|row| row.join(" · ",),).collect(),
    };

    if items.is_empty() {
        return format!("- {PLACEHOLDER}");
    }

    items
        .iter()
        .map(|item| format!("- {item}"),)
        .collect::<Vec<_,>,>()
        .join("\n",)
}

fn markdown_table(value: &StatValue,) -> String
{
    let single = |cell: String| StatTable {
        header: vec!["Value".to_owned()],
        rows:   vec![vec![cell]],
    };

    let table = match value {
        StatValue::Integer(number,) => single(format_integer(*number,),),
        StatValue::Text(text,) => single(text.clone(),),
        StatValue::List(items,) => StatTable {
            header: vec!["Value".to_owned()],
            rows:   items.iter().map(|item| vec![item.clone()],).collect(),
        },
        StatValue::Table(table,) => table.clone(),
    };

    let columns = table.header.len().max(1,);
    let mut lines = Vec::with_capacity(table.rows.len() + 2,);
    lines.push(table_row(&table.header, columns,),);
    lines.push(format!("|{}", " --- |".repeat(columns)),);

    if table.rows.is_empty() {
        lines.push(table_row(&vec![PLACEHOLDER.to_owned(); columns], columns,),);
    }
    for row in &table.rows {
        lines.push(table_row(row, columns,),);
    }

    lines.join("\n",)
}

fn table_row(cells: &[String], columns: usize,) -> String
{
    let mut row = String::from("|",);
    for index in 0..columns {
        let cell = cells.get(index,).map(String::as_str,).unwrap_or("",);
        row.push(' ',);
        row.push_str(&escape_cell(cell,),);
        row.push_str(" |",);
    }
    row
}

fn escape_cell(cell: &str,) -> String
{
    cell.replace('|', "\\|",).replace(['\r', '\n',], " ",)
}
