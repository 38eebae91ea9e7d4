// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Computed statistics handed from the aggregator to the renderer.

use std::collections::BTreeMap;

use serde::Serialize;

/// Display-ready value of a single statistic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize,)]
#[serde(untagged)]
pub enum StatValue
{
    /// Counter rendered with thousands separators.
    Integer(i64,),
    /// Free-form text.
    Text(String,),
    /// Ordered list of preformatted items.
    List(Vec<String,>,),
    /// Table with a header row.
    Table(StatTable,),
}

/// Tabular statistic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize,)]
pub struct StatTable
{
    /// Column titles.
    pub header: Vec<String,>,
    /// Rows; each row has one cell per header column.
    pub rows:   Vec<Vec<String,>,>,
}

/// Named statistic produced by the aggregator.
#[derive(Debug, Clone, PartialEq, Eq,)]
pub struct StatRecord
{
    /// Lookup key, e.g. `total_stars`.
    pub key:   String,
    /// Computed value.
    pub value: StatValue,
}

impl StatRecord
{
    /// Creates a record from a key and value.
    pub fn new<K,>(key: K, value: StatValue,) -> Self
    where
        K: Into<String,>,
    {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// Mapping of statistic keys to values, ordered by key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize,)]
#[serde(transparent)]
pub struct Stats
{
    records: BTreeMap<String, StatValue,>,
}

impl Stats
{
    /// Inserts a record, replacing any previous value under the same key.
    pub fn insert(&mut self, record: StatRecord,)
    {
        self.records.insert(record.key, record.value,);
    }

    /// Returns the value stored under `key`.
    pub fn get(&self, key: &str,) -> Option<&StatValue,>
    {
        self.records.get(key,)
    }

    /// Removes and returns the value stored under `key`.
    pub fn remove(&mut self, key: &str,) -> Option<StatValue,>
    {
        self.records.remove(key,)
    }

    /// Returns `true` when `key` has a value.
    pub fn contains(&self, key: &str,) -> bool
    {
        self.records.contains_key(key,)
    }

    /// Number of statistics.
    pub fn len(&self,) -> usize
    {
        self.records.len()
    }

    /// Returns `true` when no statistic was computed.
    pub fn is_empty(&self,) -> bool
    {
        self.records.is_empty()
    }
}

impl FromIterator<StatRecord,> for Stats
{
    fn from_iter<I,>(iter: I,) -> Self
    where
        I: IntoIterator<Item = StatRecord,>,
    {
        let mut stats = Self::default();
        for record in iter {
            stats.insert(record,);
        }
        stats
    }
}

/// Formats an integer with comma thousands separators.
///
/// # Examples
///
/// ```
/// use readme_stats::format_integer;
///
/// assert_eq!(format_integer(42), "42");
/// assert_eq!(format_integer(1234567), "1,234,567");
/// assert_eq!(format_integer(-1200), "-1,200");
/// ```
pub fn format_integer(value: i64,) -> String
{
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1,);

    if value < 0 {
        grouped.push('-',);
    }

    for (index, digit,) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',',);
        }
        grouped.push(digit,);
    }

    grouped
}
