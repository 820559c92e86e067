// dnslink – resolution of DNSLink records
// Copyright © 2022–2023 David Bürgin <dbuergin@gluet.ch>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, either version 3 of the License, or (at your option) any later
// version.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more
// details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.

//! Link sets and aggregation of DNSLink entries.

use crate::{entry::ParsedEntry, log::LogEntry};

/// A value found for some key, with the TTL of the TXT record it came from.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Link {
    pub value: String,
    pub ttl: u32,
}

/// A link rendered in the normalised form `/key/value`, as it would appear
/// after `dnslink=` in a TXT record.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct NormalizedLink {
    pub value: String,
    pub ttl: u32,
}

/// A set of links, mapping keys to their values.
///
/// Keys appear in the order they were first seen. The values of each key are
/// distinct and sorted lexicographically; the first value is the *primary*
/// value of the key.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct LinkSet(Vec<(String, Vec<Link>)>);

impl LinkSet {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of keys.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get_all(key).is_some()
    }

    /// Returns the primary value of the given key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.get_all(key)
            .and_then(|links| links.first())
            .map(|link| link.value.as_str())
    }

    /// Returns all values of the given key.
    pub fn get_all(&self, key: &str) -> Option<&[Link]> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, links)| links.as_slice())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Link])> {
        self.0.iter().map(|(k, links)| (k.as_str(), links.as_slice()))
    }

    pub fn remove(&mut self, key: &str) -> Option<Vec<Link>> {
        let i = self.0.iter().position(|(k, _)| k == key)?;
        Some(self.0.remove(i).1)
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    fn push(&mut self, key: &str, link: Link) {
        match self.0.iter_mut().find(|(k, _)| k == key) {
            Some((_, links)) => links.push(link),
            None => self.0.push((key.into(), vec![link])),
        }
    }
}

/// The outcome of aggregating DNSLink entries.
#[derive(Debug, Default, PartialEq)]
pub struct Aggregate {
    pub links: LinkSet,
    /// The entries that made it into `links`, in the same order.
    pub entries: Vec<ParsedEntry>,
    /// Log entries for the conflicts found.
    pub conflicts: Vec<LogEntry>,
}

/// Groups the given entries by key.
///
/// All distinct values of a key are kept, sorted lexicographically, so that
/// the smallest value becomes the primary value. Each further value of a key
/// is reported as a conflict but retained. Exact duplicates of a key and value
/// are reported as a conflict and dropped, keeping the lowest TTL.
pub fn aggregate(entries: Vec<ParsedEntry>) -> Aggregate {
    let mut groups: Vec<(String, Vec<ParsedEntry>)> = vec![];

    for entry in entries {
        match groups.iter_mut().find(|(k, _)| *k == entry.key) {
            Some((_, group)) => group.push(entry),
            None => groups.push((entry.key.clone(), vec![entry])),
        }
    }

    let mut result = Aggregate::default();

    for (key, mut group) in groups {
        group.sort_by(|a, b| a.value.cmp(&b.value).then(a.ttl.cmp(&b.ttl)));

        let mut last_value: Option<String> = None;

        for (i, entry) in group.into_iter().enumerate() {
            if i > 0 {
                result.conflicts.push(LogEntry::ConflictEntry {
                    entry: entry.source.clone(),
                });
            }

            if last_value.as_ref() == Some(&entry.value) {
                continue;
            }
            last_value = Some(entry.value.clone());

            result.links.push(
                &key,
                Link {
                    value: entry.value.clone(),
                    ttl: entry.ttl,
                },
            );
            result.entries.push(entry);
        }
    }

    result
}
