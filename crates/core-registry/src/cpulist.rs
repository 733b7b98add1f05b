// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The kernel's cpu-list syntax.
//!
//! Used by `/sys/devices/system/cpu/{present,online,possible}` and by the
//! `Cpus_allowed_list` line of `/proc/<pid>/status`:
//!
//! ```text
//! "0-3"      → {0, 1, 2, 3}
//! "0,2-3"    → {0, 2, 3}
//! "0-1,6"    → {0, 1, 6}
//! ```

use crate::CoreId;
use std::collections::BTreeSet;

/// Parses a cpu-list string into an ordered set of cores.
///
/// Returns `None` for empty input, malformed ranges, or a range whose end
/// precedes its start.
pub fn parse(s: &str) -> Option<BTreeSet<CoreId>> {
    let mut cores = BTreeSet::new();
    for part in s.trim().split(',') {
        let part = part.trim();
        if let Some((start_s, end_s)) = part.split_once('-') {
            let start: u32 = start_s.trim().parse().ok()?;
            let end: u32 = end_s.trim().parse().ok()?;
            if end < start {
                return None;
            }
            cores.extend((start..=end).map(CoreId::new));
        } else {
            let single: u32 = part.parse().ok()?;
            cores.insert(CoreId::new(single));
        }
    }
    if cores.is_empty() {
        None
    } else {
        Some(cores)
    }
}

/// Formats cores back into compact cpu-list syntax, collapsing runs.
pub fn format<'a>(cores: impl IntoIterator<Item = &'a CoreId>) -> String {
    let mut ids: Vec<u32> = cores.into_iter().map(|c| c.index()).collect();
    ids.sort_unstable();
    ids.dedup();

    let mut parts = Vec::new();
    let mut iter = ids.into_iter().peekable();
    while let Some(start) = iter.next() {
        let mut end = start;
        while iter.peek() == Some(&(end + 1)) {
            end += 1;
            iter.next();
        }
        if start == end {
            parts.push(start.to_string());
        } else {
            parts.push(format!("{start}-{end}"));
        }
    }
    parts.join(",")
}
