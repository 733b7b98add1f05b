// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Interrupt volume for a network interface, from `/proc/interrupts`.
//!
//! ```text
//!            CPU0       CPU1
//!  24:     120345       8812   PCI-MSI 524288-edge      eno1-TxRx-0
//!  25:      40001      91002   PCI-MSI 524289-edge      eno1-TxRx-1
//! NMI:          0          0   Non-maskable interrupts
//! ```
//!
//! Every IRQ line whose description mentions the interface contributes the
//! sum of its per-CPU columns. The count is cumulative since boot.

use crate::sysfs::read_trimmed;
use crate::AcquisitionError;
use std::path::Path;

/// Reads `interrupts` under the given procfs root and totals the lines
/// attributed to `interface`.
pub fn read_irq_count(proc_root: &Path, interface: &str) -> Result<u64, AcquisitionError> {
    let path = proc_root.join("interrupts");
    let content = read_trimmed(&path)?;
    parse_irq_count(&content, interface).ok_or_else(|| AcquisitionError::InterfaceNotFound {
        interface: interface.to_string(),
    })
}

/// Totals the per-CPU counts of every line mentioning `interface`.
///
/// Returns `None` if no line matches.
pub(crate) fn parse_irq_count(content: &str, interface: &str) -> Option<u64> {
    let mut lines = content.lines();
    let cpu_columns = lines
        .next()?
        .split_whitespace()
        .filter(|h| h.starts_with("CPU"))
        .count();

    let mut matched = false;
    let mut total = 0u64;
    for line in lines {
        let Some((_, rest)) = line.split_once(':') else {
            continue;
        };
        let mut fields = rest.split_whitespace();
        let counts: Vec<u64> = fields
            .by_ref()
            .take(cpu_columns)
            .map_while(|f| f.parse().ok())
            .collect();
        let description: Vec<&str> = fields.collect();
        if description.iter().any(|token| token.contains(interface)) {
            matched = true;
            total = total.saturating_add(counts.iter().sum());
        }
    }
    matched.then_some(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sysfs::testutil::{fixture_dir, write_file};

    const INTERRUPTS: &str = "\
           CPU0       CPU1
  0:         31          0   IO-APIC   2-edge      timer
 24:     120345       8812   PCI-MSI 524288-edge      eno1-TxRx-0
 25:      40001      91002   PCI-MSI 524289-edge      eno1-TxRx-1
 26:          7          3   PCI-MSI 524290-edge      eno1
 30:        500        500   PCI-MSI 1048576-edge      wlp2s0
NMI:          0          0   Non-maskable interrupts
ERR:          0
";

    #[test]
    fn test_sums_all_columns_of_matching_lines() {
        let total = parse_irq_count(INTERRUPTS, "eno1").unwrap();
        assert_eq!(total, 120345 + 8812 + 40001 + 91002 + 7 + 3);
    }

    #[test]
    fn test_other_interface() {
        assert_eq!(parse_irq_count(INTERRUPTS, "wlp2s0"), Some(1000));
    }

    #[test]
    fn test_unknown_interface() {
        assert_eq!(parse_irq_count(INTERRUPTS, "eth9"), None);
    }

    #[test]
    fn test_short_rows_do_not_match_counts() {
        // "ERR:" has a single column and no description.
        assert_eq!(parse_irq_count(INTERRUPTS, "ERR"), None);
    }

    #[test]
    fn test_read_from_fixture() {
        let dir = fixture_dir("irq");
        write_file(&dir, "interrupts", INTERRUPTS);
        assert_eq!(read_irq_count(&dir, "wlp2s0").unwrap(), 1000);
        assert!(matches!(
            read_irq_count(&dir, "eth9"),
            Err(AcquisitionError::InterfaceNotFound { .. })
        ));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
