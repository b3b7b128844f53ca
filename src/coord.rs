// Copyright 2022 the varsieve developers.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Genomic coordinates and their ordering.

use std::cmp::Ordering;
use std::fmt;

/// Prefix used to build chromosome names from the bare codes found in
/// variant lists.
pub const CHROM_PREFIX: &str = "chr";

/// A 1-based position on a named chromosome.
///
/// The `Ord` implementation yields the order used for all reported output:
/// chromosomes with numeric codes sort before non-numeric ones, numeric
/// codes compare by value, non-numeric codes lexicographically, and
/// positions numerically within a chromosome.
#[derive(new, Getters, CopyGetters, Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locus {
    #[getset(get = "pub")]
    chrom: String,
    #[getset(get_copy = "pub")]
    pos: u64,
}

impl Locus {
    /// The chromosome code: the label with the fixed prefix stripped.
    fn code(&self) -> &str {
        self.chrom.strip_prefix(CHROM_PREFIX).unwrap_or(&self.chrom)
    }
}

impl fmt::Display for Locus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.chrom, self.pos)
    }
}

fn numeric_code(code: &str) -> Option<u64> {
    if !code.is_empty() && code.bytes().all(|b| b.is_ascii_digit()) {
        code.parse().ok()
    } else {
        None
    }
}

/// Codes that are numeric strings compare by value (so leading zeros do not
/// reorder them); a numeric code always sorts before a non-numeric one.
fn compare_codes(a: &str, b: &str) -> Ordering {
    match (numeric_code(a), numeric_code(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

impl Ord for Locus {
    fn cmp(&self, other: &Self) -> Ordering {
        if self.chrom == other.chrom {
            self.pos.cmp(&other.pos)
        } else {
            // distinct labels can share a code; break ties so that the
            // order stays consistent with Eq
            compare_codes(self.code(), other.code())
                .then_with(|| self.chrom.cmp(&other.chrom))
                .then_with(|| self.pos.cmp(&other.pos))
        }
    }
}

impl PartialOrd for Locus {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
