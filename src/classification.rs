// Copyright 2022 the varsieve developers.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Keep-or-bin policies applied to variant evidence.
//!
//! Two policies coexist on purpose: the occurrence-rate rule answers
//! "is this variant too common across unrelated samples", the
//! family-presence rule answers "does any relative carry it at all".
//! They must not be merged.

use crate::variants::evidence::Observation;

/// Outcome of classifying one variant.
#[derive(Display, Debug, Clone, Copy, PartialEq, Eq)]
#[strum(serialize_all = "lowercase")]
pub enum Action {
    Bin,
    Keep,
}

/// An action together with a human-readable justification.
#[derive(new, Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub action: Action,
    pub reason: String,
}

/// Thresholds of the occurrence-rate classifier.
#[derive(new, Debug, Clone, Copy)]
pub struct RateThresholds {
    /// Minimum match count for a sample to count as positive.
    pub min_match_count: u32,
    /// Percentage of positive samples at which a variant is binned.
    pub samples_percent: u64,
}

/// Bin a variant that occurs in too many samples; keep a rare one.
///
/// The rate is computed with truncating integer division: one positive
/// sample out of three compares as 33 against the percentage threshold.
pub fn classify_by_rate(
    observations: &[Observation],
    thresholds: RateThresholds,
) -> Classification {
    let total = observations.len() as u64;
    if total == 0 {
        return Classification::new(Action::Bin, "zero samples to compare with".to_owned());
    }
    let positive = observations
        .iter()
        .filter(|observation| observation.matching >= thresholds.min_match_count)
        .count() as u64;
    let rate = positive * 100 / total;
    if rate >= thresholds.samples_percent {
        Classification::new(
            Action::Bin,
            format!(
                "(positive samples(={}) * 100 / total samples(={})) >= samples percent(={})",
                positive, total, thresholds.samples_percent
            ),
        )
    } else {
        Classification::new(
            Action::Keep,
            format!(
                "(positive samples(={}) * 100 / total samples(={})) < samples percent(={})",
                positive, total, thresholds.samples_percent
            ),
        )
    }
}

/// Family-presence rule: a variant is in the family if any read in any
/// sample matches it.
pub fn seen_in_family(observations: &[Observation]) -> bool {
    observations
        .iter()
        .map(|observation| u64::from(observation.matching))
        .sum::<u64>()
        > 0
}
