// Copyright 2022 the varsieve developers.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Read evidence for variants, extracted from alignment pileups.

use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use anyhow::Result;
use csv::StringRecord;

use crate::coord::Locus;
use crate::variants::{parse_variant_row, Variant};

/// One alignment operation of a read: an opcode and a length.
#[derive(new, Debug, Clone, Copy, PartialEq, Eq)]
pub struct CigarOp {
    pub op: char,
    pub len: u32,
}

/// One read overlapping a pileup column.
#[derive(new, Debug, Clone)]
pub struct PileupRead {
    /// Whether the read carries a deletion at this column.
    pub is_del: bool,
    /// The aligned base of the read at this column, if any.
    pub base: Option<char>,
    /// The read's alignment operations, if derivable.
    pub cigar: Option<Vec<CigarOp>>,
}

/// A per-position summary of all reads aligned across one genomic
/// coordinate.
#[derive(new, Debug, Clone)]
pub struct PileupColumn {
    /// 0-based position of the column.
    pub pos: u64,
    /// Total number of reads covering the column.
    pub depth: u32,
    pub reads: Vec<PileupRead>,
}

/// A provider of per-position pileups, e.g. an indexed BAM file.
///
/// Implementations may hand back any columns overlapping the queried
/// window, neighbouring ones included; callers filter for the exact
/// position they asked about.
pub trait AlignmentSource {
    /// Pileup columns for the 0-based half-open window `[start, end)` of
    /// `chrom`.
    fn pileups(&mut self, chrom: &str, start: u64, end: u64) -> Result<Vec<PileupColumn>>;
}

/// Match count and coverage of one variant in one alignment source.
#[derive(new, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation {
    /// Number of non-deleted reads whose aligned base equals the variant
    /// base.
    pub matching: u32,
    /// Total number of reads covering the position.
    pub depth: u32,
}

/// All observations collected for one variant, one per alignment source,
/// in source-processing order.
#[derive(Getters, Debug)]
pub struct Evidence {
    #[getset(get = "pub")]
    variant: Variant,
    #[getset(get = "pub")]
    observations: Vec<Observation>,
}

/// Evidence per variant; iteration visits variants in coordinate order.
pub type EvidenceMap = BTreeMap<Locus, Evidence>;

/// Set up one empty evidence entry per parseable variant row.
///
/// Rows that do not parse (e.g. a title row) are dropped, and duplicate
/// loci collapse to a single entry, so each variant receives exactly one
/// observation per source later on.
pub fn init_evidence(rows: &[StringRecord]) -> EvidenceMap {
    let mut evidence = EvidenceMap::new();
    for row in rows {
        if let Some(variant) = parse_variant_row(row) {
            evidence.insert(
                variant.locus().clone(),
                Evidence {
                    variant,
                    observations: Vec::new(),
                },
            );
        }
    }
    evidence
}

/// Collect one observation per variant from each alignment source in turn.
pub fn gather_evidence<S: AlignmentSource>(
    rows: &[StringRecord],
    sources: &mut [S],
) -> Result<EvidenceMap> {
    let mut evidence = init_evidence(rows);
    for source in sources.iter_mut() {
        for entry in evidence.values_mut() {
            let observation = observe(&entry.variant, source)?;
            entry.observations.push(observation);
        }
    }
    Ok(evidence)
}

/// The pileup column at an exact 1-based position, if the source has one.
pub fn lookup_pileup<S: AlignmentSource>(
    source: &mut S,
    chrom: &str,
    pos: u64,
) -> Result<Option<PileupColumn>> {
    let start = match pos.checked_sub(1) {
        Some(start) => start,
        None => return Ok(None),
    };
    Ok(source
        .pileups(chrom, start, pos)?
        .into_iter()
        .find(|column| column.pos == start))
}

/// Count reads agreeing with the variant at its exact position, plus total
/// coverage, in one alignment source. A missing column counts as zero
/// coverage, zero match.
pub fn observe<S: AlignmentSource>(variant: &Variant, source: &mut S) -> Result<Observation> {
    let column = lookup_pileup(source, variant.locus().chrom(), variant.locus().pos())?;
    Ok(match column {
        Some(column) => {
            let matching = column
                .reads
                .iter()
                .filter(|read| !read.is_del && read.base == Some(variant.var_base()))
                .count() as u32;
            Observation::new(matching, column.depth)
        }
        None => Observation::new(0, 0),
    })
}

/// Aligned-length bounds (inclusive) of the short and long read classes.
pub const SHORT_READ_LENGTHS: RangeInclusive<u64> = 20..=35;
pub const LONG_READ_LENGTHS: RangeInclusive<u64> = 40..=50;

/// Numbers of short and long reads supporting a variant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadLengthCounts {
    pub short: u32,
    pub long: u32,
}

impl ReadLengthCounts {
    /// A variant seen only on anomalously short reads is a bias candidate.
    pub fn is_biased(&self) -> bool {
        self.short > 0 && self.long == 0
    }
}

/// Total aligned length of a read: the sum of all its alignment operation
/// lengths. `None` if the read has no derivable alignment shape.
fn aligned_length(read: &PileupRead) -> Option<u64> {
    read.cigar
        .as_ref()
        .filter(|ops| !ops.is_empty())
        .map(|ops| ops.iter().map(|op| u64::from(op.len)).sum())
}

/// Classify the reads supporting `variant` in one source by aligned length.
///
/// Reads outside both length classes, or with no derivable length, are
/// skipped with a warning and counted in neither class.
pub fn count_read_lengths<S: AlignmentSource>(
    variant: &Variant,
    source: &mut S,
) -> Result<ReadLengthCounts> {
    let mut counts = ReadLengthCounts::default();
    let column = match lookup_pileup(source, variant.locus().chrom(), variant.locus().pos())? {
        Some(column) => column,
        None => {
            warn!("could not find pileup for variant {}", variant.locus());
            return Ok(counts);
        }
    };
    for read in &column.reads {
        if read.is_del || read.base != Some(variant.var_base()) {
            continue;
        }
        match aligned_length(read) {
            Some(len) if SHORT_READ_LENGTHS.contains(&len) => counts.short += 1,
            Some(len) if LONG_READ_LENGTHS.contains(&len) => counts.long += 1,
            Some(len) => warn!(
                "read of length {} supporting variant {} is neither short nor long, skipping",
                len,
                variant.locus()
            ),
            None => warn!(
                "could not determine the length of a read supporting variant {}, skipping",
                variant.locus()
            ),
        }
    }
    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classification::{classify_by_rate, Action, RateThresholds};

    struct FakeSource {
        columns: Vec<PileupColumn>,
    }

    impl AlignmentSource for FakeSource {
        fn pileups(&mut self, _chrom: &str, _start: u64, _end: u64) -> Result<Vec<PileupColumn>> {
            Ok(self.columns.clone())
        }
    }

    fn variant(chrom_code: &str, pos: u64, polymorphism: &str) -> Variant {
        let row = StringRecord::from(vec![format!("{},{},1,{}", chrom_code, pos, polymorphism)]);
        parse_variant_row(&row).unwrap()
    }

    fn read(base: char, len: u32) -> PileupRead {
        PileupRead::new(false, Some(base), Some(vec![CigarOp::new('M', len)]))
    }

    #[test]
    fn only_the_exact_position_column_contributes() {
        // the provider hands back neighbouring columns as well
        let mut source = FakeSource {
            columns: vec![
                PileupColumn::new(98, 7, vec![read('A', 50); 7]),
                PileupColumn::new(99, 3, vec![read('A', 50); 3]),
                PileupColumn::new(100, 9, vec![read('A', 50); 9]),
            ],
        };
        let observation = observe(&variant("1", 100, "G/A"), &mut source).unwrap();
        assert_eq!(observation, Observation::new(3, 3));
    }

    #[test]
    fn missing_column_counts_as_zero_evidence() {
        let mut source = FakeSource {
            columns: vec![PileupColumn::new(42, 5, vec![read('A', 50); 5])],
        };
        let observation = observe(&variant("1", 100, "G/A"), &mut source).unwrap();
        assert_eq!(observation, Observation::new(0, 0));
    }

    #[test]
    fn deletions_and_mismatches_do_not_match() {
        let reads = vec![
            read('A', 50),
            PileupRead::new(true, Some('A'), Some(vec![CigarOp::new('M', 50)])),
            read('C', 50),
            PileupRead::new(false, None, None),
        ];
        let mut source = FakeSource {
            columns: vec![PileupColumn::new(99, 4, reads)],
        };
        let observation = observe(&variant("1", 100, "G/A"), &mut source).unwrap();
        assert_eq!(observation, Observation::new(1, 4));
    }

    #[test]
    fn duplicate_rows_collapse_to_one_entry() {
        let rows = vec![
            StringRecord::from(vec!["1,100,1,G/A"]),
            StringRecord::from(vec!["1,100,1,G/A"]),
        ];
        let evidence = init_evidence(&rows);
        assert_eq!(evidence.len(), 1);
    }

    #[test]
    fn evidence_is_appended_in_source_order() {
        let rows = vec![StringRecord::from(vec!["1,100,1,G/A"])];
        let mut sources = vec![
            FakeSource {
                columns: vec![PileupColumn::new(99, 5, vec![read('A', 50); 3])],
            },
            FakeSource {
                columns: vec![PileupColumn::new(99, 4, vec![read('C', 50); 4])],
            },
        ];
        let evidence = gather_evidence(&rows, &mut sources).unwrap();
        let entry = evidence.values().next().unwrap();
        assert_eq!(
            entry.observations(),
            &vec![Observation::new(3, 5), Observation::new(0, 4)]
        );
        // two samples, one positive at T=1: 1 * 100 / 2 = 50 >= 50 bins
        let classification = classify_by_rate(entry.observations(), RateThresholds::new(1, 50));
        assert_eq!(classification.action, Action::Bin);
    }

    #[test]
    fn read_lengths_fall_into_short_and_long_classes() {
        let reads = vec![
            read('A', 35),
            read('A', 20),
            read('A', 50),
            read('A', 38),                                 // between the classes
            PileupRead::new(false, Some('A'), None),       // no alignment shape
            PileupRead::new(false, Some('A'), Some(vec![])),
            read('C', 35),                                 // wrong base
        ];
        let mut source = FakeSource {
            columns: vec![PileupColumn::new(99, 7, reads)],
        };
        let counts = count_read_lengths(&variant("1", 100, "G/A"), &mut source).unwrap();
        assert_eq!(counts, ReadLengthCounts { short: 2, long: 1 });
        assert!(!counts.is_biased());
    }

    #[test]
    fn short_only_support_is_a_bias_candidate() {
        let mut source = FakeSource {
            columns: vec![PileupColumn::new(99, 2, vec![read('A', 35), read('A', 22)])],
        };
        let counts = count_read_lengths(&variant("1", 100, "G/A"), &mut source).unwrap();
        assert!(counts.is_biased());
    }

    #[test]
    fn no_pileup_means_no_bias_candidate() {
        let mut source = FakeSource { columns: vec![] };
        let counts = count_read_lengths(&variant("1", 100, "G/A"), &mut source).unwrap();
        assert_eq!(counts, ReadLengthCounts::default());
        assert!(!counts.is_biased());
    }

    #[test]
    fn multi_cigar_reads_sum_their_operation_lengths() {
        let cigar = vec![
            CigarOp::new('M', 18),
            CigarOp::new('I', 2),
            CigarOp::new('M', 15),
        ];
        let reads = vec![PileupRead::new(false, Some('A'), Some(cigar))];
        let mut source = FakeSource {
            columns: vec![PileupColumn::new(99, 1, reads)],
        };
        let counts = count_read_lengths(&variant("1", 100, "G/A"), &mut source).unwrap();
        assert_eq!(counts, ReadLengthCounts { short: 1, long: 0 });
    }
}
