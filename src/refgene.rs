// Copyright 2022 the varsieve developers.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Gene-structure features built from a UCSC refGene table.
//!
//! All refGene coordinates are reported on the forward strand with 0-based
//! starts and 1-based ends, whatever strand the transcript lives on. The
//! features built here keep their windows in forward-strand coordinates;
//! only the anchor semantics (which exon edge is the logical "start") flip
//! with the transcript direction.

use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io;
use std::mem;
use std::path::Path;
use std::str::FromStr;

use anyhow::Result;
use csv::StringRecord;

use crate::errors;

/// Transcript orientation relative to the forward strand of the reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strand {
    Forward,
    Reverse,
}

impl FromStr for Strand {
    type Err = errors::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "+" => Ok(Strand::Forward),
            "-" => Ok(Strand::Reverse),
            _ => Err(errors::Error::InvalidStrand {
                value: s.to_owned(),
            }),
        }
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Strand::Forward => "+",
            Strand::Reverse => "-",
        })
    }
}

/// Which logical edge of an exon a boundary window belongs to. On the
/// reverse strand the logical start is the physically higher coordinate.
#[derive(Display, Debug, Clone, Copy, PartialEq, Eq)]
#[strum(serialize_all = "lowercase")]
pub enum ExonEdge {
    Start,
    End,
}

/// Window around one exon edge, inclusive on both sides.
#[derive(Getters, CopyGetters, Debug, Clone, PartialEq, Eq)]
pub struct ExonBoundary {
    #[getset(get_copy = "pub")]
    lower: i64,
    #[getset(get_copy = "pub")]
    upper: i64,
    slack: i64,
    #[getset(get_copy = "pub")]
    edge: ExonEdge,
    anchor: i64,
}

impl ExonBoundary {
    fn new(strand: Strand, slack: i64, coord: i64, edge: ExonEdge) -> Self {
        let (lower, upper) = match (strand, edge) {
            (Strand::Forward, ExonEdge::Start) | (Strand::Reverse, ExonEdge::End) => {
                (coord - slack, coord + slack - 1)
            }
            (Strand::Forward, ExonEdge::End) | (Strand::Reverse, ExonEdge::Start) => {
                (coord - slack + 1, coord + slack)
            }
        };
        ExonBoundary {
            lower,
            upper,
            slack,
            edge,
            anchor: coord,
        }
    }
}

/// A gene-structure feature with an inclusive genomic window and an
/// annotation for positions falling inside that window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneFeature {
    /// Window just upstream of the coding-region start, strictly outside
    /// the coding region, on the transcription-start side.
    CodingRegionStart {
        lower: i64,
        upper: i64,
        slack: i64,
        anchor: i64,
    },
    /// An exon edge lying inside the coding region.
    CodingExonBoundary(ExonBoundary),
    /// An exon edge of an exon lying entirely outside the coding region.
    NonCodingExonBoundary(ExonBoundary),
    /// The non-coding edge of an exon that straddles the coding boundary.
    PartialCodingExonBoundary(ExonBoundary),
}

impl GeneFeature {
    pub fn coding_region_start(strand: Strand, slack: i64, cds_start: i64, cds_end: i64) -> Self {
        let (lower, upper, anchor) = match strand {
            // the window ends just before the start, which itself codes
            Strand::Forward => (cds_start - slack, cds_start - 1, cds_start),
            Strand::Reverse => (cds_end + 1, cds_end + slack, cds_end),
        };
        GeneFeature::CodingRegionStart {
            lower,
            upper,
            slack,
            anchor,
        }
    }

    pub fn coding_exon_boundary(strand: Strand, slack: i64, coord: i64, edge: ExonEdge) -> Self {
        GeneFeature::CodingExonBoundary(ExonBoundary::new(strand, slack, coord, edge))
    }

    pub fn non_coding_exon_boundary(
        strand: Strand,
        slack: i64,
        coord: i64,
        edge: ExonEdge,
    ) -> Self {
        GeneFeature::NonCodingExonBoundary(ExonBoundary::new(strand, slack, coord, edge))
    }

    pub fn partial_coding_exon_boundary(
        strand: Strand,
        slack: i64,
        coord: i64,
        edge: ExonEdge,
    ) -> Self {
        GeneFeature::PartialCodingExonBoundary(ExonBoundary::new(strand, slack, coord, edge))
    }

    /// Inclusive window bounds, always with `lower <= upper`.
    pub fn bounds(&self) -> (i64, i64) {
        match self {
            GeneFeature::CodingRegionStart { lower, upper, .. } => (*lower, *upper),
            GeneFeature::CodingExonBoundary(boundary)
            | GeneFeature::NonCodingExonBoundary(boundary)
            | GeneFeature::PartialCodingExonBoundary(boundary) => {
                (boundary.lower, boundary.upper)
            }
        }
    }

    fn anchor(&self) -> i64 {
        match self {
            GeneFeature::CodingRegionStart { anchor, .. } => *anchor,
            GeneFeature::CodingExonBoundary(boundary)
            | GeneFeature::NonCodingExonBoundary(boundary)
            | GeneFeature::PartialCodingExonBoundary(boundary) => boundary.anchor,
        }
    }

    /// Annotation for `pos` when it falls inside the window, with the
    /// signed offset of `pos` from the feature anchor; `None` otherwise.
    pub fn annotate(&self, pos: i64) -> Option<String> {
        let (lower, upper) = self.bounds();
        if pos < lower || pos > upper {
            return None;
        }
        let offset = pos - self.anchor();
        Some(match self {
            GeneFeature::CodingRegionStart { slack, .. } => format!(
                "Within {} before coding region start ({:+} from coding start)",
                slack, offset
            ),
            GeneFeature::CodingExonBoundary(boundary) => format!(
                "Within +/- {} of coding exon {} boundary ({:+} from boundary)",
                boundary.slack, boundary.edge, offset
            ),
            GeneFeature::NonCodingExonBoundary(boundary) => format!(
                "Within +/- {} of NON-coding exon {} boundary ({:+} from boundary)",
                boundary.slack, boundary.edge, offset
            ),
            GeneFeature::PartialCodingExonBoundary(boundary) => format!(
                "Within +/- {} of PARTIAL-coding exon {} boundary ({:+} from boundary)",
                boundary.slack, boundary.edge, offset
            ),
        })
    }
}

/// Slack windows (in bases) used when building the model.
#[derive(new, Debug, Clone, Copy)]
pub struct Slack {
    /// Window size upstream of the coding-region start.
    pub start: i64,
    /// Window size around exon boundaries.
    pub splice: i64,
}

/// Gene features per chromosome, in reference-table order. Built once per
/// run, read-only afterwards.
#[derive(Debug, Default)]
pub struct GeneModel {
    features: HashMap<String, Vec<GeneFeature>>,
}

impl GeneModel {
    pub fn from_path(path: impl AsRef<Path>, slack: Slack) -> Result<Self> {
        Self::from_reader(File::open(path)?, slack)
    }

    /// Build the model from tab-separated refGene rows. Rows with fewer
    /// than 11 fields are skipped; a non-numeric coordinate or an unknown
    /// strand aborts the build.
    pub fn from_reader<R: io::Read>(reader: R, slack: Slack) -> Result<Self> {
        let mut records = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .flexible(true)
            .quoting(false)
            .from_reader(reader);
        let mut model = GeneModel::default();
        for record in records.records() {
            let row = record?;
            if row.len() >= 11 {
                model.add_transcript(&row, slack)?;
            }
        }
        Ok(model)
    }

    fn add_transcript(&mut self, row: &StringRecord, slack: Slack) -> Result<()> {
        let chrom = &row[2];
        let strand: Strand = row[3].parse()?;
        // transcript bounds are contractually numeric but drive no window
        read_coord(&row[4])?;
        read_coord(&row[5])?;
        let cds_start = read_coord(&row[6])? + 1;
        let cds_end = read_coord(&row[7])?;
        let features = self.features.entry(chrom.to_owned()).or_insert_with(Vec::new);
        // non-coding transcripts have an empty coding region (start == end
        // in the raw table) and get no coding-region-start feature
        if cds_start < cds_end + 1 {
            features.push(GeneFeature::coding_region_start(
                strand,
                slack.start,
                cds_start,
                cds_end,
            ));
        }
        let mut starts = read_coord_list(&row[9])?;
        for start in &mut starts {
            *start += 1;
        }
        let mut ends = read_coord_list(&row[10])?;
        // exon coordinates are reported on the forward strand, so the
        // logical start and end of each exon swap on the reverse strand
        if strand == Strand::Reverse {
            mem::swap(&mut starts, &mut ends);
        }
        for (&start, &end) in starts.iter().zip(ends.iter()) {
            let start_coding = in_coding_region(cds_start, cds_end, start);
            let end_coding = in_coding_region(cds_start, cds_end, end);
            match (start_coding, end_coding) {
                (true, true) => {
                    features.push(GeneFeature::coding_exon_boundary(
                        strand,
                        slack.splice,
                        start,
                        ExonEdge::Start,
                    ));
                    features.push(GeneFeature::coding_exon_boundary(
                        strand,
                        slack.splice,
                        end,
                        ExonEdge::End,
                    ));
                }
                (false, false) => {
                    features.push(GeneFeature::non_coding_exon_boundary(
                        strand,
                        slack.splice,
                        start,
                        ExonEdge::Start,
                    ));
                    features.push(GeneFeature::non_coding_exon_boundary(
                        strand,
                        slack.splice,
                        end,
                        ExonEdge::End,
                    ));
                }
                (true, false) => {
                    features.push(GeneFeature::coding_exon_boundary(
                        strand,
                        slack.splice,
                        start,
                        ExonEdge::Start,
                    ));
                    features.push(GeneFeature::partial_coding_exon_boundary(
                        strand,
                        slack.splice,
                        end,
                        ExonEdge::End,
                    ));
                }
                (false, true) => {
                    features.push(GeneFeature::partial_coding_exon_boundary(
                        strand,
                        slack.splice,
                        start,
                        ExonEdge::Start,
                    ));
                    features.push(GeneFeature::coding_exon_boundary(
                        strand,
                        slack.splice,
                        end,
                        ExonEdge::End,
                    ));
                }
            }
        }
        Ok(())
    }

    /// Features for `chrom`, in insertion order.
    pub fn features(&self, chrom: &str) -> &[GeneFeature] {
        self.features
            .get(chrom)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Annotation of the first feature whose window contains `pos`.
    ///
    /// First match wins: overlapping features resolve by insertion order,
    /// which is part of the contract.
    pub fn search(&self, chrom: &str, pos: i64) -> Option<String> {
        self.features(chrom)
            .iter()
            .find_map(|feature| feature.annotate(pos))
    }
}

fn in_coding_region(cds_start: i64, cds_end: i64, coord: i64) -> bool {
    coord >= cds_start && coord <= cds_end
}

/// Read a contractually numeric coordinate field; anything else aborts the
/// run rather than corrupting the interval math.
fn read_coord(s: &str) -> Result<i64, errors::Error> {
    if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
        s.parse().map_err(|_| errors::Error::NotAnInteger {
            value: s.to_owned(),
        })
    } else {
        Err(errors::Error::NotAnInteger {
            value: s.to_owned(),
        })
    }
}

/// Comma-separated coordinate list; a trailing comma is tolerated.
fn read_coord_list(s: &str) -> Result<Vec<i64>, errors::Error> {
    s.trim_end_matches(',').split(',').map(read_coord).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn refgene_row(
        chrom: &str,
        strand: &str,
        cds_start: i64,
        cds_end: i64,
        exon_starts: &str,
        exon_ends: &str,
    ) -> String {
        // bin, name, chrom, strand, txStart, txEnd, cdsStart, cdsEnd,
        // exonCount, exonStarts, exonEnds
        format!(
            "0\tNM_0001\t{}\t{}\t1000\t9000\t{}\t{}\t2\t{}\t{}",
            chrom, strand, cds_start, cds_end, exon_starts, exon_ends
        )
    }

    fn model_from(rows: &[String], slack: Slack) -> GeneModel {
        GeneModel::from_reader(rows.join("\n").as_bytes(), slack).unwrap()
    }

    #[test]
    fn coding_exon_start_window_on_forward_strand() {
        let feature = GeneFeature::coding_exon_boundary(Strand::Forward, 5, 100, ExonEdge::Start);
        assert_eq!(feature.bounds(), (95, 104));
        assert!(feature.annotate(95).is_some());
        assert!(feature.annotate(104).is_some());
        assert!(feature.annotate(94).is_none());
        assert!(feature.annotate(105).is_none());
    }

    #[test]
    fn coding_exon_end_window_on_forward_strand() {
        let feature = GeneFeature::coding_exon_boundary(Strand::Forward, 5, 100, ExonEdge::End);
        assert_eq!(feature.bounds(), (96, 105));
    }

    #[test]
    fn reverse_strand_swaps_the_edge_formulas() {
        let start = GeneFeature::coding_exon_boundary(Strand::Reverse, 5, 100, ExonEdge::Start);
        let end = GeneFeature::coding_exon_boundary(Strand::Reverse, 5, 100, ExonEdge::End);
        assert_eq!(start.bounds(), (96, 105));
        assert_eq!(end.bounds(), (95, 104));
    }

    #[test]
    fn annotation_reports_signed_offset_from_anchor() {
        let feature = GeneFeature::coding_exon_boundary(Strand::Forward, 5, 100, ExonEdge::Start);
        assert_eq!(
            feature.annotate(97).unwrap(),
            "Within +/- 5 of coding exon start boundary (-3 from boundary)"
        );
        assert_eq!(
            feature.annotate(103).unwrap(),
            "Within +/- 5 of coding exon start boundary (+3 from boundary)"
        );
    }

    #[test]
    fn coding_region_start_window_sits_upstream() {
        let forward = GeneFeature::coding_region_start(Strand::Forward, 30, 1000, 2000);
        assert_eq!(forward.bounds(), (970, 999));
        assert!(forward.annotate(1000).is_none());

        let reverse = GeneFeature::coding_region_start(Strand::Reverse, 30, 1000, 2000);
        assert_eq!(reverse.bounds(), (2001, 2030));
        assert!(reverse.annotate(2000).is_none());
        assert_eq!(
            reverse.annotate(2010).unwrap(),
            "Within 30 before coding region start (+10 from coding start)"
        );
    }

    #[test]
    fn builds_coding_and_non_coding_boundaries() {
        // raw cds 1999..4000 becomes 2000..=4000 after the 0-based fixup;
        // first exon entirely non-coding, second entirely coding
        let rows = vec![refgene_row(
            "chr1",
            "+",
            1999,
            4000,
            "999,2999,",
            "1500,3500,",
        )];
        let model = model_from(&rows, Slack::new(30, 5));
        let features = model.features("chr1");
        assert_eq!(features.len(), 5);
        assert!(matches!(features[0], GeneFeature::CodingRegionStart { .. }));
        assert!(matches!(
            features[1],
            GeneFeature::NonCodingExonBoundary(_)
        ));
        assert!(matches!(
            features[2],
            GeneFeature::NonCodingExonBoundary(_)
        ));
        assert!(matches!(features[3], GeneFeature::CodingExonBoundary(_)));
        assert!(matches!(features[4], GeneFeature::CodingExonBoundary(_)));
    }

    #[test]
    fn straddling_exon_gets_a_partial_boundary() {
        // exon 1000..=2500 straddles the coding start at 2000
        let rows = vec![refgene_row("chr1", "+", 1999, 4000, "999,", "2500,")];
        let model = model_from(&rows, Slack::new(30, 5));
        let features = model.features("chr1");
        assert!(matches!(
            features[1],
            GeneFeature::PartialCodingExonBoundary(_)
        ));
        assert!(matches!(features[2], GeneFeature::CodingExonBoundary(_)));
    }

    #[test]
    fn reverse_strand_swaps_exon_start_and_end_lists() {
        let forward = model_from(
            &[refgene_row("chr1", "+", 1999, 4000, "2099,", "3500,")],
            Slack::new(30, 5),
        );
        let reverse = model_from(
            &[refgene_row("chr1", "-", 1999, 4000, "2099,", "3500,")],
            Slack::new(30, 5),
        );
        // on the forward strand the logical exon start anchors at 2100
        let start = forward
            .features("chr1")
            .iter()
            .find_map(|f| f.annotate(2100))
            .unwrap();
        assert!(start.contains("start boundary"));
        // on the reverse strand the logical exon start anchors at 3500,
        // while the window stays in forward-strand coordinates
        let start = reverse
            .features("chr1")
            .iter()
            .find_map(|f| f.annotate(3500))
            .unwrap();
        assert!(start.contains("start boundary"));
        let end = reverse
            .features("chr1")
            .iter()
            .find_map(|f| f.annotate(2100))
            .unwrap();
        assert!(end.contains("end boundary"));
    }

    #[test]
    fn non_coding_transcript_emits_no_coding_region_start() {
        // cdsStart == cdsEnd marks a non-coding transcript
        let rows = vec![refgene_row("chr1", "+", 1000, 1000, "999,", "1500,")];
        let model = model_from(&rows, Slack::new(30, 5));
        assert!(model
            .features("chr1")
            .iter()
            .all(|f| !matches!(f, GeneFeature::CodingRegionStart { .. })));
    }

    #[test]
    fn first_matching_feature_wins() {
        // two transcripts produce overlapping windows around 2000; the
        // earlier row's feature must answer the query
        let rows = vec![
            refgene_row("chr1", "+", 1999, 4000, "1999,", "3000,"),
            refgene_row("chr1", "+", 1979, 4000, "1999,", "3000,"),
        ];
        let model = model_from(&rows, Slack::new(30, 5));
        let annotation = model.search("chr1", 1998).unwrap();
        assert!(annotation.contains("before coding region start"));
    }

    #[test]
    fn search_misses_return_none() {
        let rows = vec![refgene_row("chr1", "+", 1999, 4000, "1999,", "3000,")];
        let model = model_from(&rows, Slack::new(30, 5));
        assert!(model.search("chr1", 500_000).is_none());
        assert!(model.search("chr2", 2000).is_none());
    }

    #[test]
    fn short_rows_are_skipped() {
        let rows = vec![
            "#comment line".to_owned(),
            refgene_row("chr1", "+", 1999, 4000, "1999,", "3000,"),
        ];
        let model = model_from(&rows, Slack::new(30, 5));
        assert!(!model.features("chr1").is_empty());
    }

    #[test]
    fn unknown_strand_is_fatal() {
        let rows = vec![refgene_row("chr1", ".", 1999, 4000, "1999,", "3000,")];
        let result = GeneModel::from_reader(rows.join("\n").as_bytes(), Slack::new(30, 5));
        assert!(result.is_err());
    }

    #[test]
    fn non_numeric_coordinate_is_fatal() {
        let rows = vec![refgene_row("chr1", "+", 1999, 4000, "start,", "3000,")];
        let result = GeneModel::from_reader(rows.join("\n").as_bytes(), Slack::new(30, 5));
        assert!(result.is_err());
    }
}
