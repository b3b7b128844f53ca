// Copyright 2022 the varsieve developers.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

//! The variant filter tools: occurrence-rate filtering, read-length-bias
//! filtering, and cluster ("multi") filtering.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::Result;
use csv::StringRecord;
use itertools::Itertools;

use crate::classification::{classify_by_rate, Action, RateThresholds};
use crate::errors;
use crate::variants::evidence::{
    count_read_lengths, gather_evidence, AlignmentSource, EvidenceMap, ReadLengthCounts,
};
use crate::variants::{parse_position, parse_variant_row};

/// Read all rows of a delimited variant list.
pub fn read_variant_rows(path: impl AsRef<Path>, delimiter: u8) -> Result<Vec<StringRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .from_path(path)?;
    let mut rows = Vec::new();
    for record in reader.records() {
        rows.push(record?);
    }
    Ok(rows)
}

fn row_writer(path: impl AsRef<Path>) -> Result<csv::Writer<File>> {
    Ok(csv::WriterBuilder::new()
        .delimiter(b'\t')
        .quote_style(csv::QuoteStyle::Never)
        .from_path(path)?)
}

/// Decide which variants to keep and which to bin, by how often they occur
/// across the comparison samples.
pub fn filter_rare<S: AlignmentSource>(
    variants: impl AsRef<Path>,
    sources: &mut [S],
    thresholds: RateThresholds,
    bin_path: impl AsRef<Path>,
    keep_path: impl AsRef<Path>,
    log_path: impl AsRef<Path>,
) -> Result<()> {
    let rows = read_variant_rows(variants, b'\t')?;
    let evidence = gather_evidence(&rows, sources)?;
    let mut bin = BufWriter::new(File::create(bin_path)?);
    let mut keep = row_writer(keep_path)?;
    let mut log = BufWriter::new(File::create(log_path)?);
    report_rare(&evidence, thresholds, &mut bin, &mut keep, &mut log)
}

/// Route each variant to the kept or binned stream, in coordinate order,
/// logging one decision line per variant. Binned variants carry their
/// per-sample evidence.
fn report_rare<W, B, L>(
    evidence: &EvidenceMap,
    thresholds: RateThresholds,
    bin: &mut B,
    keep: &mut csv::Writer<W>,
    log: &mut L,
) -> Result<()>
where
    W: Write,
    B: Write,
    L: Write,
{
    for (locus, entry) in evidence {
        let classification = classify_by_rate(entry.observations(), thresholds);
        writeln!(
            log,
            "{}: {}: {}",
            locus, classification.action, classification.reason
        )?;
        match classification.action {
            Action::Bin => {
                writeln!(bin, "{}", locus)?;
                for observation in entry.observations() {
                    writeln!(
                        bin,
                        "    <vars/coverage: {}/{}>",
                        observation.matching, observation.depth
                    )?;
                }
            }
            Action::Keep => keep.write_record(entry.variant().row())?,
        }
    }
    keep.flush()?;
    Ok(())
}

/// Bin variants whose supporting reads are exclusively short, a signature
/// of alignment bias rather than a real variant.
pub fn filter_read_length<S: AlignmentSource>(
    variants: impl AsRef<Path>,
    source: &mut S,
    bin_path: impl AsRef<Path>,
    keep_path: impl AsRef<Path>,
    log_path: impl AsRef<Path>,
) -> Result<()> {
    let rows = read_variant_rows(variants, b',')?;
    let mut bin = BufWriter::new(File::create(bin_path)?);
    let mut keep = BufWriter::new(File::create(keep_path)?);
    let mut log = BufWriter::new(File::create(log_path)?);
    report_read_lengths(&rows, source, &mut bin, &mut keep, &mut log)
}

fn report_read_lengths<S, B, K, L>(
    rows: &[StringRecord],
    source: &mut S,
    bin: &mut B,
    keep: &mut K,
    log: &mut L,
) -> Result<()>
where
    S: AlignmentSource,
    B: Write,
    K: Write,
    L: Write,
{
    for row in rows {
        let counts = match parse_variant_row(row) {
            Some(variant) => count_read_lengths(&variant, source)?,
            None => ReadLengthCounts::default(),
        };
        let line = row.iter().join(",");
        write!(log, "{}: short={}, long={}", line, counts.short, counts.long)?;
        if counts.is_biased() {
            writeln!(bin, "{}", line)?;
            writeln!(log, ", bin")?;
        } else {
            writeln!(keep, "{}", line)?;
            writeln!(log, ", keep")?;
        }
    }
    Ok(())
}

/// Keep variant rows that do not sit in a dense cluster of other variants.
///
/// A row survives when the number of rows on the same chromosome within
/// `half_window` of its position (the row itself included) does not exceed
/// `max_nearby`.
pub fn filter_multis<W: Write>(
    variants: impl AsRef<Path>,
    max_nearby: u64,
    half_window: u64,
    output: W,
) -> Result<()> {
    let rows = read_variant_rows(variants, b'\t')?;
    write_multis(&rows, max_nearby, half_window, output)
}

fn write_multis<W: Write>(
    rows: &[StringRecord],
    max_nearby: u64,
    half_window: u64,
    output: W,
) -> Result<()> {
    let coordinates = rows
        .iter()
        .map(row_coordinate)
        .collect::<Result<Vec<_>, _>>()?;
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .quote_style(csv::QuoteStyle::Never)
        .from_writer(output);
    for (row, (chrom, pos)) in rows.iter().zip(&coordinates) {
        let nearby = coordinates
            .iter()
            .filter(|(other_chrom, other_pos)| {
                other_chrom == chrom && other_pos.abs_diff(*pos) <= half_window
            })
            .count() as u64;
        if nearby <= max_nearby {
            writer.write_record(row)?;
        }
    }
    writer.flush()?;
    Ok(())
}

/// Chromosome and position of a flat variant row; the coordinate fields
/// are contractually numeric.
fn row_coordinate(row: &StringRecord) -> Result<(String, u64), errors::Error> {
    let pos = row.get(1).unwrap_or("");
    match parse_position(pos) {
        Some(pos) => Ok((row.get(0).unwrap_or("").to_owned(), pos)),
        None => Err(errors::Error::NotAnInteger {
            value: pos.to_owned(),
        }),
    }
}
