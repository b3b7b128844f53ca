// Copyright 2022 the varsieve developers.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Variant annotation tools: family presence and gene-structure context.

use std::io::Write;
use std::path::Path;

use anyhow::Result;
use csv::StringRecord;

use crate::classification::seen_in_family;
use crate::filtration::read_variant_rows;
use crate::refgene::GeneModel;
use crate::variants::evidence::{gather_evidence, AlignmentSource, EvidenceMap};
use crate::variants::parse_variant_locus;

/// Annotation column values for the family-presence split.
pub const IN_FAMILY: &str = "IN RELATIVE";
pub const NOT_IN_FAMILY: &str = "NOT IN RELATIVE";

fn with_column(row: &StringRecord, value: &str) -> StringRecord {
    let mut annotated = row.clone();
    annotated.push_field(value);
    annotated
}

fn annotation_writer(path: impl AsRef<Path>) -> Result<csv::Writer<std::fs::File>> {
    Ok(csv::WriterBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .quote_style(csv::QuoteStyle::Never)
        .from_path(path)?)
}

/// Mark each variant row with whether any relative's sample carries the
/// variant.
pub fn annotate_family<S: AlignmentSource>(
    variants: impl AsRef<Path>,
    sources: &mut [S],
    output: impl AsRef<Path>,
) -> Result<()> {
    let rows = read_variant_rows(variants, b'\t')?;
    let evidence = gather_evidence(&rows, sources)?;
    write_family_annotation(&evidence, &mut annotation_writer(output)?)
}

/// Write all rows in coordinate order, the in-family block first, each with
/// the presence verdict appended as one extra column.
fn write_family_annotation<W: Write>(
    evidence: &EvidenceMap,
    writer: &mut csv::Writer<W>,
) -> Result<()> {
    let mut in_family = Vec::new();
    let mut not_in_family = Vec::new();
    for entry in evidence.values() {
        if seen_in_family(entry.observations()) {
            in_family.push(entry.variant().row());
        } else {
            not_in_family.push(entry.variant().row());
        }
    }
    for row in in_family {
        writer.write_record(&with_column(row, IN_FAMILY))?;
    }
    for row in not_in_family {
        writer.write_record(&with_column(row, NOT_IN_FAMILY))?;
    }
    writer.flush()?;
    Ok(())
}

/// Append the first matching gene-feature annotation to each variant row.
pub fn annotate_refgene(
    variants: impl AsRef<Path>,
    model: &GeneModel,
    output: impl AsRef<Path>,
) -> Result<()> {
    let rows = read_variant_rows(variants, b'\t')?;
    write_refgene_annotation(&rows, model, &mut annotation_writer(output)?)
}

/// Rows without a parseable locus, or with no matching feature, pass
/// through unchanged; everything keeps its original field order.
fn write_refgene_annotation<W: Write>(
    rows: &[StringRecord],
    model: &GeneModel,
    writer: &mut csv::Writer<W>,
) -> Result<()> {
    for row in rows {
        let annotation = parse_variant_locus(row)
            .and_then(|locus| model.search(locus.chrom(), locus.pos() as i64));
        match annotation {
            Some(annotation) => writer.write_record(&with_column(row, &annotation))?,
            None => writer.write_record(row)?,
        }
    }
    writer.flush()?;
    Ok(())
}
