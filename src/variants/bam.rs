// Copyright 2022 the varsieve developers.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Alignment pileups served from indexed BAM files.

use std::path::{Path, PathBuf};

use anyhow::Result;
use rust_htslib::bam::{self, Read};

use crate::variants::evidence::{AlignmentSource, CigarOp, PileupColumn, PileupRead};

/// An indexed BAM file acting as an alignment source.
pub struct BamSource {
    path: PathBuf,
    reader: bam::IndexedReader,
}

impl BamSource {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        Ok(BamSource {
            path: path.as_ref().to_owned(),
            reader: bam::IndexedReader::from_path(path.as_ref())?,
        })
    }
}

impl AlignmentSource for BamSource {
    /// Materialize the pileup columns produced for the fetched window.
    ///
    /// htslib reports a column for every position covered by a fetched
    /// read, so columns outside `[start, end)` are returned as well;
    /// callers select the position they asked about. A chromosome the BAM
    /// has never seen yields no columns.
    fn pileups(&mut self, chrom: &str, start: u64, end: u64) -> Result<Vec<PileupColumn>> {
        let tid = match self.reader.header().tid(chrom.as_bytes()) {
            Some(tid) => tid,
            None => {
                warn!("{} is not a reference of {}", chrom, self.path.display());
                return Ok(Vec::new());
            }
        };
        self.reader.fetch((tid as i32, start as i64, end as i64))?;
        let mut columns = Vec::new();
        for pileup in self.reader.pileup() {
            let pileup = pileup?;
            let reads = pileup
                .alignments()
                .map(|alignment| {
                    let record = alignment.record();
                    let base = alignment
                        .qpos()
                        .map(|qpos| record.seq().as_bytes()[qpos] as char);
                    let cigar: Vec<CigarOp> = record
                        .cigar()
                        .iter()
                        .map(|op| CigarOp::new(op.char(), op.len()))
                        .collect();
                    PileupRead::new(
                        alignment.is_del(),
                        base,
                        if cigar.is_empty() { None } else { Some(cigar) },
                    )
                })
                .collect();
            columns.push(PileupColumn::new(
                u64::from(pileup.pos()),
                pileup.depth(),
                reads,
            ));
        }
        Ok(columns)
    }
}
