// Copyright 2022 the varsieve developers.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

use std::io;
use std::path::PathBuf;

use anyhow::Result;
use structopt::StructOpt;

use crate::annotation;
use crate::classification::RateThresholds;
use crate::filtration;
use crate::refgene::{GeneModel, Slack};
use crate::variants::bam::BamSource;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "varsieve",
    about = "Filter and annotate rare genetic variants using read evidence from sample BAM files."
)]
pub enum Varsieve {
    #[structopt(
        name = "filter-rare",
        about = "Bin variants that occur in too many of the comparison samples."
    )]
    FilterRare {
        #[structopt(long, parse(from_os_str), help = "Variant list as TSV file.")]
        variants: PathBuf,
        #[structopt(
            long,
            parse(from_os_str),
            help = "File that shall contain the binned variants and their evidence."
        )]
        bin: PathBuf,
        #[structopt(
            long,
            parse(from_os_str),
            help = "File that shall contain the kept variant rows."
        )]
        keep: PathBuf,
        #[structopt(
            long,
            parse(from_os_str),
            help = "File that shall contain one decision line per variant."
        )]
        log: PathBuf,
        #[structopt(
            long = "min-match-count",
            default_value = "1",
            help = "Minimum number of matching reads for a sample to count as positive."
        )]
        min_match_count: u32,
        #[structopt(
            long = "samples-percent",
            default_value = "30",
            help = "Percentage of positive samples at which a variant is binned."
        )]
        samples_percent: u64,
        #[structopt(
            parse(from_os_str),
            help = "Indexed BAM files with reads from the comparison samples."
        )]
        bams: Vec<PathBuf>,
    },
    #[structopt(
        name = "filter-read-length",
        about = "Bin variants supported only by anomalously short reads."
    )]
    FilterReadLength {
        #[structopt(long, parse(from_os_str), help = "Variant list as CSV file.")]
        variants: PathBuf,
        #[structopt(
            long,
            parse(from_os_str),
            help = "Indexed BAM file with reads from the same sample as the variants."
        )]
        bam: PathBuf,
        #[structopt(long, parse(from_os_str), help = "File that shall contain the binned rows.")]
        bin: PathBuf,
        #[structopt(long, parse(from_os_str), help = "File that shall contain the kept rows.")]
        keep: PathBuf,
        #[structopt(
            long,
            parse(from_os_str),
            help = "File that shall contain one decision line per row."
        )]
        log: PathBuf,
    },
    #[structopt(
        name = "filter-multis",
        about = "Drop variants sitting in dense clusters of other variants. Kept rows go to stdout."
    )]
    FilterMultis {
        #[structopt(long, parse(from_os_str), help = "Variant list as TSV file.")]
        variants: PathBuf,
        #[structopt(
            long = "max-nearby",
            help = "Maximum acceptable number of variants within the window."
        )]
        max_nearby: u64,
        #[structopt(
            long = "half-window",
            help = "Half the size of the window within which variants count as nearby."
        )]
        half_window: u64,
    },
    #[structopt(
        name = "annotate-family",
        about = "Mark variants that are present in samples of relatives."
    )]
    AnnotateFamily {
        #[structopt(long, parse(from_os_str), help = "Variant list as TSV file.")]
        variants: PathBuf,
        #[structopt(long, parse(from_os_str), help = "File that shall contain the annotated rows.")]
        output: PathBuf,
        #[structopt(
            parse(from_os_str),
            help = "Indexed BAM files with reads from the relatives' samples."
        )]
        bams: Vec<PathBuf>,
    },
    #[structopt(
        name = "annotate-refgene",
        about = "Annotate variants with gene-structure context from a refGene table."
    )]
    AnnotateRefgene {
        #[structopt(long, parse(from_os_str), help = "Variant list as TSV file.")]
        variants: PathBuf,
        #[structopt(
            long = "ref-gene",
            parse(from_os_str),
            help = "refGene.txt table from UCSC."
        )]
        ref_gene: PathBuf,
        #[structopt(
            long = "start-slack",
            help = "Distance from the start of the coding region."
        )]
        start_slack: i64,
        #[structopt(long = "splice-slack", help = "Distance from exon start/end sites.")]
        splice_slack: i64,
        #[structopt(long, parse(from_os_str), help = "File that shall contain the annotated rows.")]
        output: PathBuf,
    },
}

pub fn run(opt: Varsieve) -> Result<()> {
    match opt {
        Varsieve::FilterRare {
            variants,
            bin,
            keep,
            log,
            min_match_count,
            samples_percent,
            bams,
        } => {
            let mut sources = open_sources(&bams)?;
            filtration::filter_rare(
                variants,
                &mut sources,
                RateThresholds::new(min_match_count, samples_percent),
                bin,
                keep,
                log,
            )
        }
        Varsieve::FilterReadLength {
            variants,
            bam,
            bin,
            keep,
            log,
        } => {
            let mut source = BamSource::from_path(bam)?;
            filtration::filter_read_length(variants, &mut source, bin, keep, log)
        }
        Varsieve::FilterMultis {
            variants,
            max_nearby,
            half_window,
        } => filtration::filter_multis(variants, max_nearby, half_window, io::stdout().lock()),
        Varsieve::AnnotateFamily {
            variants,
            output,
            bams,
        } => {
            let mut sources = open_sources(&bams)?;
            annotation::annotate_family(variants, &mut sources, output)
        }
        Varsieve::AnnotateRefgene {
            variants,
            ref_gene,
            start_slack,
            splice_slack,
            output,
        } => {
            let model = GeneModel::from_path(ref_gene, Slack::new(start_slack, splice_slack))?;
            annotation::annotate_refgene(variants, &model, output)
        }
    }
}

fn open_sources(paths: &[PathBuf]) -> Result<Vec<BamSource>> {
    paths.iter().map(BamSource::from_path).collect()
}
