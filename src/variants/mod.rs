// Copyright 2022 the varsieve developers.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Variant records parsed from delimited input rows.

pub mod bam;
pub mod evidence;

use csv::StringRecord;

use crate::coord::{Locus, CHROM_PREFIX};

/// Check that a letter is a valid code for a DNA base.
pub fn valid_base(s: &str) -> bool {
    matches!(s, "G" | "A" | "T" | "C")
}

/// A single-nucleotide variant call taken from one input row.
#[derive(Getters, CopyGetters, Debug, Clone)]
pub struct Variant {
    #[getset(get = "pub")]
    locus: Locus,
    #[getset(get_copy = "pub")]
    ref_base: char,
    #[getset(get_copy = "pub")]
    var_base: char,
    /// The original input row, retained unchanged for pass-through output.
    #[getset(get = "pub")]
    row: StringRecord,
}

/// Parse the `X/Y` polymorphism notation, extracting `X` and `Y`.
fn parse_polymorphism(s: &str) -> Option<(char, char)> {
    let mut bases = s.split('/');
    match (bases.next(), bases.next(), bases.next()) {
        (Some(from), Some(to), None) if valid_base(from) && valid_base(to) => {
            Some((from.chars().next()?, to.chars().next()?))
        }
        _ => None,
    }
}

pub(crate) fn parse_position(s: &str) -> Option<u64> {
    if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
        s.parse().ok()
    } else {
        None
    }
}

/// Extract a variant from one delimited input row.
///
/// Two row shapes are accepted: either the first field packs
/// comma-separated sub-fields (chromosome code, position, _, `X/Y`
/// polymorphism), or the row itself is flat with the same fields at
/// indices 0, 1 and 3. Anything else yields `None`; callers rely on this
/// to skip title rows silently.
pub fn parse_variant_row(row: &StringRecord) -> Option<Variant> {
    let coords: Vec<&str> = row.get(0)?.split(',').collect();
    if coords.len() >= 4 {
        variant_from_fields(coords[0], coords[1], coords[3], row)
    } else if row.len() >= 4 {
        variant_from_fields(row.get(0)?, row.get(1)?, row.get(3)?, row)
    } else {
        None
    }
}

fn variant_from_fields(
    chrom_code: &str,
    pos: &str,
    polymorphism: &str,
    row: &StringRecord,
) -> Option<Variant> {
    let (ref_base, var_base) = parse_polymorphism(polymorphism)?;
    let locus = Locus::new(
        format!("{}{}", CHROM_PREFIX, chrom_code),
        parse_position(pos)?,
    );
    Some(Variant {
        locus,
        ref_base,
        var_base,
        row: row.clone(),
    })
}

/// Extract just the locus of a row, for annotation paths that do not care
/// about the substitution itself (indel rows included).
pub fn parse_variant_locus(row: &StringRecord) -> Option<Locus> {
    let coords: Vec<&str> = row.get(0)?.split(',').collect();
    let (chrom_code, pos) = if coords.len() >= 4 {
        (coords[0], coords[1])
    } else if row.len() >= 4 {
        (row.get(0)?, row.get(1)?)
    } else {
        return None;
    };
    Some(Locus::new(
        format!("{}{}", CHROM_PREFIX, chrom_code),
        parse_position(pos)?,
    ))
}
