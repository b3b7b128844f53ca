// Copyright 2022 the varsieve developers.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Filtering and annotation of rare genetic variants.
//!
//! Variant calls from one sample are compared against read evidence in the
//! alignments of other samples (to bin common or familial variants) and
//! against a reference gene model (to annotate splice- and promoter-adjacent
//! positions).

#[macro_use]
extern crate log;
#[macro_use]
extern crate derive_new;
#[macro_use]
extern crate getset;
#[macro_use]
extern crate strum_macros;

pub mod annotation;
pub mod classification;
pub mod cli;
pub mod coord;
pub mod errors;
pub mod filtration;
pub mod refgene;
pub mod variants;
