//! Output writers.
//!
//! - [`csv`]: seed CSV files for both jobs
//!
//! # Output Files
//!
//! ```text
//! branded_seed_1mg.csv          # source,title,mrp,url
//! otc_thermometers_apollo.csv   # otc_category,title,mrp
//! ```
//!
//! Each file is rendered completely in memory and written with a single call,
//! replacing any previous file at the same path. A failure before that point
//! leaves the old file untouched.

pub mod csv;
