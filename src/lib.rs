//! Football player and team statistics: scraping competition tables into datasets,
//! preprocessing them, and exploring them through clustering, dimensionality reduction,
//! similarity search and charts.

#![allow(clippy::too_many_arguments)]

pub mod aggregate;
pub mod analyse;
pub mod config;
pub mod csv;
pub mod dataset;
pub mod extract;
pub mod file;
pub mod linear;
pub mod preprocess;
pub mod print;
pub mod record;
pub mod scale;
pub mod scrape;
pub mod search;
pub mod vis;

#[cfg(test)]
pub(crate) mod testing;

#[doc = include_str!("../README.md")]
#[cfg(doc)]
fn readme() {}
