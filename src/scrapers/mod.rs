//! Product extractors.
//!
//! Each extractor takes page HTML and returns records; neither touches the
//! network, so both are exercised against inline fixtures.
//!
//! # Extractors
//!
//! | Job | Module | Method | Notes |
//! |-----|--------|--------|-------|
//! | `branded` | [`jsonld`] | JSON-LD `Product` / `ItemList` nodes | malformed blocks skipped and counted |
//! | `branded` | [`fallback`] | `__NEXT_DATA__`, then visible text | only when JSON-LD found nothing |
//! | `otc` | [`cards`] | CSS selector strategies + keyword | price is a text heuristic |

pub mod cards;
pub mod fallback;
pub mod jsonld;
