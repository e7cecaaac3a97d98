//! SEPA (Scottish Environment Protection Agency) adapter
//!
//! Regional FWI feed used for Scottish coordinates when EFFIS fails.

pub mod client;
pub mod types;

pub use client::SepaClient;
pub use types::{parse_fwi_response, SepaFwiResponse};
