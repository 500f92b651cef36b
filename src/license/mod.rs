//! License identification and resolution.
//!
//! - [`spdx`]: SPDX identifier validation, compound-expression helpers,
//!   normalization of registry spellings, and text matching.
//! - [`resolver`]: combines registry metadata, the override table, and
//!   template fallbacks into a fully resolved dependency record.

pub mod resolver;
pub mod spdx;
