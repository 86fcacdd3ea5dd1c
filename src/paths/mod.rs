//! Path algebra used to turn `@import` references into absolute resource identifiers.
//!
//! Everything here is pure string manipulation. No filesystem or network access happens
//! while normalising, and malformed input degrades to a best-effort result rather than an
//! error, since the resolver never validates that an imported resource exists.

mod clean;
mod join;

pub use clean::{canonical_separators, clean_path};
pub use join::{full_path, normalize};
