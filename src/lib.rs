//! Farmdown to HTML conversion plus the tooling that stages a static site
//! around it.
//!
//! The converter in [`parser::farmdown`] is a pure function from lines of
//! text to an HTML fragment. Everything else reads, copies, compiles and
//! serves files around it.

pub mod data;
pub mod error;
pub mod parser;
pub mod prelude;
pub mod procedure;
pub mod selector;
pub mod serve;
pub mod stage;

pub use data::Item;
pub use parser::farmdown::{convert, convert_str};
