pub use crate::data::Item;
pub use crate::parser::{farmdown::FarmdownParser, ParserProcedure};
pub use crate::procedure::{MultiProcedure, Procedure, SingleProcedure};
pub use crate::selector::{exact, wild};
pub use crate::stage::{Emscripten, Layout, Stager};
