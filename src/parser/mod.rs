use anyhow::Result;

use crate::data::Item;

pub mod farmdown;

pub trait ParserProcedure: Clone {
    fn process(&self, item: &Item) -> Result<Item>;
}
