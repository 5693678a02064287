use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::{data::Item, parser::ParserProcedure};

pub trait Procedure: Sized + Clone {
    fn write(&self, root: &Path) -> Result<Vec<PathBuf>>;
}

pub trait SingleProcedure: Procedure + Sized + Clone {
    fn eval(&self) -> Result<Item>;

    fn path<S: Into<PathBuf>>(self, path: S) -> SetPath<Self> {
        SetPath {
            prior: self,
            path: path.into(),
        }
    }

    fn directory<S: Into<PathBuf>>(self, dir: S) -> SetDirectory<Self> {
        SetDirectory {
            prior: self,
            dir: dir.into(),
        }
    }

    fn rebase<S: Into<PathBuf>>(self, base: S) -> Rebase<Self> {
        Rebase {
            prior: self,
            base: base.into(),
        }
    }

    fn parse<P: ParserProcedure>(self, parser: P) -> Parse<Self, P> {
        Parse {
            prior: self,
            parser,
        }
    }
}

pub trait MultiProcedure<P: SingleProcedure>: Procedure + Sized + Clone {
    fn chain<O, F>(self, func: F) -> Vec<O>
    where
        O: SingleProcedure,
        F: Fn(P) -> O,
    ;
}

impl<P: SingleProcedure> Procedure for P {
    fn write(&self, root: &Path) -> Result<Vec<PathBuf>> {
        Ok(vec![self.eval()?.write(root)?])
    }
}

impl<P: SingleProcedure> Procedure for Vec<P> {
    fn write(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let mut written = Vec::new();

        for p in self {
            written.append(&mut p.write(root)?);
        }

        Ok(written)
    }
}

impl<P: SingleProcedure> MultiProcedure<P> for Vec<P> {
    fn chain<O, F>(self, func: F) -> Vec<O>
    where
        O: SingleProcedure,
        F: Fn(P) -> O,
    {
        self.into_iter().map(func).collect()
    }
}

#[derive(Clone)]
pub struct SetPath<P: SingleProcedure> {
    prior: P,
    path: PathBuf,
}

impl<P: SingleProcedure> SingleProcedure for SetPath<P> {
    fn eval(&self) -> Result<Item> {
        Ok(self.prior.eval()?.set_path(self.path.clone()))
    }
}

#[derive(Clone)]
pub struct SetDirectory<P: SingleProcedure> {
    prior: P,
    dir: PathBuf,
}

impl<P: SingleProcedure> SingleProcedure for SetDirectory<P> {
    fn eval(&self) -> Result<Item> {
        let item = self.prior.eval()?;

        let file_name = match item.path.file_name() {
            Some(v) => v,
            None => bail!("Item has an invalid path"),
        };

        let new_path = self.dir.join(file_name);

        Ok(Item {
            path: new_path,
            ..item
        })
    }
}

#[derive(Clone)]
pub struct Rebase<P: SingleProcedure> {
    prior: P,
    base: PathBuf,
}

impl<P: SingleProcedure> SingleProcedure for Rebase<P> {
    fn eval(&self) -> Result<Item> {
        let item = self.prior.eval()?;
        let path = item
            .path
            .strip_prefix(&self.base)
            .with_context(|| format!("{} is not inside {}", item.path.display(), self.base.display()))?
            .to_path_buf();

        Ok(item.set_path(path))
    }
}

#[derive(Clone)]
pub struct Parse<P: SingleProcedure, PARSER: ParserProcedure> {
    prior: P,
    parser: PARSER,
}

impl<P: SingleProcedure, PARSER: ParserProcedure> SingleProcedure for Parse<P, PARSER> {
    fn eval(&self) -> Result<Item> {
        let item = self.prior.eval()?;

        self.parser
            .process(&item)
            .with_context(|| format!("While parsing {}", item.path.display()))
    }
}
