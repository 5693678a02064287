use std::{fs, path::{Path, PathBuf}};

use anyhow::{Context, Result};
use tracing::debug;
use wildmatch::WildMatch;

use crate::{data::Item, error::FsError, procedure::SingleProcedure};

#[derive(Debug, Clone)]
pub struct Selector(PathBuf);

impl Selector {
    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl SingleProcedure for Selector {
    fn eval(&self) -> Result<Item> {
        Item::from_file(&self.0)
    }
}

pub fn exact<P: AsRef<Path>>(path: P) -> Result<Selector> {
    let path = path.as_ref();

    fs::exists(path).map_err(FsError::IoError).and_then(|b| {
        if b && path.is_file() {
            Ok(Selector(path.to_path_buf()))
        } else {
            Err(FsError::FileNotFound(path.to_path_buf()))
        }
    }).with_context(|| format!("Failed to locate file at '{}'", path.display()))
}

pub fn wild<P: AsRef<Path>>(dir: P, pattern: &str) -> Result<Vec<Selector>> {
    let dir = dir.as_ref();
    let r = WildMatch::new(pattern);
    let paths = recursive_search(dir, &|p| r.matches(p))
        .with_context(|| format!("Failed to search {}", dir.display()))?;

    Ok(paths.into_iter().map(Selector).collect())
}

/// Every directory below `dir`, parents before children.
pub fn directories<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    let mut result = Vec::new();

    for entry in fs::read_dir(dir).with_context(|| format!("Failed to search {}", dir.display()))? {
        let path = entry?.path();

        if path.is_dir() {
            let mut inner = directories(&path)?;
            result.push(path);
            result.append(&mut inner);
        }
    }

    Ok(result)
}

fn recursive_search<F>(dir: &Path, matcher: &F) -> Result<Vec<PathBuf>>
where
    F: Fn(&str) -> bool,
{
    let mut result = Vec::new();

    debug!("Searching {}", dir.display());

    for entry in fs::read_dir(dir)? {
        let path = entry?.path();

        if path.is_dir() {
            let mut inner = recursive_search(&path, matcher)?;
            result.append(&mut inner);
            continue;
        }

        let file_name = path
            .file_name()
            .ok_or(FsError::InvalidFileName)?
            .to_str()
            .ok_or(FsError::OsStringNotUtf8)?;

        if matcher(file_name) {
            result.push(path);
        }
    }

    result.sort();

    Ok(result)
}
