use std::{fs, path::{Path, PathBuf}};

use anyhow::{Context, Result};

use crate::procedure::SingleProcedure;

#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub path: PathBuf,
    pub bytes: Vec<u8>,
}

impl Item {
    pub fn write(&self, root: &Path) -> Result<PathBuf> {
        let path = root.join(&self.path);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        fs::write(&path, self.bytes.as_slice())
            .with_context(|| format!("Failed to write {}", path.display()))?;

        Ok(path)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        Ok(Self {
            path: path.to_path_buf(),
            bytes: fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?,
        })
    }

    pub fn set_path(&self, path: PathBuf) -> Self {
        Self {
            path,
            bytes: self.bytes.clone(),
        }
    }

    pub fn text(&self) -> Result<String> {
        Ok(String::from_utf8(self.bytes.clone())?)
    }
}

impl SingleProcedure for Item {
    fn eval(&self) -> Result<Item> {
        Ok(self.clone())
    }
}
