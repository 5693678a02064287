use std::{path::PathBuf, process::ExitStatus};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FsError {
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),
    #[error("Not a valid file name")]
    InvalidFileName,
    #[error("An OS string is not valid utf-8")]
    OsStringNotUtf8,
    #[error(transparent)]
    IoError(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum StageError {
    #[error("{0} (Emscripten) not found. Install via https://emscripten.org/docs/getting_started/downloads.html")]
    CompilerNotFound(String),
    #[error("{} exited with {status}", compiler.display())]
    CompilerFailed {
        compiler: PathBuf,
        status: ExitStatus,
    },
}
