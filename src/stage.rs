//! Stages the static site under `Stage/Builds/<name>`.
//!
//! A build refreshes the updates snippet from Farmdown, copies the web source
//! tree, drops a `.nojekyll` marker so GitHub Pages serves files verbatim and,
//! when a compiler is configured, compiles the WebAssembly page with
//! Emscripten and lifts its artifacts into the build root.

use std::{env, ffi::OsString, fs, path::{Path, PathBuf}, process::Command};

use anyhow::{Context, Result};
use tracing::{debug, info};
use wildmatch::WildMatch;

use crate::{
    error::StageError,
    parser::farmdown::FarmdownParser,
    procedure::{MultiProcedure, Procedure, SingleProcedure},
    selector,
};

const WASM_ARTIFACTS: [&str; 3] = ["index.html", "index.js", "index.wasm"];

#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub updates_input: PathBuf,
    pub updates_output: PathBuf,
    pub web_source: PathBuf,
    pub wasm_source: PathBuf,
    pub builds_root: PathBuf,
    pub em_cache: PathBuf,
}

impl Layout {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        let root = root.into();

        Self {
            updates_input: root.join("Source/Updates/Updates.md"),
            updates_output: root.join("Source/WebSite/updates.html"),
            web_source: root.join("Source/WebSite"),
            wasm_source: root.join("Source/WasmSite"),
            builds_root: root.join("Stage/Builds"),
            em_cache: root.join("Stage/.emscripten_cache"),
        }
    }

    pub fn build_dir(&self, name: &str) -> PathBuf {
        self.builds_root.join(name)
    }
}

pub fn run_updates(input: &Path, output: &Path) -> Result<PathBuf> {
    let written = selector::exact(input)?
        .parse(FarmdownParser)
        .path(output)
        .eval()?
        .write(Path::new(""))?;

    info!("[updates] Wrote {}", written.display());

    Ok(written)
}

#[derive(Debug, Clone)]
pub struct Emscripten {
    emcc: PathBuf,
    cache_dir: PathBuf,
}

impl Emscripten {
    pub fn new<P: Into<PathBuf>, C: Into<PathBuf>>(emcc: P, cache_dir: C) -> Self {
        Self {
            emcc: emcc.into(),
            cache_dir: cache_dir.into(),
        }
    }

    pub fn locate<C: Into<PathBuf>>(cache_dir: C) -> Result<Self, StageError> {
        Self::locate_in(env::var_os("PATH"), cache_dir)
    }

    pub fn locate_in<C: Into<PathBuf>>(path_var: Option<OsString>, cache_dir: C) -> Result<Self, StageError> {
        let emcc = path_var
            .iter()
            .flat_map(|p| env::split_paths(p).collect::<Vec<_>>())
            .flat_map(|dir| ["emcc", "emcc.bat"].map(|name| dir.join(name)))
            .find(|candidate| candidate.is_file())
            .ok_or_else(|| StageError::CompilerNotFound(String::from("emcc")))?;

        Ok(Self::new(emcc, cache_dir))
    }

    pub fn compile(&self, source: &Path, out_dir: &Path) -> Result<()> {
        fs::create_dir_all(out_dir).with_context(|| format!("Failed to create {}", out_dir.display()))?;
        fs::create_dir_all(&self.cache_dir)
            .with_context(|| format!("Failed to create {}", self.cache_dir.display()))?;
        let cache_dir = fs::canonicalize(&self.cache_dir)?;

        let mut cmd = Command::new(&self.emcc);
        cmd.arg(source.join("main.cpp"))
            .arg("-O2")
            .arg("--shell-file")
            .arg(source.join("template.html"))
            .args([
                "-s",
                "ALLOW_MEMORY_GROWTH=1",
                "-s",
                "ASSERTIONS=1",
                "-s",
                "ENVIRONMENT=web",
                "-s",
                "EXPORTED_RUNTIME_METHODS=['ccall']",
                "-o",
            ])
            .arg(out_dir.join("index.html"))
            .env("EM_CACHE", cache_dir);

        debug!("Running {:?}", cmd);

        let status = cmd
            .status()
            .with_context(|| format!("Failed to run {}", self.emcc.display()))?;

        if !status.success() {
            return Err(StageError::CompilerFailed {
                compiler: self.emcc.clone(),
                status,
            }
            .into());
        }

        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Stager {
    layout: Layout,
    exclude: Vec<String>,
    compiler: Option<Emscripten>,
}

impl Stager {
    pub fn new(layout: Layout) -> Self {
        Self {
            layout,
            exclude: Vec::new(),
            compiler: None,
        }
    }

    /// Skips web source files whose relative path matches `pattern`.
    pub fn exclude<S: Into<String>>(self, pattern: S) -> Self {
        let mut exclude = self.exclude;
        exclude.push(pattern.into());

        Self { exclude, ..self }
    }

    pub fn compiler(self, compiler: Emscripten) -> Self {
        Self {
            compiler: Some(compiler),
            ..self
        }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn build(&self, name: &str) -> Result<PathBuf> {
        run_updates(&self.layout.updates_input, &self.layout.updates_output)?;

        let build_dir = self.layout.build_dir(name);
        self.copy_site(&build_dir)?;
        fs::write(build_dir.join(".nojekyll"), "")?;

        if let Some(compiler) = &self.compiler {
            let wasm_dir = build_dir.join("wasm");
            compiler.compile(&self.layout.wasm_source, &wasm_dir)?;

            for artifact in WASM_ARTIFACTS {
                let src = wasm_dir.join(artifact);

                if src.is_file() {
                    selector::exact(&src)?.directory(&build_dir).write(Path::new(""))?;
                }
            }
        }

        info!("[stage] Built site at {}", build_dir.display());

        Ok(build_dir)
    }

    fn copy_site(&self, destination: &Path) -> Result<()> {
        if destination.exists() {
            fs::remove_dir_all(destination)
                .with_context(|| format!("Failed to clear {}", destination.display()))?;
        }
        fs::create_dir_all(destination)?;

        let source = &self.layout.web_source;
        let exclude = self.exclude.iter().map(|p| WildMatch::new(p)).collect::<Vec<_>>();

        for dir in selector::directories(source)? {
            let relative = dir.strip_prefix(source).unwrap_or(&dir);
            fs::create_dir_all(destination.join(relative))?;
        }

        let files = selector::wild(source, "*")?
            .into_iter()
            .filter(|s| {
                let relative = s.path().strip_prefix(source).unwrap_or(s.path());
                let relative = relative.to_string_lossy();

                !exclude.iter().any(|w| w.matches(&relative))
            })
            .collect::<Vec<_>>();

        let written = files
            .chain(|s| s.rebase(source.clone()))
            .write(destination)?;

        debug!("Copied {} files into {}", written.len(), destination.display());

        Ok(())
    }
}
