use std::path::PathBuf;

use actix_files::Files;
use actix_web::{web, App, HttpServer};
use anyhow::{Context, Result};
use tracing::info;

use crate::error::FsError;

pub fn site(dir: PathBuf) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg: &mut web::ServiceConfig| {
        cfg.service(Files::new("/", dir).index_file("index.html"));
    }
}

pub async fn serve(dir: PathBuf, port: u16) -> Result<()> {
    if !dir.is_dir() {
        return Err(FsError::FileNotFound(dir)).context("Nothing to serve");
    }

    info!("[stage] Serving {} at http://localhost:{}", dir.display(), port);

    HttpServer::new(move || App::new().configure(site(dir.clone())))
        .bind(("127.0.0.1", port))
        .with_context(|| format!("Failed to bind port {}", port))?
        .run()
        .await?;

    Ok(())
}
