//! Optional `.env` loading for the server binary.
//!
//! Values already present in the process environment are never overwritten.
//! The outcome is returned instead of logged because the binary loads the
//! file before its subscriber exists (`RUST_LOG` may come from the file).

use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum EnvFile {
    Loaded(PathBuf),
    Missing,
    Invalid(dotenvy::Error),
}

/// Load the nearest `.env` from the working directory or one of its parents.
pub fn load_env_file() -> EnvFile {
    classify(dotenvy::dotenv())
}

pub fn load_env_file_from(path: &Path) -> EnvFile {
    classify(dotenvy::from_path(path).map(|()| path.to_path_buf()))
}

fn classify(result: Result<PathBuf, dotenvy::Error>) -> EnvFile {
    match result {
        Ok(path) => EnvFile::Loaded(path),
        Err(err) if err.not_found() => EnvFile::Missing,
        Err(err) => EnvFile::Invalid(err),
    }
}
