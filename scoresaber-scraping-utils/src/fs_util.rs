use std::{fmt::Debug, path::PathBuf};

use anyhow::Context;
use serde::Deserialize;

pub fn read_toml<P: Into<PathBuf> + Debug, T: for<'de> Deserialize<'de>>(
    path: P,
) -> anyhow::Result<T> {
    let path = path.into();
    (|| toml::from_str(&fs_err::read_to_string(&path)?).map_err(anyhow::Error::new))().with_context(
        || {
            format!(
                "While trying to parse {path:?} as {}",
                std::any::type_name::<T>()
            )
        },
    )
}

/// Reads a TOML file if a path is given, otherwise falls back to `T::default()`.
pub fn read_toml_or_default<T: Default + for<'de> Deserialize<'de>>(
    path: Option<&PathBuf>,
) -> anyhow::Result<T> {
    match path {
        Some(path) => read_toml(path),
        None => Ok(T::default()),
    }
}

/// Creates a directory that must not exist yet.
pub fn create_new_dir<P: Into<PathBuf>>(path: P) -> anyhow::Result<PathBuf> {
    let path = path.into();
    fs_err::create_dir(&path).with_context(|| format!("Directory {path:?} could not be created"))?;
    Ok(path)
}
