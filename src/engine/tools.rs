//! Path and filter utilities

use anyhow::{Context, Result};
use std::fmt;
use std::path::{Path, PathBuf};

/// Filter token that matches every file.
pub const WILDCARD_FILTER: &str = "all";

/// Convert absolute path to relative path from base
pub fn path_relative_to(path: &Path, base: &Path) -> Option<PathBuf> {
    path.strip_prefix(base).ok().map(|p| p.to_path_buf())
}

/// Mirror `path` (under `src_root`) onto `dest_root`. None when `path` is not under `src_root`.
pub fn mirror_path(path: &Path, src_root: &Path, dest_root: &Path) -> Option<PathBuf> {
    path_relative_to(path, src_root).map(|rel| dest_root.join(rel))
}

/// True when `s` is empty or whitespace only.
pub fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}

/// Extension of the last path component: the suffix after its last `.`.
/// None when there is no `.` or the only `.` is the leading character (dotfiles).
pub fn file_extension(path: &str) -> Option<&str> {
    let name = path.rsplit(['/', '\\']).next().unwrap_or(path);
    match name.rfind('.') {
        None | Some(0) => None,
        Some(idx) => Some(&name[idx + 1..]),
    }
}

/// Match `path`'s extension against `filter`, ignoring ASCII case.
///
/// `"all"` matches every non-blank path, extensionless ones included. A blank path or filter never matches.
pub fn check_extension(path: &str, filter: &str) -> bool {
    if is_blank(path) || is_blank(filter) {
        return false;
    }
    if filter == WILDCARD_FILTER {
        return true;
    }
    file_extension(path).is_some_and(|ext| ext.eq_ignore_ascii_case(filter))
}

/// Parsed extension filter handed to the walker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExtensionFilter {
    /// Matches every file.
    All,
    /// Matches files whose extension equals this token, ignoring ASCII case.
    Extension(String),
}

impl ExtensionFilter {
    /// Parse a CLI token. Blank tokens are rejected; `"all"` is the wildcard.
    pub fn parse(token: &str) -> Result<Self> {
        if is_blank(token) {
            anyhow::bail!("extension filter must not be empty");
        }
        if token == WILDCARD_FILTER {
            return Ok(ExtensionFilter::All);
        }
        Ok(ExtensionFilter::Extension(token.to_string()))
    }

    pub fn matches(&self, path: &Path) -> bool {
        let path = path.to_string_lossy();
        match self {
            ExtensionFilter::All => check_extension(&path, WILDCARD_FILTER),
            ExtensionFilter::Extension(ext) => check_extension(&path, ext),
        }
    }
}

impl fmt::Display for ExtensionFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtensionFilter::All => f.write_str(WILDCARD_FILTER),
            ExtensionFilter::Extension(ext) => f.write_str(ext),
        }
    }
}

/// Canonicalize the source root and require it to be a directory.
pub fn check_source_and_canonicalize(path: &Path) -> Result<PathBuf> {
    let path = path
        .canonicalize()
        .with_context(|| format!("canonicalize source {}", path.display()))?;
    if !path.is_dir() {
        anyhow::bail!("Source is not a directory: {}", path.display());
    }
    Ok(path)
}

/// Where `path` would live once created: its nearest existing ancestor canonicalized, with the
/// missing components appended.
pub fn resolve_planned_path(path: &Path) -> Result<PathBuf> {
    let absolute = std::path::absolute(path)
        .with_context(|| format!("resolve destination {}", path.display()))?;
    let mut missing = Vec::new();
    let mut existing = absolute.as_path();
    while !existing.exists() {
        match (existing.file_name(), existing.parent()) {
            (Some(name), Some(parent)) => {
                missing.push(name.to_os_string());
                existing = parent;
            }
            _ => break,
        }
    }
    let mut resolved = existing
        .canonicalize()
        .with_context(|| format!("canonicalize {}", existing.display()))?;
    for name in missing.iter().rev() {
        resolved.push(name);
    }
    Ok(resolved)
}

/// Create the destination root (tolerating "already exists") and return it canonicalized.
/// A destination inside the source tree is rejected before anything is created.
pub fn prepare_dest_root(dest: &Path, source_canonical: &Path) -> Result<PathBuf> {
    let planned = resolve_planned_path(dest)?;
    if planned.starts_with(source_canonical) {
        anyhow::bail!(
            "Destination {} is inside source {}",
            planned.display(),
            source_canonical.display()
        );
    }
    match std::fs::create_dir(dest) {
        Ok(()) => log::debug!("Created destination {}", dest.display()),
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            if !dest.is_dir() {
                anyhow::bail!("Destination exists and is not a directory: {}", dest.display());
            }
            log::info!("Directory '{}' already exists", dest.display());
        }
        Err(e) => {
            // missing parents: fall back to creating the whole chain
            std::fs::create_dir_all(dest)
                .map_err(|_| e)
                .with_context(|| format!("create destination {}", dest.display()))?;
            log::debug!("Created destination {}", dest.display());
        }
    }
    let dest = dest
        .canonicalize()
        .with_context(|| format!("canonicalize destination {}", dest.display()))?;
    if dest.starts_with(source_canonical) {
        anyhow::bail!(
            "Destination {} is inside source {}",
            dest.display(),
            source_canonical.display()
        );
    }
    Ok(dest)
}
