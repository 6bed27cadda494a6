use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ResolveError;

/// Opaque handle for a client process, as the host sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProcessHandle(pub u32);

/// Turns a process handle into the full path of its image.
pub trait ProcessResolver {
    fn image_path(&self, process: ProcessHandle) -> Result<PathBuf, ResolveError>;
}

/// Resolves through `/proc/<pid>/exe`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcfsResolver;

impl ProcessResolver for ProcfsResolver {
    fn image_path(&self, process: ProcessHandle) -> Result<PathBuf, ResolveError> {
        let link = PathBuf::from(format!("/proc/{}/exe", process.0));
        std::fs::read_link(&link).map_err(|source| match source.kind() {
            std::io::ErrorKind::NotFound => ResolveError::NotFound(process.0),
            _ => ResolveError::Io {
                pid: process.0,
                source,
            },
        })
    }
}

/// Fixed handle-to-path table. Unknown handles fail to resolve.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    images: HashMap<ProcessHandle, PathBuf>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, process: ProcessHandle, image: impl Into<PathBuf>) -> Self {
        self.insert(process, image);
        self
    }

    pub fn insert(&mut self, process: ProcessHandle, image: impl Into<PathBuf>) {
        self.images.insert(process, image.into());
    }
}

impl ProcessResolver for StaticResolver {
    fn image_path(&self, process: ProcessHandle) -> Result<PathBuf, ResolveError> {
        self.images
            .get(&process)
            .cloned()
            .ok_or(ResolveError::NotFound(process.0))
    }
}

/// The image's file name with every directory stripped. Directories can
/// carry user names, so they never leave this function.
///
/// Both `/` and `\` count as separators so paths reported by other
/// platforms are stripped the same way.
pub fn display_name(image: &Path) -> Option<&str> {
    let text = image.to_str()?;
    let name = text.rsplit(['/', '\\']).next()?;
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

/// Where an absolute path hangs off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Root {
    /// `X:\` or `X:/`, drive letter folded to upper case.
    Drive(u8),
    /// A leading `/` or `\`.
    Separator,
}

fn is_separator(unit: u8) -> bool {
    unit == b'/' || unit == b'\\'
}

/// Read from the text, like `display_name`, so drive-letter paths are
/// recognized on every platform.
fn root_of(path: &Path) -> Option<Root> {
    match path.to_str()?.as_bytes() {
        [drive, b':', sep, ..] if drive.is_ascii_alphabetic() && is_separator(*sep) => {
            Some(Root::Drive(drive.to_ascii_uppercase()))
        }
        [sep, ..] if is_separator(*sep) => Some(Root::Separator),
        _ => None,
    }
}

/// Whether both paths are absolute and hang off the same root (drive or `/`).
pub fn shares_root(a: &Path, b: &Path) -> bool {
    match (root_of(a), root_of(b)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}
