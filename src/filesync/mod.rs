//! Local file collaborator.
//!
//! The task list on disk is read whole and, on pull, replaced whole. Writes
//! go through a sibling temp file and a rename.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub trait LocalText {
    fn read_text(&self, path: &Path) -> io::Result<String>;
    fn write_text(&self, path: &Path, text: &str) -> io::Result<()>;
}

impl<T: LocalText + ?Sized> LocalText for &T {
    fn read_text(&self, path: &Path) -> io::Result<String> {
        (**self).read_text(path)
    }

    fn write_text(&self, path: &Path, text: &str) -> io::Result<()> {
        (**self).write_text(path, text)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FsLocalText;

impl LocalText for FsLocalText {
    fn read_text(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }

    fn write_text(&self, path: &Path, text: &str) -> io::Result<()> {
        write_atomic(path, text.as_bytes())
    }
}

pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let temp_path = temp_path_for(path);
    fs::write(&temp_path, contents)?;
    if let Err(err) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(err);
    }
    Ok(())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
