//! Finding the files a batch works on.
//!
//! Walks are recursive and sorted by file name so progress lines come out
//! in a stable order.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use regex::Regex;
use walkdir::WalkDir;

use crate::fonts::is_font_file;

pub(crate) fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .is_some_and(|e| e.to_string_lossy().eq_ignore_ascii_case(ext))
}

/// Every regular file under `dir` accepted by `keep`.
fn walk_files(dir: &Path, keep: impl Fn(&Path) -> bool) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_file() && keep(entry.path()) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// `.mkv` files under `dir`.
pub fn find_mkvs(dir: &Path) -> io::Result<Vec<PathBuf>> {
    walk_files(dir, |p| has_extension(p, "mkv"))
}

/// Files under `dir` that have an extension.
pub fn find_media(dir: &Path) -> io::Result<Vec<PathBuf>> {
    walk_files(dir, |p| p.extension().is_some())
}

/// Font files under `dir`; a missing directory holds none.
pub fn find_fonts(dir: &Path) -> io::Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    walk_files(dir, is_font_file)
}

/// Direct children of `dir` with extension `ext`; a missing directory
/// holds none.
pub fn list_with_extension(dir: &Path, ext: &str) -> io::Result<Vec<PathBuf>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };
    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && has_extension(&path, ext) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Subtitle files belonging to a video with stem `stem`: file names that
/// start with the stem and carry an extension (`ep01.ass`, `ep01.chs.ass`).
pub fn companions<'p>(candidates: &'p [PathBuf], stem: &str) -> Vec<&'p PathBuf> {
    let pattern = format!(r"^{}\S*\.\S+$", regex::escape(stem));
    let Ok(re) = Regex::new(&pattern) else {
        return Vec::new();
    };
    candidates
        .iter()
        .filter(|p| {
            p.file_name()
                .is_some_and(|n| re.is_match(&n.to_string_lossy()))
        })
        .collect()
}

/// Parent of `file` relative to `root` (empty when directly inside).
pub fn relative_dir(root: &Path, file: &Path) -> PathBuf {
    file.strip_prefix(root)
        .ok()
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .unwrap_or_default()
}

/// File stem as a string.
pub fn stem_of(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"x").unwrap();
    }

    #[test]
    fn finds_mkvs_sorted_and_recursive() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("b.mkv"));
        touch(&dir.path().join("a.MKV"));
        touch(&dir.path().join("s1").join("c.mkv"));
        touch(&dir.path().join("notes.txt"));

        let found = find_mkvs(dir.path()).unwrap();
        assert_eq!(
            found,
            vec![
                dir.path().join("a.MKV"),
                dir.path().join("b.mkv"),
                dir.path().join("s1").join("c.mkv"),
            ]
        );
    }

    #[test]
    fn missing_root_is_an_error_for_walks() {
        let dir = tempdir().unwrap();
        assert!(find_mkvs(&dir.path().join("nope")).is_err());
        assert!(find_fonts(&dir.path().join("nope")).unwrap().is_empty());
        assert!(list_with_extension(&dir.path().join("nope"), "sub")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn companion_files_match_on_stem() {
        let files: Vec<PathBuf> = [
            "/subs/ep01.ass",
            "/subs/ep01.chs.ass",
            "/subs/ep010.ass",
            "/subs/xep01.ass",
            "/subs/ep01",
            "/subs/ep02.sub",
        ]
        .iter()
        .map(PathBuf::from)
        .collect();

        let found: Vec<&PathBuf> = companions(&files, "ep01");
        assert_eq!(found, vec![&files[0], &files[1], &files[2]]);
        // Regex metacharacters in stems are literal
        assert!(companions(&files, "ep.1").is_empty());
    }

    #[test]
    fn relative_dirs() {
        let root = Path::new("/media");
        assert_eq!(
            relative_dir(root, Path::new("/media/show/s1/ep01.mkv")),
            PathBuf::from("show/s1")
        );
        assert_eq!(relative_dir(root, Path::new("/media/ep01.mkv")), PathBuf::new());
        assert_eq!(stem_of(Path::new("/media/ep01.mkv")), "ep01");
    }
}
