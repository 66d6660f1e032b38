//! Save file discovery in the server's saves directory.

use std::{
    path::{Path, PathBuf},
    time::SystemTime,
};

use crate::error::SaveFileError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveFile {
    /// File name including the `.zip` suffix.
    pub name: String,
    pub path: PathBuf,
    pub modified: SystemTime,
}

impl SaveFile {
    /// World display name, i.e. the file name without `.zip`.
    pub fn world_name(&self) -> &str {
        self.name.strip_suffix(".zip").unwrap_or(&self.name)
    }
}

fn is_zip(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"))
}

/// All `.zip` saves in `dir`, newest first.
pub async fn list_saves(dir: &Path) -> Result<Vec<SaveFile>, SaveFileError> {
    let io_err = |source: std::io::Error| SaveFileError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut entries = tokio::fs::read_dir(dir).await.map_err(io_err)?;
    let mut saves = vec![];
    while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
        let path = entry.path();
        if !is_zip(&path) {
            continue;
        }
        let meta = match entry.metadata().await {
            Ok(meta) if meta.is_file() => meta,
            _ => continue,
        };
        saves.push(SaveFile {
            name: entry.file_name().to_string_lossy().into_owned(),
            modified: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            path,
        });
    }
    saves.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| a.name.cmp(&b.name)));
    Ok(saves)
}

pub async fn latest_save(dir: &Path) -> Result<SaveFile, SaveFileError> {
    list_saves(dir)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| SaveFileError::NoSaves(dir.to_path_buf()))
}

/// Looks up a save by file name. The `.zip` suffix may be omitted.
pub async fn resolve_save(dir: &Path, name: &str) -> Result<SaveFile, SaveFileError> {
    let name = name.trim();
    if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(SaveFileError::InvalidName(name.to_owned()));
    }
    let file_name = match Path::new(name).extension() {
        None => format!("{name}.zip"),
        Some(_) if is_zip(Path::new(name)) => name.to_owned(),
        Some(_) => return Err(SaveFileError::NotZip(name.to_owned())),
    };
    let path = dir.join(&file_name);
    match tokio::fs::metadata(&path).await {
        Ok(meta) if meta.is_file() => Ok(SaveFile {
            name: file_name,
            modified: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            path,
        }),
        _ => Err(SaveFileError::NotFound(file_name)),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn touch(dir: &Path, name: &str, age: Duration) {
        let path = dir.join(name);
        std::fs::write(&path, b"PK").unwrap();
        let file = std::fs::File::options().write(true).open(&path).unwrap();
        file.set_modified(SystemTime::now() - age).unwrap();
    }

    #[tokio::test]
    async fn lists_only_zips_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "old.zip", Duration::from_secs(3600));
        touch(dir.path(), "new.zip", Duration::from_secs(10));
        touch(dir.path(), "notes.txt", Duration::ZERO);
        std::fs::create_dir(dir.path().join("dir.zip")).unwrap();

        let saves = list_saves(dir.path()).await.unwrap();
        let names: Vec<_> = saves.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["new.zip", "old.zip"]);
        assert_eq!(saves[0].world_name(), "new");
        assert_eq!(latest_save(dir.path()).await.unwrap().name, "new.zip");
    }

    #[tokio::test]
    async fn empty_dir_has_no_latest() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            latest_save(dir.path()).await,
            Err(SaveFileError::NoSaves(_))
        ));
    }

    #[tokio::test]
    async fn resolve_validates_names() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "world.zip", Duration::ZERO);

        assert_eq!(resolve_save(dir.path(), "world").await.unwrap().name, "world.zip");
        assert_eq!(resolve_save(dir.path(), "world.zip").await.unwrap().name, "world.zip");
        assert!(matches!(
            resolve_save(dir.path(), "world.tar").await,
            Err(SaveFileError::NotZip(_))
        ));
        assert!(matches!(
            resolve_save(dir.path(), "../world.zip").await,
            Err(SaveFileError::InvalidName(_))
        ));
        assert!(matches!(
            resolve_save(dir.path(), "missing").await,
            Err(SaveFileError::NotFound(_))
        ));
    }
}
