use std::fs;
use std::path::PathBuf;

use tracing::warn;

use crate::error::ValidationError;

#[derive(Debug, PartialEq)]
pub enum DirEntryCategory {
    DoesNotExist,
    RegularFile,
    Directory,
    Unknown,
}

// follows symlinks, so a link to a directory counts as a directory
pub fn classify_file(path: &PathBuf) -> DirEntryCategory {
    match fs::metadata(path) {
        Ok(metadata) => {
            if metadata.is_file() {
                DirEntryCategory::RegularFile
            } else if metadata.is_dir() {
                DirEntryCategory::Directory
            } else {
                DirEntryCategory::Unknown
            }
        },
        Err(_) => DirEntryCategory::DoesNotExist,
    }
}

const WRITE_CHECK_FILE: &str = ".compress-to-size-write-check";

pub fn check_output_dir(path: &PathBuf) -> Result<(), ValidationError> {
    if path.as_os_str().is_empty() {
        return Err(ValidationError::InvalidOutputDir(path.clone()));
    }
    match classify_file(path) {
        DirEntryCategory::Directory => {
            if can_write_in(path) {
                Ok(())
            } else {
                Err(ValidationError::ReadOnlyOutputDir(path.clone()))
            }
        },
        _ => Err(ValidationError::InvalidOutputDir(path.clone())),
    }
}

// mode bits alone say nothing about the current user, so actually try it
fn can_write_in(dir: &PathBuf) -> bool {
    let check = dir.join(WRITE_CHECK_FILE);
    match fs::File::create(&check) {
        Ok(_) => {
            if let Err(err) = fs::remove_file(&check) {
                warn!(file = %check.display(), "unable to remove write check: {}", err);
            }
            true
        },
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::tempdir;

    #[test]
    fn test_classify_file() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("clip.mp4");
        File::create(&file).unwrap();
        assert_eq!(classify_file(&dir.path().to_path_buf()), DirEntryCategory::Directory);
        assert_eq!(classify_file(&file), DirEntryCategory::RegularFile);
        assert_eq!(classify_file(&dir.path().join("missing")), DirEntryCategory::DoesNotExist);
    }

    #[test]
    fn test_check_output_dir() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("clip.mp4");
        File::create(&file).unwrap();
        assert_eq!(check_output_dir(&dir.path().to_path_buf()), Ok(()));
        assert_eq!(check_output_dir(&file), Err(ValidationError::InvalidOutputDir(file.clone())));
        assert_eq!(check_output_dir(&PathBuf::new()), Err(ValidationError::InvalidOutputDir(PathBuf::new())));
    }

    #[test]
    fn test_check_output_dir_leaves_nothing_behind() {
        let dir = tempdir().unwrap();
        assert_eq!(check_output_dir(&dir.path().to_path_buf()), Ok(()));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_writability_follows_real_access_not_mode_bits() {
        let dir = tempdir().unwrap();
        let locked = dir.path().join("locked");
        fs::create_dir(&locked).unwrap();
        let mut permissions = fs::metadata(&locked).unwrap().permissions();
        permissions.set_readonly(true);
        fs::set_permissions(&locked, permissions.clone()).unwrap();

        // root can still write into a 0555 directory, everyone else cannot
        let scratch = locked.join("scratch");
        let writable = File::create(&scratch).is_ok();
        let _ = fs::remove_file(&scratch);
        let expected = if writable { Ok(()) } else { Err(ValidationError::ReadOnlyOutputDir(locked.clone())) };
        assert_eq!(check_output_dir(&locked), expected);

        permissions.set_readonly(false);
        fs::set_permissions(&locked, permissions).unwrap();
        assert_eq!(check_output_dir(&locked), Ok(()));
        assert_eq!(fs::read_dir(&locked).unwrap().count(), 0);
    }
}
