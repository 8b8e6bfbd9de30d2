//! File access for plaintext and sealed `.env` files.

use getrandom::fill;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::error::{Result, VaultError};

/// A single UTF-8 text file read and written whole.
#[derive(Debug, Clone)]
pub struct Storage {
    path: PathBuf,
}

impl Storage {
    /// Creates a new Storage instance with the given path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns `true` if the file exists.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Loads the entire file.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::NotFound`] if the file is missing, and
    /// [`VaultError::Io`] for any other read failure.
    pub fn load(&self) -> Result<String> {
        fs::read_to_string(&self.path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => VaultError::NotFound(self.path.clone()),
            _ => VaultError::Io(e),
        })
    }

    /// Like [`Storage::load`], but a missing file is `Ok(None)`.
    pub fn load_if_exists(&self) -> Result<Option<String>> {
        match self.load() {
            Ok(text) => Ok(Some(text)),
            Err(VaultError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Saves text using an atomic write.
    ///
    /// The data goes to a randomly named temp file in the same directory,
    /// is synced, then renamed over the target; the directory is synced
    /// last. After a crash either the old or the new file is present,
    /// never a partial write.
    ///
    /// Creates parent directories if they don't exist.
    pub fn save(&self, data: &str) -> Result<()> {
        if let Some(parent) = self.parent() {
            fs::create_dir_all(parent)?;
        }

        let tmp_path = self.random_tmp_path()?;

        // fail if the temp name is somehow taken
        let mut tmp_file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp_path)?;

        if let Err(e) = tmp_file
            .write_all(data.as_bytes())
            .and_then(|_| tmp_file.sync_all())
        {
            drop(tmp_file);
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }
        drop(tmp_file);

        if let Err(e) = self.atomic_replace(&tmp_path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }

        if let Some(parent) = self.parent() {
            File::open(parent)?.sync_all()?;
        }

        Ok(())
    }

    /// Returns the path to the file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parent(&self) -> Option<&Path> {
        self.path.parent().filter(|p| !p.as_os_str().is_empty())
    }

    /// Format: `filename.tmp.<randomhex>`
    fn random_tmp_path(&self) -> Result<PathBuf> {
        let mut buf = [0u8; 8];
        fill(&mut buf).map_err(|_| VaultError::Random)?;

        let file_name = self
            .path
            .file_name()
            .ok_or_else(|| VaultError::Config(format!("{} is not a file path", self.path.display())))?
            .to_string_lossy();

        let tmp_name = format!("{}.tmp.{}", file_name, hex::encode(buf));

        Ok(self.path.with_file_name(tmp_name))
    }

    /// Atomically replaces the target file with the temporary file.
    ///
    /// Uses `ReplaceFileW` with `REPLACEFILE_WRITE_THROUGH`; falls back to a
    /// plain rename when the target does not exist yet.
    #[cfg(target_os = "windows")]
    fn atomic_replace(&self, tmp_path: &Path) -> Result<()> {
        use std::ffi::OsStr;
        use std::os::windows::ffi::OsStrExt;
        use windows_sys::Win32::Storage::FileSystem::{REPLACEFILE_WRITE_THROUGH, ReplaceFileW};

        if !self.path.exists() {
            fs::rename(tmp_path, &self.path)?;
            return Ok(());
        }

        fn to_wide(s: &OsStr) -> Vec<u16> {
            s.encode_wide().chain(std::iter::once(0)).collect()
        }

        let target_w = to_wide(self.path.as_os_str());
        let tmp_w = to_wide(tmp_path.as_os_str());

        // SAFETY:
        // - Strings are valid UTF-16 and null-terminated
        // - Pointers remain valid during the call
        // - Windows does not retain the pointers after return
        let result = unsafe {
            ReplaceFileW(
                target_w.as_ptr(),
                tmp_w.as_ptr(),
                std::ptr::null(),
                REPLACEFILE_WRITE_THROUGH,
                std::ptr::null(),
                std::ptr::null(),
            )
        };

        if result == 0 {
            return Err(std::io::Error::last_os_error().into());
        }

        Ok(())
    }

    /// On Unix, `rename()` is atomic when both paths are on the same filesystem.
    #[cfg(not(target_os = "windows"))]
    fn atomic_replace(&self, tmp_path: &Path) -> Result<()> {
        fs::rename(tmp_path, &self.path)?;
        Ok(())
    }
}

/// Makes sure `.gitignore` in `root` lists the file name of `secret`.
///
/// Sealed `.enc` files are meant to be committed and are never added.
/// Returns `true` if `.gitignore` was created or changed.
pub fn ensure_gitignored(root: &Path, secret: &Path) -> Result<bool> {
    let Some(file_name) = secret.file_name().map(|n| n.to_string_lossy().into_owned()) else {
        return Ok(false);
    };

    if file_name.ends_with(".enc") {
        return Ok(false);
    }

    let gitignore = Storage::new(root.join(".gitignore"));
    let updated = match gitignore.load_if_exists()? {
        None => format!("# Added by lazy-vault\n{file_name}\n"),
        Some(content) => {
            if content.lines().any(|l| l.trim() == file_name) {
                return Ok(false);
            }
            let sep = if content.is_empty() || content.ends_with('\n') {
                ""
            } else {
                "\n"
            };
            format!("{content}{sep}{file_name}\n")
        }
    };

    gitignore.save(&updated)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    // --------------------------------------------------
    // LOAD TESTS
    // --------------------------------------------------

    #[test]
    fn load_returns_written_data() {
        let dir = tempdir().unwrap();
        let storage = Storage::new(dir.path().join(".env"));

        storage.save("A=1\nB=2").unwrap();
        assert_eq!(storage.load().unwrap(), "A=1\nB=2");
    }

    #[test]
    fn load_missing_file_is_not_found() {
        let dir = tempdir().unwrap();
        let storage = Storage::new(dir.path().join("missing.env"));

        assert!(matches!(storage.load(), Err(VaultError::NotFound(_))));
        assert!(storage.load_if_exists().unwrap().is_none());
    }

    #[test]
    fn load_non_utf8_is_io_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".env");
        fs::write(&path, [0xff, 0xfe, 0x00]).unwrap();

        assert!(matches!(Storage::new(path).load(), Err(VaultError::Io(_))));
    }

    // --------------------------------------------------
    // SAVE TESTS
    // --------------------------------------------------

    #[test]
    fn save_replaces_existing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".env.enc");
        let storage = Storage::new(path.clone());

        storage.save("first").unwrap();
        storage.save("second").unwrap();

        assert_eq!(fs::read_to_string(path).unwrap(), "second");
    }

    #[test]
    fn tmp_file_is_removed_after_success() {
        let dir = tempdir().unwrap();
        let storage = Storage::new(dir.path().join(".env.enc"));
        storage.save("data").unwrap();

        let entries: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();

        assert_eq!(entries, vec![".env.enc"]);
    }

    #[test]
    fn parent_directory_is_created() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a").join("b").join(".env");

        Storage::new(nested.clone()).save("data").unwrap();
        assert!(nested.exists());
    }

    #[test]
    fn tmp_names_are_unique_and_siblings() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".env");
        let storage = Storage::new(path.clone());

        let a = storage.random_tmp_path().unwrap();
        let b = storage.random_tmp_path().unwrap();

        assert_ne!(a, b);
        assert_ne!(a, path);
        assert_eq!(a.parent(), path.parent());
    }

    // --------------------------------------------------
    // GITIGNORE TESTS
    // --------------------------------------------------

    #[test]
    fn gitignore_is_created() {
        let dir = tempdir().unwrap();

        assert!(ensure_gitignored(dir.path(), Path::new(".env")).unwrap());

        let content = fs::read_to_string(dir.path().join(".gitignore")).unwrap();
        assert_eq!(content, "# Added by lazy-vault\n.env\n");
    }

    #[test]
    fn gitignore_is_appended_once() {
        let dir = tempdir().unwrap();
        let gitignore = dir.path().join(".gitignore");
        fs::write(&gitignore, "target").unwrap();

        assert!(ensure_gitignored(dir.path(), Path::new(".env.prod")).unwrap());
        assert!(!ensure_gitignored(dir.path(), Path::new(".env.prod")).unwrap());

        assert_eq!(fs::read_to_string(gitignore).unwrap(), "target\n.env.prod\n");
    }

    #[test]
    fn gitignore_matches_whole_lines() {
        let dir = tempdir().unwrap();
        let gitignore = dir.path().join(".gitignore");
        fs::write(&gitignore, ".env.local\n").unwrap();

        assert!(ensure_gitignored(dir.path(), Path::new(".env")).unwrap());
        assert_eq!(fs::read_to_string(gitignore).unwrap(), ".env.local\n.env\n");
    }

    #[test]
    fn encrypted_files_are_never_ignored() {
        let dir = tempdir().unwrap();

        assert!(!ensure_gitignored(dir.path(), Path::new(".env.enc")).unwrap());
        assert!(!dir.path().join(".gitignore").exists());
    }
}
