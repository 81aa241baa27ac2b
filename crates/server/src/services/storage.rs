// Blob storage for course resources

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use tokio::{fs, io::AsyncWriteExt};
use uuid::Uuid;

use crate::error::{AppError, Result};

#[derive(Clone, Debug)]
pub struct StorageService {
    base_path: PathBuf,
}

impl StorageService {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub async fn init(&self) -> Result<()> {
        fs::create_dir_all(&self.base_path)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to create upload directory: {e}")))?;
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.base_path
    }

    pub fn path_for(&self, reference: &str) -> PathBuf {
        self.base_path.join(reference)
    }

    /// Writes `data` under the sanitized form of `file_name` and returns the
    /// storage reference. A name already in use gets a unique prefix instead
    /// of being overwritten.
    pub async fn store(&self, file_name: &str, data: &[u8]) -> Result<String> {
        let sanitized = sanitize_filename(file_name);
        if sanitized.is_empty() {
            return Err(AppError::EmptyFile);
        }

        let mut reference = sanitized.clone();
        let mut file = match self.create_new(&reference).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                reference = format!("{}_{}", Uuid::new_v4().simple(), sanitized);
                self.create_new(&reference)
                    .await
                    .map_err(|e| AppError::Internal(format!("Failed to create file: {e}")))?
            }
            Err(e) => return Err(AppError::Internal(format!("Failed to create file: {e}"))),
        };

        if let Err(e) = file.write_all(data).await {
            drop(file);
            let _ = fs::remove_file(self.path_for(&reference)).await;
            return Err(AppError::Internal(format!("Failed to write file: {e}")));
        }
        file.flush()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to write file: {e}")))?;

        Ok(reference)
    }

    pub async fn remove(&self, reference: &str) -> Result<()> {
        match fs::remove_file(self.path_for(reference)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Internal(format!("Failed to delete file: {e}"))),
        }
    }

    async fn create_new(&self, reference: &str) -> std::io::Result<fs::File> {
        fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(self.path_for(reference))
            .await
    }
}

/// Reduces an uploaded filename to a flat ASCII name that is safe to use as a
/// storage key. Separators become word breaks, so no directory component
/// survives. Returns an empty string when nothing usable is left.
pub fn sanitize_filename(name: &str) -> String {
    let spaced: String = name
        .chars()
        .filter(char::is_ascii)
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();

    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");

    let kept: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();

    kept.trim_matches(|c| c == '.' || c == '_').to_string()
}
