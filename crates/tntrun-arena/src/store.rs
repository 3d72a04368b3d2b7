//! Arena definition files.
//!
//! One file per arena, `<dir>/<name>.<ext>`, holding exactly the
//! [`ArenaDefinition`] fields. The file stem is the arena name.

use std::fs;
use std::path::{Path, PathBuf};

use tntrun_types::{ArenaDefinition, ArenaTemplate, Codec, JsonCodec};
use tracing::debug;

use crate::ArenaError;

/// Reads and writes arena definitions in one directory, in the format of
/// its codec.
pub struct ArenaStore<C: Codec = JsonCodec> {
    dir: PathBuf,
    codec: C,
}

impl ArenaStore<JsonCodec> {
    /// A JSON store in `dir`.
    pub fn json(dir: impl Into<PathBuf>) -> Self {
        Self::new(dir, JsonCodec)
    }
}

impl<C: Codec> ArenaStore<C> {
    /// The directory is created on the first save.
    pub fn new(dir: impl Into<PathBuf>, codec: C) -> Self {
        Self {
            dir: dir.into(),
            codec,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File holding the definition of arena `name`.
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.{}", self.codec.extension()))
    }

    /// Reads every definition file, sorted by arena name.
    ///
    /// A file that cannot be read or decoded is returned as an error in
    /// its slot; it does not stop the others from loading. A missing
    /// directory means no arenas.
    pub fn load_all(&self) -> Result<Vec<(String, Result<ArenaDefinition, ArenaError>)>, ArenaError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let entries = fs::read_dir(&self.dir).map_err(|e| self.io_error(&self.dir, e))?;

        let mut found = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| self.io_error(&self.dir, e))?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(self.codec.extension()) {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let result = fs::read(&path)
                .map_err(|e| self.io_error(&path, e))
                .and_then(|bytes| Ok(self.codec.decode::<ArenaDefinition>(&bytes)?));
            found.push((name.to_string(), result));
        }
        found.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(found)
    }

    /// Writes one definition, replacing the previous file.
    pub fn save(&self, name: &str, definition: &ArenaDefinition) -> Result<(), ArenaError> {
        fs::create_dir_all(&self.dir).map_err(|e| self.io_error(&self.dir, e))?;
        let bytes = self.codec.encode(definition)?;

        // Write then rename so a crash never leaves half a file behind.
        let path = self.path_for(name);
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, bytes).map_err(|e| self.io_error(&tmp, e))?;
        fs::rename(&tmp, &path).map_err(|e| self.io_error(&path, e))?;

        debug!(arena = %name, path = %path.display(), "arena definition saved");
        Ok(())
    }

    /// Reads the new-arena template `<dir>/<stem>.<ext>`, written in the
    /// store's format. A missing file is `Ok(None)`.
    pub fn load_template(&self, dir: &Path, stem: &str) -> Result<Option<ArenaTemplate>, ArenaError> {
        let path = dir.join(format!("{stem}.{}", self.codec.extension()));
        if !path.is_file() {
            return Ok(None);
        }
        let bytes = fs::read(&path).map_err(|e| self.io_error(&path, e))?;
        let template = self.codec.decode::<ArenaTemplate>(&bytes)?;
        debug!(path = %path.display(), "arena template loaded");
        Ok(Some(template))
    }

    fn io_error(&self, path: &Path, source: std::io::Error) -> ArenaError {
        ArenaError::Store {
            path: path.to_path_buf(),
            source,
        }
    }
}
