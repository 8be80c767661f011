//! Writing generated files to disk
//!
//! Every file staged in a [`MemoryFS`] is written below the output
//! directory. Parent directories are created as needed and, on Unix, the
//! staged mode is applied. The first failure aborts the run; files that
//! were already written stay in place.

use std::fs;
use std::path::Path;

use log::info;

use crate::error::{Error, Result};
use crate::filesystem::MemoryFS;

/// Write all staged files below `output_path`.
pub fn execute(staged: &MemoryFS, output_path: &Path) -> Result<()> {
    for (relative_path, file) in staged.files() {
        let full_path = output_path.join(relative_path);

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::file(parent, e))?;
        }

        fs::write(&full_path, &file.content).map_err(|e| Error::file(&full_path, e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(file.permissions);
            fs::set_permissions(&full_path, perms).map_err(|e| Error::file(&full_path, e))?;
        }

        info!("wrote {}", full_path.display());
    }

    Ok(())
}
