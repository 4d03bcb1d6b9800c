//! Write-only JSON export of a finished session.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::session::SessionSnapshot;

/// Write `snapshot` as pretty JSON (temp file + rename).
pub fn write_transcript(path: &Path, snapshot: &SessionSnapshot) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("create transcript dir {}", parent.display()))?;
    }
    let mut buf = serde_json::to_string_pretty(snapshot).context("serialize transcript")?;
    buf.push('\n');
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, buf).with_context(|| format!("write {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace {}", path.display()))?;
    Ok(())
}
