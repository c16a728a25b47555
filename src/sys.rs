//! Safe wrappers for platform-specific unsafe operations.
//!
//! Every `unsafe` block in the codebase lives here. Call sites use the safe
//! public API and never touch `unsafe` directly.

use std::ffi::{CStr, CString};
use std::path::Path;

/// Return available disk space in megabytes for the filesystem containing `path`.
///
/// Returns `None` if the `statvfs` call fails (e.g. path does not exist).
pub fn available_disk_mb(path: &CStr) -> Option<u64> {
    // SAFETY: statvfs is a standard POSIX call; we pass a valid CStr and a
    // zeroed struct, then check the return value before reading fields.
    unsafe {
        let mut stat: libc::statvfs = std::mem::zeroed();
        if libc::statvfs(path.as_ptr(), &mut stat) != 0 {
            return None;
        }
        #[allow(clippy::unnecessary_cast)]
        Some((stat.f_bavail as u64).saturating_mul(stat.f_frsize as u64) / (1024 * 1024))
    }
}

/// Free space for the filesystem holding `path`, walking up to the nearest
/// existing ancestor when `path` has not been created yet.
pub fn available_disk_mb_for(path: &Path) -> Option<u64> {
    let existing = path
        .ancestors()
        .find(|p| !p.as_os_str().is_empty() && p.exists())
        .unwrap_or(Path::new("."));
    let c_path = CString::new(existing.as_os_str().as_encoded_bytes()).ok()?;
    available_disk_mb(&c_path)
}
