use std::io;
use std::path::{Path, PathBuf};

/// Reports the bytes currently available on the volume hosting a job's
/// target. Used for the time-left estimate and to classify write failures;
/// never to decide when to stop writing.
pub trait FreeSpace: Send + Sync {
    fn free_bytes(&self) -> io::Result<u64>;
}

/// Free space of the real volume containing `path`.
#[derive(Debug, Clone)]
pub struct VolumeFreeSpace {
    path: PathBuf,
}

impl VolumeFreeSpace {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The volume hosting `target`, queried through its parent directory so
    /// the lookup works before the file exists.
    pub fn for_target(target: &Path) -> Self {
        let dir = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        Self::new(dir)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FreeSpace for VolumeFreeSpace {
    fn free_bytes(&self) -> io::Result<u64> {
        available_bytes(&self.path)
    }
}

#[cfg(unix)]
fn available_bytes(path: &Path) -> io::Result<u64> {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let c_path = CString::new(path.as_os_str().as_bytes()).map_err(|e| {
        io::Error::new(io::ErrorKind::InvalidInput, format!("Invalid volume path: {}", e))
    })?;
    let mut stat: libc::statvfs = unsafe { std::mem::zeroed() };
    if unsafe { libc::statvfs(c_path.as_ptr(), &mut stat) } != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok((stat.f_bavail as u64).saturating_mul(stat.f_frsize as u64))
}

#[cfg(windows)]
fn available_bytes(path: &Path) -> io::Result<u64> {
    use std::os::windows::ffi::OsStrExt;
    use winapi::um::fileapi::GetDiskFreeSpaceExW;
    use winapi::um::winnt::ULARGE_INTEGER;

    let mut wide: Vec<u16> = path.as_os_str().encode_wide().collect();
    wide.push(0);
    let mut available: ULARGE_INTEGER = unsafe { std::mem::zeroed() };
    let mut total: ULARGE_INTEGER = unsafe { std::mem::zeroed() };
    let mut total_free: ULARGE_INTEGER = unsafe { std::mem::zeroed() };
    let ok = unsafe {
        GetDiskFreeSpaceExW(wide.as_ptr(), &mut available, &mut total, &mut total_free)
    };
    if ok == 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(unsafe { *available.QuadPart() })
}

#[cfg(not(any(unix, windows)))]
fn available_bytes(_path: &Path) -> io::Result<u64> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "Free space query is not supported on this platform.",
    ))
}
