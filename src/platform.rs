use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    MacOS,
    Linux,
    Windows,
    Unknown,
}

pub fn detect() -> Platform {
    match std::env::consts::OS {
        "macos" => Platform::MacOS,
        "linux" => Platform::Linux,
        "windows" => Platform::Windows,
        _ => Platform::Unknown,
    }
}

// ERROR_ACCESS_DENIED, ERROR_SHARING_VIOLATION, ERROR_LOCK_VIOLATION
const WINDOWS_LOCK_ERRORS: [i32; 3] = [5, 32, 33];

/// Returns true when a rename failed because another process holds the
/// destination open. Only Windows reports this; a spreadsheet keeping the CSV
/// open surfaces as access denied or a sharing violation. Unix renames over
/// an open file succeed, so a PermissionDenied there is a plain I/O error.
pub fn is_sharing_violation(err: &io::Error) -> bool {
    is_sharing_violation_on(detect(), err)
}

fn is_sharing_violation_on(platform: Platform, err: &io::Error) -> bool {
    if platform != Platform::Windows {
        return false;
    }
    err.kind() == io::ErrorKind::PermissionDenied
        || err
            .raw_os_error()
            .is_some_and(|code| WINDOWS_LOCK_ERRORS.contains(&code))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn windows_access_denied_counts_as_locked() {
        let err = io::Error::from(io::ErrorKind::PermissionDenied);
        assert!(is_sharing_violation_on(Platform::Windows, &err));
        assert!(is_sharing_violation_on(
            Platform::Windows,
            &io::Error::from_raw_os_error(32)
        ));
    }

    #[test]
    fn unix_permission_denied_is_not_locked() {
        let err = io::Error::from(io::ErrorKind::PermissionDenied);
        assert!(!is_sharing_violation_on(Platform::Linux, &err));
        assert!(!is_sharing_violation_on(Platform::MacOS, &err));
    }

    #[test]
    fn missing_file_is_not_locked() {
        let err = io::Error::from(io::ErrorKind::NotFound);
        assert!(!is_sharing_violation(&err));
        assert!(!is_sharing_violation_on(Platform::Windows, &err));
    }
}
