//! Path translation between the host and the environment kshdb runs in.
//!
//! On Windows hosts the debugger runs under WSL, so `C:\src\a.sh` is seen
//! by it as `/mnt/c/src/a.sh`. Elsewhere both sides agree and the helpers
//! are identity functions.

use std::path::{Component, Path, PathBuf};

/// Whether host paths must be rewritten for the debugger's environment.
pub fn host_uses_wsl() -> bool {
    cfg!(windows)
}

/// Convert a Windows path to its WSL mount form.
pub fn to_wsl_path(path: &str) -> String {
    let bytes = path.as_bytes();
    if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
        let drive = (bytes[0] as char).to_ascii_lowercase();
        let rest = path[2..].replace('\\', "/");
        let rest = rest.trim_start_matches('/');
        if rest.is_empty() {
            return format!("/mnt/{drive}");
        }
        return format!("/mnt/{drive}/{rest}");
    }
    path.replace('\\', "/")
}

/// Convert a WSL mount path back to a Windows path.
///
/// Paths outside `/mnt/<drive>` are returned unchanged.
pub fn from_wsl_path(path: &str) -> String {
    let Some(rest) = path.strip_prefix("/mnt/") else {
        return path.to_string();
    };
    let mut chars = rest.chars();
    let drive = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => c.to_ascii_uppercase(),
        _ => return path.to_string(),
    };
    let tail = chars.as_str();
    if !(tail.is_empty() || tail.starts_with('/')) {
        return path.to_string();
    }
    let tail = tail.trim_start_matches('/');
    format!("{drive}:\\{}", tail.replace('/', "\\"))
}

/// Host path as the debugger should see it.
pub fn to_debugger_path(path: &str) -> String {
    if host_uses_wsl() {
        to_wsl_path(path)
    } else {
        path.to_string()
    }
}

/// Debugger-side path as the host should see it.
pub fn to_host_path(path: &str) -> String {
    if host_uses_wsl() {
        from_wsl_path(path)
    } else {
        path.to_string()
    }
}

/// Make `path` absolute against `cwd` and fold `.` / `..` components
/// lexically.
pub fn absolutize(path: &Path, cwd: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    };
    let mut out = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wsl_path_from_drive_letter() {
        assert_eq!(to_wsl_path("C:\\src\\a.sh"), "/mnt/c/src/a.sh");
        assert_eq!(to_wsl_path("d:/work"), "/mnt/d/work");
        assert_eq!(to_wsl_path("C:\\"), "/mnt/c");
    }

    #[test]
    fn wsl_path_without_drive_only_flips_separators() {
        assert_eq!(to_wsl_path("src\\a.sh"), "src/a.sh");
        assert_eq!(to_wsl_path("/tmp/a.sh"), "/tmp/a.sh");
    }

    #[test]
    fn windows_path_from_wsl_mount() {
        assert_eq!(from_wsl_path("/mnt/c/src/a.sh"), "C:\\src\\a.sh");
        assert_eq!(from_wsl_path("/mnt/c"), "C:\\");
    }

    #[test]
    fn non_mount_paths_are_untouched() {
        assert_eq!(from_wsl_path("/tmp/a.sh"), "/tmp/a.sh");
        assert_eq!(from_wsl_path("/mnt/cdrom/x"), "/mnt/cdrom/x");
    }

    #[cfg(unix)]
    #[test]
    fn absolutize_relative_against_cwd() {
        let cwd = Path::new("/home/user/project");
        assert_eq!(
            absolutize(Path::new("./lib/../a.sh"), cwd),
            PathBuf::from("/home/user/project/a.sh")
        );
        assert_eq!(
            absolutize(Path::new("/tmp/a.sh"), cwd),
            PathBuf::from("/tmp/a.sh")
        );
    }
}
