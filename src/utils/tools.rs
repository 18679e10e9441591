use std::{
    env,
    path::{Path, PathBuf},
};

/// Locates an executable the way a shell would.
///
/// Names containing a path separator are checked directly, anything else is looked
/// up in the directories of `PATH`.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    if name.is_empty() {
        return None;
    }
    let candidate = Path::new(name);
    if candidate.components().count() > 1 {
        return is_executable(candidate).then(|| candidate.to_path_buf());
    }
    let paths = env::var_os("PATH")?;
    env::split_paths(&paths).find_map(|dir| {
        executable_names(name)
            .into_iter()
            .map(|file| dir.join(file))
            .find(|path| is_executable(path))
    })
}

#[cfg(windows)]
fn executable_names(name: &str) -> Vec<String> {
    if Path::new(name).extension().is_some() {
        vec![name.to_string()]
    } else {
        vec![name.to_string(), format!("{name}.exe")]
    }
}

#[cfg(not(windows))]
fn executable_names(name: &str) -> Vec<String> {
    vec![name.to_string()]
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::{fs, os::unix::fs::PermissionsExt};
    use tempfile::tempdir;

    fn write_script(path: &Path, mode: u32) {
        fs::write(path, "#!/bin/sh\nexit 0\n").unwrap();
        fs::set_permissions(path, fs::Permissions::from_mode(mode)).unwrap();
    }

    #[test]
    fn explicit_path_requires_exec_bit() {
        let dir = tempdir().unwrap();
        let runnable = dir.path().join("runnable");
        let plain = dir.path().join("plain");
        write_script(&runnable, 0o755);
        write_script(&plain, 0o644);

        assert_eq!(
            find_executable(runnable.to_str().unwrap()),
            Some(runnable.clone())
        );
        assert_eq!(find_executable(plain.to_str().unwrap()), None);
    }

    #[test]
    fn bare_names_are_searched_in_path() {
        assert!(find_executable("sh").is_some());
        assert_eq!(find_executable("prionscan-no-such-tool"), None);
        assert_eq!(find_executable(""), None);
    }
}
