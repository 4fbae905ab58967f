use std::path::PathBuf;

/// Path of the standalone daemon binary, expected next to the cli binary.
pub fn to_daemon_path(mut path: PathBuf) -> PathBuf {
    path.set_file_name("apptally-daemon");
    #[cfg(windows)]
    {
        path.set_extension("exe");
    }
    path
}
