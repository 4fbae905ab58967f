use std::path::{Path, PathBuf};

/// Finds a decorative icon for an application. Nothing in aggregation depends on the answer.
pub trait IconProvider {
    fn icon_for(&self, identifier: &str, executable_path: Option<&Path>) -> Option<PathBuf>;
}

/// Looks icons up in `<dir>/icons/<identifier>.png`. Extracting icons from executables is left to
/// whatever fills the directory.
pub struct IconCache {
    icon_dir: PathBuf,
}

impl IconCache {
    pub fn new(app_dir: &Path) -> Self {
        Self {
            icon_dir: app_dir.join("icons"),
        }
    }

    fn icon_path(&self, identifier: &str) -> PathBuf {
        let sanitized = identifier
            .chars()
            .map(|c| match c {
                '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
                c => c,
            })
            .collect::<String>();
        self.icon_dir.join(format!("{sanitized}.png"))
    }
}

impl IconProvider for IconCache {
    fn icon_for(&self, identifier: &str, _executable_path: Option<&Path>) -> Option<PathBuf> {
        let path = self.icon_path(identifier);
        path.is_file().then_some(path)
    }
}

pub struct NoIcons;

impl IconProvider for NoIcons {
    fn icon_for(&self, _identifier: &str, _executable_path: Option<&Path>) -> Option<PathBuf> {
        None
    }
}
