use std::path::{Path, PathBuf};

/// Environment variable pointing at an explicit Chromium/Chrome binary
pub const CHROMIUM_PATH_ENV: &str = "PLAYWRIGHT_CHROMIUM_EXECUTABLE_PATH";

const COMMON_PATHS: &[&str] = &[
    // macOS
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    "/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge",
    // Linux
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/snap/bin/chromium",
];

const PATH_NAMES: &[&str] = &[
    "google-chrome",
    "google-chrome-stable",
    "chromium",
    "chromium-browser",
    "chrome",
];

/// Find a Chromium-family executable.
///
/// Order: env override, well-known install paths, then `PATH`.
/// `None` lets Playwright fall back to its own bundled browser.
pub fn find_chromium() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os(CHROMIUM_PATH_ENV).map(PathBuf::from) {
        if path.exists() {
            return Some(path);
        }
        log::warn!(
            "{} points to missing file: {}",
            CHROMIUM_PATH_ENV,
            path.display()
        );
    }

    if let Some(path) = first_existing(COMMON_PATHS.iter().map(Path::new)) {
        return Some(path);
    }

    PATH_NAMES.iter().find_map(|name| which::which(name).ok())
}

fn first_existing<'a>(mut candidates: impl Iterator<Item = &'a Path>) -> Option<PathBuf> {
    candidates.find(|p| p.exists()).map(Path::to_path_buf)
}
