use directories::BaseDirs;
use std::path::PathBuf;

const SOCKET_NAME: &str = "blockline/control.sock";

/// Default control socket location.
///
/// Priority order:
/// 1. `$XDG_RUNTIME_DIR/blockline/control.sock` (session-scoped)
/// 2. `<cache dir>/blockline/control.sock`
/// 3. `<temp dir>/blockline/control.sock`
pub fn default_socket_path() -> PathBuf {
    let base = BaseDirs::new();
    let dir = base
        .as_ref()
        .and_then(|dirs| dirs.runtime_dir().map(PathBuf::from))
        .or_else(|| base.as_ref().map(|dirs| dirs.cache_dir().to_path_buf()))
        .unwrap_or_else(std::env::temp_dir);
    dir.join(SOCKET_NAME)
}
