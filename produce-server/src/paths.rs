use std::path::{Path, PathBuf};

pub use produce_core::store::produce_root;

pub const SERVER_SOCKET: &str = "server.sock";

pub fn run_dir(home: &Path) -> PathBuf {
    produce_root(home).join("run")
}

pub fn socket_path(home: &Path) -> PathBuf {
    run_dir(home).join(SERVER_SOCKET)
}
