#![allow(dead_code)]

use assert_cmd::Command;
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

/// `nestbox` binary isolated from the caller's environment.
pub fn nestbox() -> Command {
    let bin_path: &str = env!("CARGO_BIN_EXE_nestbox");
    let mut cmd = Command::new(bin_path);
    cmd.timeout(Duration::from_secs(30));
    cmd.env_remove("RUST_LOG")
        .env_remove("NESTBOX_INIT_POLICY")
        .env_remove("NESTBOX_ALLOCATION_BUDGET");
    cmd
}

/// Options file for `--config`; removed when dropped.
pub fn config_file(json: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(json.as_bytes()).unwrap();
    file
}
