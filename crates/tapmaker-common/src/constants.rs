//! System-wide constants and well-known kernel paths.

use std::path::PathBuf;
use std::time::Duration;

/// Device name used when the operator does not pass `--tap-name`.
pub const DEFAULT_TAP_NAME: &str = "tap0";

/// Owner UID/GID used when the operator does not pass `--uid`/`--gid`.
pub const DEFAULT_OWNER_ID: u32 = 0;

/// Mount point of procfs.
pub const PROC_ROOT: &str = "/proc";

/// Network namespace of the calling thread.
pub const THREAD_SELF_NET_NS: &str = "/proc/thread-self/ns/net";

/// TUN/TAP clone device.
pub const TUN_CLONE_DEVICE: &str = "/dev/net/tun";

/// Sleep between liveness checks while `consume-tap` holds its device.
pub const HOLD_INTERVAL: Duration = Duration::from_secs(1);

/// Binary name for the CLI.
pub const BIN_NAME: &str = "tap-maker";

/// Returns the network namespace file of process `pid`.
///
/// The template `/proc/<pid>/ns/net` is fixed by the kernel.
pub fn net_ns_path(pid: impl std::fmt::Display) -> PathBuf {
    PathBuf::from(PROC_ROOT).join(pid.to_string()).join("ns/net")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn net_ns_path_follows_proc_layout() {
        assert_eq!(net_ns_path(1234), PathBuf::from("/proc/1234/ns/net"));
    }
}
