//! Device and namespace tests against a real kernel.
//!
//! These need `CAP_NET_ADMIN` and `CAP_SYS_ADMIN` plus the `unshare` and
//! `ip` binaries, so they are ignored by default. Run them as root with:
//!
//! ```text
//! cargo test -p tapmaker-core -- --ignored
//! ```

#![cfg(target_os = "linux")]
#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

use std::process::{Child, Command};
use std::time::{Duration, Instant};

use tapmaker_common::error::{TapMakerError, TapStep};
use tapmaker_common::types::{DeviceSpec, TargetPid};
use tapmaker_core::namespace::NetNamespace;
use tapmaker_core::provision::create_tap;
use tapmaker_core::tap::create_tap_device;

/// A `sleep` process parked in a fresh network namespace.
struct Launcher {
    child: Child,
}

impl Launcher {
    fn spawn() -> Self {
        let child = Command::new("unshare")
            .args(["--net", "sleep", "60"])
            .spawn()
            .expect("spawn unshare");
        let launcher = Self { child };

        let ours = NetNamespace::current().unwrap().id().unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if let Ok(ns) = NetNamespace::of_pid(launcher.pid()) {
                if ns.id().unwrap() != ours {
                    return launcher;
                }
            }
            std::thread::sleep(Duration::from_millis(20));
        }
        panic!("launcher never entered its own network namespace");
    }

    fn pid(&self) -> TargetPid {
        TargetPid::new(i32::try_from(self.child.id()).unwrap()).unwrap()
    }

    fn has_interface(&self, name: &str) -> bool {
        NetNamespace::of_pid(self.pid())
            .unwrap()
            .run(|| Ok(nix::net::if_::if_nametoindex(name).is_ok()))
            .unwrap()
    }
}

impl Drop for Launcher {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

fn unique_name(prefix: &str) -> String {
    format!("{prefix}{}", std::process::id() % 100_000)
}

#[test]
#[ignore = "requires root"]
fn create_tap_lands_in_launcher_namespace_only() {
    let launcher = Launcher::spawn();
    let name = unique_name("vn");
    let spec = DeviceSpec::new(&name, 1000, 1000).unwrap();

    create_tap(launcher.pid(), &spec).expect("create tap");

    assert!(launcher.has_interface(&name));
    assert!(nix::net::if_::if_nametoindex(name.as_str()).is_err());
}

#[test]
#[ignore = "requires root"]
fn create_tap_restores_calling_namespace() {
    let launcher = Launcher::spawn();
    let before = NetNamespace::current().unwrap().id().unwrap();

    let spec = DeviceSpec::new(unique_name("rs"), 0, 0).unwrap();
    create_tap(launcher.pid(), &spec).expect("create tap");
    assert_eq!(NetNamespace::current().unwrap().id().unwrap(), before);

    // A failing work unit must not strand the thread either.
    let err = create_tap(launcher.pid(), &spec).expect_err("duplicate name");
    assert!(matches!(err, TapMakerError::DeviceExists { .. }));
    assert_eq!(NetNamespace::current().unwrap().id().unwrap(), before);
}

fn sys_attr(name: &str, attr: &str) -> std::io::Result<String> {
    std::fs::read_to_string(format!("/sys/class/net/{name}/{attr}")).map(|s| s.trim().to_string())
}

// Runs in the current namespace: sysfs shows the namespace it was mounted in.
#[test]
#[ignore = "requires root"]
fn duplicate_name_fails_without_touching_existing_device() {
    let name = unique_name("dp");
    drop(create_tap_device(&DeviceSpec::new(&name, 1000, 1000).unwrap()).expect("first"));
    let before = (sys_attr(&name, "owner"), sys_attr(&name, "group"));

    let err = create_tap_device(&DeviceSpec::new(&name, 0, 0).unwrap());
    let after = (sys_attr(&name, "owner"), sys_attr(&name, "group"));

    let _ = Command::new("ip").args(["link", "delete", &name]).status();

    assert!(matches!(err, Err(TapMakerError::DeviceExists { .. })));
    assert_eq!(before.0.unwrap(), "1000");
    assert_eq!(before.1.unwrap(), "1000");
    assert_eq!(after.0.unwrap(), "1000");
    assert_eq!(after.1.unwrap(), "1000");
}

#[test]
#[ignore = "requires root"]
fn template_name_is_refused_and_leaves_nothing_behind() {
    let launcher = Launcher::spawn();
    let spec = DeviceSpec::new("pr%d", 0, 0).unwrap();

    let err = create_tap(launcher.pid(), &spec).expect_err("template name");

    assert!(matches!(
        err,
        TapMakerError::DeviceCreation {
            step: TapStep::Attach,
            ..
        }
    ));
    assert!(!launcher.has_interface("pr0"));
}

#[test]
#[ignore = "requires root"]
fn persistent_device_outlives_its_descriptor() {
    let launcher = Launcher::spawn();
    let name = unique_name("ps");
    let spec = DeviceSpec::new(&name, 0, 0).unwrap();

    let netns = NetNamespace::of_pid(launcher.pid()).unwrap();
    netns
        .run(|| create_tap_device(&spec).map(drop))
        .expect("create and close");

    assert!(launcher.has_interface(&name));
}

#[test]
#[ignore = "requires root"]
fn device_node_carries_requested_owner() {
    let name = unique_name("ow");
    let spec = DeviceSpec::new(&name, 1000, 1001).unwrap();
    let device = create_tap_device(&spec).expect("create tap");
    assert_eq!(device.name(), name);
    drop(device);

    let owner = sys_attr(&name, "owner");
    let group = sys_attr(&name, "group");
    let tun_flags = sys_attr(&name, "tun_flags");

    let _ = Command::new("ip").args(["link", "delete", &name]).status();

    assert_eq!(owner.unwrap(), "1000");
    assert_eq!(group.unwrap(), "1001");
    let flags = u32::from_str_radix(tun_flags.unwrap().trim_start_matches("0x"), 16).unwrap();
    assert_eq!(flags & 0x0100, 0, "single-queue device expected");
}

#[test]
#[ignore = "requires root"]
fn guard_restores_namespace_when_work_panics() {
    let launcher = Launcher::spawn();
    let netns = NetNamespace::of_pid(launcher.pid()).unwrap();
    let before = NetNamespace::current().unwrap().id().unwrap();

    let unwound = std::panic::catch_unwind(|| {
        netns
            .run(|| -> tapmaker_common::error::Result<()> { panic!("work unit blew up") })
            .ok();
    });

    assert!(unwound.is_err());
    assert_eq!(NetNamespace::current().unwrap().id().unwrap(), before);
}
