//! Persistent TAP device creation.
//!
//! Drives the TUN/TAP clone device directly:
//!
//! 1. `TUNSETIFF` binds a fresh descriptor to a new TAP interface.
//!    `IFF_TUN_EXCL` makes it fail rather than attach to an existing one,
//!    and the name the kernel hands back must be the one requested.
//! 2. `TUNSETOWNER` / `TUNSETGROUP` let the named UID/GID open it later
//!    without `CAP_NET_ADMIN`.
//! 3. `TUNSETPERSIST` keeps the interface after the descriptor closes.
//!
//! Persistence is requested last. Until then the interface dies with the
//! descriptor, so a failure at any step leaves nothing behind.

use std::fs::{File, OpenOptions};
use std::io;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, RawFd};

use libc::{c_int, c_short};
use tapmaker_common::constants::TUN_CLONE_DEVICE;
use tapmaker_common::error::{Result, TapMakerError, TapStep};
use tapmaker_common::types::DeviceSpec;

const TUN_IOC_TYPE: u8 = b'T';
const TUN_IOC_SIZE: usize = std::mem::size_of::<c_int>();

nix::ioctl_readwrite_bad!(
    /// `TUNSETIFF`: bind the descriptor to a named interface.
    tun_set_iff,
    nix::request_code_write!(TUN_IOC_TYPE, 202, TUN_IOC_SIZE),
    libc::ifreq
);
nix::ioctl_write_int_bad!(
    /// `TUNSETPERSIST`: keep the interface after the descriptor closes.
    tun_set_persist,
    nix::request_code_write!(TUN_IOC_TYPE, 203, TUN_IOC_SIZE)
);
nix::ioctl_write_int_bad!(
    /// `TUNSETOWNER`
    tun_set_owner,
    nix::request_code_write!(TUN_IOC_TYPE, 204, TUN_IOC_SIZE)
);
nix::ioctl_write_int_bad!(
    /// `TUNSETGROUP`
    tun_set_group,
    nix::request_code_write!(TUN_IOC_TYPE, 206, TUN_IOC_SIZE)
);

/// Open descriptor to a TAP interface created by [`create_tap_device`].
///
/// Dropping it closes the descriptor. A persistent interface survives
/// that; a non-persistent one is removed by the kernel.
#[derive(Debug)]
pub struct TapDevice {
    file: File,
    name: String,
}

impl TapDevice {
    /// Returns the interface name assigned by the kernel.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl AsRawFd for TapDevice {
    fn as_raw_fd(&self) -> RawFd {
        self.file.as_raw_fd()
    }
}

impl AsFd for TapDevice {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.file.as_fd()
    }
}

/// Creates a TAP interface in the network namespace active on the
/// calling thread.
///
/// # Errors
///
/// Returns [`TapMakerError::DeviceExists`] if an interface named
/// `spec.name` is already present, so an existing device is never
/// attached to or modified. Any failing step of the creation sequence
/// (missing `CAP_NET_ADMIN`, a name the kernel refuses, an unsupported
/// flag combination) is reported as [`TapMakerError::DeviceCreation`].
pub fn create_tap_device(spec: &DeviceSpec) -> Result<TapDevice> {
    let mut request = interface_request(&spec.name, tap_flags(spec))
        .map_err(|source| creation_error(spec, TapStep::Attach, source))?;

    // Fast path. `IFF_TUN_EXCL` makes the kernel repeat this check atomically.
    if nix::net::if_::if_nametoindex(spec.name.as_str()).is_ok() {
        return Err(TapMakerError::DeviceExists {
            name: spec.name.clone(),
        });
    }

    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .open(TUN_CLONE_DEVICE)
        .map_err(|source| creation_error(spec, TapStep::Open, source))?;
    let fd = file.as_raw_fd();

    // SAFETY: `fd` is the open clone device and `request` is a valid,
    // NUL-terminated `ifreq` the kernel may write the final name into.
    unsafe { tun_set_iff(fd, &raw mut request) }.map_err(|errno| attach_error(spec, errno))?;
    let name = interface_name(&request);
    // A `%d` in the request is a template the kernel fills in. Until the
    // device is persistent, bailing out here discards it.
    check_assigned_name(&spec.name, &name)
        .map_err(|source| creation_error(spec, TapStep::Attach, source))?;
    tracing::debug!(name = %name, multiqueue = spec.multiqueue, "attached tap interface");

    // SAFETY: `fd` is bound to a TAP interface; the ioctl takes the id by value.
    unsafe { tun_set_owner(fd, owner_arg(spec.owner)) }
        .map_err(|errno| creation_error(spec, TapStep::Owner, errno.into()))?;
    // SAFETY: as above.
    unsafe { tun_set_group(fd, owner_arg(spec.group)) }
        .map_err(|errno| creation_error(spec, TapStep::Group, errno.into()))?;

    if spec.persistent {
        // SAFETY: as above; a non-zero argument enables persistence.
        unsafe { tun_set_persist(fd, 1) }
            .map_err(|errno| creation_error(spec, TapStep::Persist, errno.into()))?;
    }

    tracing::info!(
        name = %name,
        owner = spec.owner,
        group = spec.group,
        persistent = spec.persistent,
        "created tap device"
    );
    Ok(TapDevice { file, name })
}

/// Interface flags requested for `spec`.
///
/// Always a TAP device without the packet-information prefix, and always
/// exclusive: the kernel refuses to attach to an interface that already
/// has this name.
// The TUN flag bits all fit in the low 16 bits.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn tap_flags(spec: &DeviceSpec) -> c_short {
    let mut flags = libc::IFF_TAP | libc::IFF_NO_PI | libc::IFF_TUN_EXCL;
    if spec.multiqueue {
        flags |= libc::IFF_MULTI_QUEUE;
    }
    flags as c_short
}

/// Builds the `TUNSETIFF` request.
///
/// The kernel copies at most `IFNAMSIZ - 1` name bytes; longer names or
/// names with interior NULs cannot be expressed and are refused with the
/// errno the kernel uses for them.
fn interface_request(name: &str, flags: c_short) -> io::Result<libc::ifreq> {
    if name.as_bytes().contains(&0) {
        return Err(io::Error::from_raw_os_error(libc::EINVAL));
    }
    if name.len() >= libc::IFNAMSIZ {
        return Err(io::Error::from_raw_os_error(libc::ENAMETOOLONG));
    }

    // SAFETY: `ifreq` is plain old data; all-zero is a valid empty request.
    let mut request: libc::ifreq = unsafe { std::mem::zeroed() };
    for (dst, src) in request.ifr_name.iter_mut().zip(name.bytes()) {
        *dst = src as libc::c_char;
    }
    request.ifr_ifru.ifru_flags = flags;
    Ok(request)
}

fn interface_name(request: &libc::ifreq) -> String {
    let bytes: Vec<u8> = request
        .ifr_name
        .iter()
        .take_while(|&&c| c != 0)
        .map(|&c| c as u8)
        .collect();
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Maps a failed `TUNSETIFF`.
///
/// With `IFF_TUN_EXCL` the kernel answers `EBUSY` when the name is taken.
fn attach_error(spec: &DeviceSpec, errno: nix::errno::Errno) -> TapMakerError {
    if errno == nix::errno::Errno::EBUSY {
        return TapMakerError::DeviceExists {
            name: spec.name.clone(),
        };
    }
    creation_error(spec, TapStep::Attach, errno.into())
}

fn check_assigned_name(requested: &str, assigned: &str) -> io::Result<()> {
    if requested == assigned {
        return Ok(());
    }
    tracing::debug!(requested, assigned, "kernel assigned a different name");
    Err(io::Error::from_raw_os_error(libc::EINVAL))
}

/// Reinterprets a UID/GID as the `int` the ioctl wrappers take.
///
/// The kernel reads the argument back as an unsigned id, so the bit
/// pattern is what matters.
const fn owner_arg(id: u32) -> c_int {
    c_int::from_ne_bytes(id.to_ne_bytes())
}

fn creation_error(spec: &DeviceSpec, step: TapStep, source: io::Error) -> TapMakerError {
    TapMakerError::DeviceCreation {
        name: spec.name.clone(),
        step,
        source,
    }
}
