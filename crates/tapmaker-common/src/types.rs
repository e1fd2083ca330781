//! Domain primitive types used across the tap-maker workspace.

use std::fmt;
use std::str::FromStr;

use crate::error::{Result, TapMakerError};

/// Process whose network namespace is the target of `create-tap`.
///
/// Resolved once when the namespace is opened; nothing keeps the process
/// alive afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetPid(i32);

impl TargetPid {
    /// Wraps a raw PID.
    ///
    /// # Errors
    ///
    /// Returns [`TapMakerError::InvalidInput`] unless `pid` is positive.
    pub fn new(pid: i32) -> Result<Self> {
        if pid <= 0 {
            return Err(TapMakerError::invalid_input(
                "launcher pid",
                pid.to_string(),
                "must be a positive process id",
            ));
        }
        Ok(Self(pid))
    }

    /// Returns the raw PID.
    #[must_use]
    pub const fn as_raw(self) -> i32 {
        self.0
    }
}

impl FromStr for TargetPid {
    type Err = TapMakerError;

    fn from_str(s: &str) -> Result<Self> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(TapMakerError::invalid_input(
                "launcher pid",
                s,
                "not a decimal number",
            ));
        }
        let pid = s.parse::<i32>().map_err(|e| {
            TapMakerError::invalid_input("launcher pid", s, e.to_string())
        })?;
        Self::new(pid)
    }
}

impl fmt::Display for TargetPid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Parses an owner UID or GID from decimal text.
///
/// Only plain ASCII digits are accepted; signs, whitespace and values
/// above `u32::MAX` are rejected.
///
/// # Errors
///
/// Returns [`TapMakerError::InvalidInput`] naming `field` when `text` is
/// not a 32-bit unsigned decimal number.
pub fn parse_owner_id(field: &'static str, text: &str) -> Result<u32> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(TapMakerError::invalid_input(
            field,
            text,
            "not a decimal number",
        ));
    }
    text.parse::<u32>()
        .map_err(|_| TapMakerError::invalid_input(field, text, "out of range for a 32-bit id"))
}

/// Properties of the TAP device to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSpec {
    /// Kernel interface name, unique in the target namespace.
    pub name: String,
    /// UID allowed to open the device without privilege.
    pub owner: u32,
    /// GID allowed to open the device without privilege.
    pub group: u32,
    /// Whether the device exposes multiple queue pairs.
    pub multiqueue: bool,
    /// Whether the device outlives its creating descriptor.
    pub persistent: bool,
}

impl DeviceSpec {
    /// Creates a persistent, single-queue device specification.
    ///
    /// The name is checked for emptiness only; every other naming rule is
    /// enforced by the kernel at creation time.
    ///
    /// # Errors
    ///
    /// Returns [`TapMakerError::InvalidInput`] if `name` is empty.
    pub fn new(name: impl Into<String>, owner: u32, group: u32) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(TapMakerError::invalid_input(
                "tap name",
                name,
                "must not be empty",
            ));
        }
        Ok(Self {
            name,
            owner,
            group,
            multiqueue: false,
            persistent: true,
        })
    }

    /// Toggles multiqueue support.
    #[must_use]
    pub const fn with_multiqueue(mut self, multiqueue: bool) -> Self {
        self.multiqueue = multiqueue;
        self
    }
}

impl fmt::Display for DeviceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}:{}", self.name, self.owner, self.group)?;
        if self.multiqueue {
            write!(f, ", multiqueue")?;
        }
        if self.persistent {
            write!(f, ", persistent")?;
        }
        write!(f, ")")
    }
}
