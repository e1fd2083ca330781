//! # tapmaker-core
//!
//! Linux primitives behind the `tap-maker` tool.
//!
//! - **Namespace entry**: run a unit of work with the calling thread moved
//!   into another process's network namespace, restoring the original
//!   namespace afterwards.
//! - **TAP provisioning**: create a persistent, owned TAP interface in the
//!   currently active network namespace.
//! - **Provisioning modes**: `create-tap` and `consume-tap` built from the
//!   two primitives above.
//!
//! All unsafe system calls are encapsulated in safe wrappers with
//! `// SAFETY:` documentation.

#[cfg(target_os = "linux")]
pub mod namespace;
pub mod provision;
#[cfg(target_os = "linux")]
pub mod tap;
