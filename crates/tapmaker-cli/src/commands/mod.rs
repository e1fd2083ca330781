//! CLI command definitions and dispatch.

pub mod consume;
pub mod create;

use clap::{ArgAction, Parser, Subcommand};
use tapmaker_common::config::{InvocationConfig, Mode};
use tapmaker_common::constants::{BIN_NAME, DEFAULT_OWNER_ID, DEFAULT_TAP_NAME};
use tapmaker_common::error::TapMakerError;
use tapmaker_common::types::{DeviceSpec, parse_owner_id};

/// tap-maker: create persistent TAP devices for sandboxed workloads.
#[derive(Parser, Debug)]
#[command(name = BIN_NAME, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// The name of the tap device.
    #[arg(long, global = true, default_value = DEFAULT_TAP_NAME)]
    pub tap_name: String,

    /// The owner UID of the tap device.
    #[arg(long, global = true, default_value_t = DEFAULT_OWNER_ID, value_parser = parse_uid)]
    pub uid: u32,

    /// The owner GID of the tap device.
    #[arg(long, global = true, default_value_t = DEFAULT_OWNER_ID, value_parser = parse_gid)]
    pub gid: u32,

    /// Increase diagnostic verbosity (repeatable). `RUST_LOG` overrides it.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a tap device in a given PID net ns.
    CreateTap(create::CreateTapArgs),
    /// Create a tap device in the current net ns and keep it open.
    ConsumeTap,
}

impl Cli {
    /// Turns the parsed flags into the record handed to a mode handler.
    ///
    /// # Errors
    ///
    /// Returns a user error if the device name is empty.
    pub fn into_config(self) -> Result<InvocationConfig, TapMakerError> {
        let device = DeviceSpec::new(self.tap_name, self.uid, self.gid)?;
        let mode = match self.command {
            Command::CreateTap(args) => Mode::CreateTap {
                launcher_pid: args.launcher_pid,
            },
            Command::ConsumeTap => Mode::ConsumeTap,
        };
        Ok(InvocationConfig { mode, device })
    }
}

/// Dispatches the invocation to its mode handler.
///
/// # Errors
///
/// Returns an error if the selected mode fails.
pub fn execute(config: InvocationConfig) -> anyhow::Result<()> {
    tracing::debug!(mode = %config.mode, device = %config.device, "dispatching");
    match config.mode {
        Mode::CreateTap { launcher_pid } => create::execute(launcher_pid, &config.device),
        Mode::ConsumeTap => consume::execute(&config.device),
    }
}

fn parse_uid(text: &str) -> Result<u32, TapMakerError> {
    parse_owner_id("uid", text)
}

fn parse_gid(text: &str) -> Result<u32, TapMakerError> {
    parse_owner_id("gid", text)
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;
    use clap::error::ErrorKind;

    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once(BIN_NAME).chain(args.iter().copied()))
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn create_tap_requires_launcher_pid() {
        let err = parse(&["create-tap"]).expect_err("missing pid");
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn create_tap_full_scenario() {
        let cli = parse(&[
            "create-tap",
            "--launcher-pid",
            "1234",
            "--tap-name",
            "vnet0",
            "--uid",
            "1000",
            "--gid",
            "1000",
        ])
        .expect("parse");
        let config = cli.into_config().expect("config");

        let Mode::CreateTap { launcher_pid } = config.mode else {
            panic!("expected create-tap, got {:?}", config.mode);
        };
        assert_eq!(launcher_pid.as_raw(), 1234);
        assert_eq!(config.device.name, "vnet0");
        assert_eq!(config.device.owner, 1000);
        assert_eq!(config.device.group, 1000);
        assert!(config.device.persistent);
        assert!(!config.device.multiqueue);
    }

    #[test]
    fn short_pid_flag_and_global_flags_before_subcommand() {
        let cli = parse(&["--uid", "7", "create-tap", "-p", "42"]).expect("parse");
        assert_eq!(cli.uid, 7);
        assert!(matches!(cli.command, Command::CreateTap(ref a) if a.launcher_pid.as_raw() == 42));
    }

    #[test]
    fn consume_tap_uses_defaults() {
        let config = parse(&["consume-tap"])
            .expect("parse")
            .into_config()
            .expect("config");
        assert_eq!(config.mode, Mode::ConsumeTap);
        assert_eq!(config.device.name, DEFAULT_TAP_NAME);
        assert_eq!(config.device.owner, DEFAULT_OWNER_ID);
        assert_eq!(config.device.group, DEFAULT_OWNER_ID);
    }

    #[test]
    fn bad_owner_ids_are_rejected_at_parse_time() {
        let cases: [&[&str]; 3] = [
            &["consume-tap", "--uid", "abc"],
            &["consume-tap", "--uid=-1"],
            &["consume-tap", "--gid", "4294967296"],
        ];
        for args in cases {
            let err = parse(args).expect_err("bad id");
            assert_eq!(err.kind(), ErrorKind::ValueValidation, "{args:?}");
        }
    }

    #[test]
    fn bad_launcher_pid_is_rejected_at_parse_time() {
        for flag in ["--launcher-pid=0", "--launcher-pid=abc", "--launcher-pid=-5"] {
            let err = parse(&["create-tap", flag]).expect_err("bad pid");
            assert_eq!(err.kind(), ErrorKind::ValueValidation, "{flag}");
        }
    }

    #[test]
    fn empty_tap_name_is_a_user_error() {
        let err = parse(&["consume-tap", "--tap-name", ""])
            .expect("parse")
            .into_config()
            .expect_err("empty name");
        assert!(err.is_user_error());
    }

    #[test]
    fn verbose_counts_repeats() {
        let cli = parse(&["-vv", "consume-tap"]).expect("parse");
        assert_eq!(cli.verbose, 2);
    }
}
