//! The clap command definition for the oc-syncoid option surface.

use clap::{Arg, ArgAction, Command};

use syncoid_core::version::PROGRAM_NAME;

/// Builds the clap command recognising every oc-syncoid option.
///
/// Options accept both `--name value` and `--name=value`; unknown options
/// and a third positional operand are fatal parse errors.
pub fn clap_command() -> Command {
    Command::new(PROGRAM_NAME)
        .disable_version_flag(true)
        .arg_required_else_help(false)
        .arg(
            Arg::new("debug")
                .long("debug")
                .help("Print every constructed command and verbose trace output.")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("nocommandchecks")
                .long("nocommandchecks")
                .help("Skip the capability probe and assume every helper is present.")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("version")
                .long("version")
                .help("Output version information and exit.")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("compress")
                .long("compress")
                .value_name("CHOICE")
                .help("Stream compressor: gzip, lzo (default), or none/no/0 to disable.")
                .num_args(1)
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("source-bwlimit")
                .long("source-bwlimit")
                .value_name("RATE")
                .help("Limit the sending side to RATE via mbuffer -R.")
                .num_args(1)
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("target-bwlimit")
                .long("target-bwlimit")
                .value_name("RATE")
                .help("Limit the receiving side to RATE via mbuffer -r.")
                .num_args(1)
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("dumpsnaps")
                .long("dumpsnaps")
                .help("Print the merged snapshot inventory of both sides.")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("recursive")
                .long("recursive")
                .short('r')
                .help("Also sync every child dataset beneath the source.")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("source")
                .value_name("SOURCE")
                .help("Source endpoint: [user@host:]dataset.")
                .num_args(1),
        )
        .arg(
            Arg::new("target")
                .value_name("TARGET")
                .help("Target endpoint: [user@host:]dataset.")
                .num_args(1),
        )
}
