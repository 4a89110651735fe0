//! Typed view of the parsed command line.

use clap::ArgMatches;

/// Every option recognised by oc-syncoid, in typed form.
#[allow(clippy::struct_excessive_bools)]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParsedArgs {
    /// `--debug`: verbose trace, echo constructed commands.
    pub debug: bool,
    /// `--nocommandchecks`: assume every helper binary is present.
    pub nocommandchecks: bool,
    /// `--version`: print the banner and exit.
    pub show_version: bool,
    /// `--compress CHOICE`, unvalidated; `None` means the default.
    pub compress: Option<String>,
    /// `--source-bwlimit RATE`.
    pub source_bwlimit: Option<String>,
    /// `--target-bwlimit RATE`.
    pub target_bwlimit: Option<String>,
    /// `--dumpsnaps`: print the merged inventory.
    pub dumpsnaps: bool,
    /// `--recursive`/`-r`.
    pub recursive: bool,
    /// First positional operand.
    pub source: Option<String>,
    /// Second positional operand.
    pub target: Option<String>,
}

/// Extracts the typed arguments from clap's matches.
pub fn parse_args(matches: &ArgMatches) -> ParsedArgs {
    ParsedArgs {
        debug: matches.get_flag("debug"),
        nocommandchecks: matches.get_flag("nocommandchecks"),
        show_version: matches.get_flag("version"),
        compress: matches.get_one::<String>("compress").cloned(),
        source_bwlimit: matches.get_one::<String>("source-bwlimit").cloned(),
        target_bwlimit: matches.get_one::<String>("target-bwlimit").cloned(),
        dumpsnaps: matches.get_flag("dumpsnaps"),
        recursive: matches.get_flag("recursive"),
        source: matches.get_one::<String>("source").cloned(),
        target: matches.get_one::<String>("target").cloned(),
    }
}

#[cfg(test)]
mod tests {
    use super::parse_args;
    use crate::command_builder::clap_command;

    #[test]
    fn positionals_map_to_source_then_target() {
        let matches = clap_command()
            .try_get_matches_from(["oc-syncoid", "tank/src", "root@nas:tank/dst"])
            .expect("two positionals parse");
        let args = parse_args(&matches);
        assert_eq!(args.source.as_deref(), Some("tank/src"));
        assert_eq!(args.target.as_deref(), Some("root@nas:tank/dst"));
        assert!(!args.recursive);
    }

    #[test]
    fn flags_default_to_off() {
        let matches = clap_command()
            .try_get_matches_from(["oc-syncoid", "a", "b"])
            .expect("parses");
        let args = parse_args(&matches);
        assert!(!args.debug);
        assert!(!args.nocommandchecks);
        assert!(!args.dumpsnaps);
        assert!(!args.show_version);
        assert_eq!(args.compress, None);
    }

    #[test]
    fn version_parses_without_positionals() {
        let matches = clap_command()
            .try_get_matches_from(["oc-syncoid", "--version"])
            .expect("parses");
        assert!(parse_args(&matches).show_version);
    }

    #[test]
    fn bwlimits_are_passed_through_verbatim() {
        let matches = clap_command()
            .try_get_matches_from([
                "oc-syncoid",
                "--source-bwlimit=10M",
                "--target-bwlimit",
                "2M",
                "a",
                "b",
            ])
            .expect("parses");
        let args = parse_args(&matches);
        assert_eq!(args.source_bwlimit.as_deref(), Some("10M"));
        assert_eq!(args.target_bwlimit.as_deref(), Some("2M"));
    }
}
