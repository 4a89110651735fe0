//! Public API tests: command lowering as seen by dependent crates.

use std::path::PathBuf;

use transport::quote::{quote, render_argv};
use transport::{CommandGroup, CommandSpec, Location};

fn remote() -> Location {
    Location::Remote {
        target: "backup@nas".to_string(),
        root: false,
        socket: PathBuf::from("/tmp/syncoid-backup-nas-1700000000"),
    }
}

#[test]
fn remote_specs_always_ride_the_control_socket() {
    let spec = CommandSpec::new(remote(), ["zfs", "list", "-Hr", "tank"], true);
    let (program, args) = spec.command_parts();
    assert_eq!(program, "ssh");
    assert_eq!(args[0], "-S");
    assert_eq!(args[1], "/tmp/syncoid-backup-nas-1700000000");
    assert_eq!(args[2], "backup@nas");
    assert_eq!(args[3], "sudo zfs list -Hr tank");
}

#[test]
fn quoting_survives_shell_word_splitting() {
    assert_eq!(quote("plain"), "plain");
    assert_eq!(quote("with space"), "'with space'");
    assert_eq!(
        render_argv(&["zfs", "snapshot", "tank/it's@snap"]),
        "zfs snapshot 'tank/it'\\''s@snap'"
    );
}

#[test]
fn groups_bound_round_trips() {
    let commands: Vec<Vec<String>> = (0..3)
        .map(|index| {
            vec![
                "zfs".to_string(),
                "destroy".to_string(),
                format!("tank@syncoid_host_{index}"),
            ]
        })
        .collect();
    let group = CommandGroup::new(remote(), commands, true);
    let (program, args) = group.command_parts();
    assert_eq!(program, "ssh");
    assert_eq!(args.len(), 4);
    assert_eq!(args[3].matches("; ").count(), 2);
}
