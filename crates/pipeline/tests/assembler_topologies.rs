//! Assembler tests across the four replication topologies.
//!
//! These tests verify:
//! 1. Bare local→local pipelines reduce to `zfs send | zfs receive`
//! 2. Remote hops collapse into one quoted `ssh` invocation
//! 3. Disabling a capability removes exactly its stage
//! 4. No hop ever contains two adjacent stages of the same kind
//! 5. Bandwidth limits land on the correct side with the correct flag

use std::path::PathBuf;

use pipeline::exec::lower;
use pipeline::{assemble, CapabilitySet, Compressor, PipelineRequest, StageKind};
use transport::Location;

fn remote(target: &str, root: bool) -> Location {
    Location::Remote {
        target: target.to_string(),
        root,
        socket: PathBuf::from("/tmp/syncoid-backup-nas-1700000000"),
    }
}

#[derive(Clone)]
struct Scenario {
    source: Location,
    target: Location,
    local: Location,
    capabilities: CapabilitySet,
    compressor: Option<Compressor>,
    from: Option<&'static str>,
    to: &'static str,
    force: bool,
    estimate: Option<u64>,
    source_bwlimit: Option<&'static str>,
    target_bwlimit: Option<&'static str>,
}

impl Scenario {
    fn local_to_local() -> Self {
        Self {
            source: Location::local(true),
            target: Location::local(true),
            local: Location::local(true),
            capabilities: CapabilitySet::default(),
            compressor: None,
            from: None,
            to: "s100",
            force: true,
            estimate: None,
            source_bwlimit: None,
            target_bwlimit: None,
        }
    }

    fn assemble(&self) -> pipeline::Pipeline {
        assemble(&PipelineRequest {
            source: &self.source,
            target: &self.target,
            local: &self.local,
            source_dataset: "tank/src",
            target_dataset: "tank/dst",
            from_snapshot: self.from,
            to_snapshot: self.to,
            force_receive: self.force,
            estimated_bytes: self.estimate,
            compressor: self.compressor,
            capabilities: &self.capabilities,
            source_bwlimit: self.source_bwlimit,
            target_bwlimit: self.target_bwlimit,
        })
    }

    fn kinds(&self) -> Vec<Vec<StageKind>> {
        self.assemble()
            .hops
            .iter()
            .map(|hop| hop.stages.iter().map(pipeline::Stage::kind).collect())
            .collect()
    }
}

// ============================================================================
// Local→local
// ============================================================================

#[test]
fn bare_local_bootstrap_is_send_into_forced_receive() {
    let scenario = Scenario::local_to_local();
    let commands = lower(&scenario.assemble());
    assert_eq!(commands.len(), 2);
    assert_eq!(commands[0].program, "zfs");
    assert_eq!(commands[0].args, vec!["send", "tank/src@s100"]);
    assert_eq!(commands[1].program, "zfs");
    assert_eq!(commands[1].args, vec!["receive", "-F", "tank/dst"]);
}

#[test]
fn bare_local_incremental_receive_is_not_forced() {
    let scenario = Scenario {
        from: Some("s100"),
        to: "sync",
        force: false,
        ..Scenario::local_to_local()
    };
    let commands = lower(&scenario.assemble());
    assert_eq!(
        commands[0].args,
        vec!["send", "-I", "tank/src@s100", "tank/src@sync"]
    );
    assert_eq!(commands[1].args, vec!["receive", "tank/dst"]);
}

#[test]
fn local_compression_is_never_used() {
    let scenario = Scenario {
        capabilities: CapabilitySet::assume_all(),
        compressor: Some(Compressor::Lzo),
        estimate: Some(8192),
        ..Scenario::local_to_local()
    };
    let kinds = scenario.kinds();
    assert_eq!(
        kinds,
        vec![vec![
            StageKind::Send,
            StageKind::Mbuffer,
            StageKind::Pv,
            StageKind::Receive
        ]]
    );
}

#[test]
fn local_single_mbuffer_prefers_the_source_limit() {
    let scenario = Scenario {
        capabilities: CapabilitySet::assume_all(),
        source_bwlimit: Some("10M"),
        target_bwlimit: Some("2M"),
        ..Scenario::local_to_local()
    };
    let commands = lower(&scenario.assemble());
    let mbuffer = &commands[1];
    assert!(mbuffer.args.contains(&"-R".to_string()));
    assert!(mbuffer.args.contains(&"10M".to_string()));
    assert!(!mbuffer.args.contains(&"-r".to_string()));
}

#[test]
fn local_single_mbuffer_takes_the_target_limit_when_alone() {
    let scenario = Scenario {
        capabilities: CapabilitySet::assume_all(),
        target_bwlimit: Some("2M"),
        ..Scenario::local_to_local()
    };
    let commands = lower(&scenario.assemble());
    let mbuffer = &commands[1];
    assert!(mbuffer.args.contains(&"-r".to_string()));
    assert!(mbuffer.args.contains(&"2M".to_string()));
}

// ============================================================================
// Remote→local (scenario: incremental with every helper available)
// ============================================================================

#[test]
fn remote_to_local_incremental_pipeline_shape() {
    let scenario = Scenario {
        source: remote("root@src", true),
        capabilities: CapabilitySet::assume_all(),
        compressor: Some(Compressor::Lzo),
        from: Some("S"),
        to: "S_new",
        force: false,
        estimate: Some(1_048_576),
        ..Scenario::local_to_local()
    };
    let commands = lower(&scenario.assemble());
    assert_eq!(commands.len(), 5);

    assert_eq!(commands[0].program, "ssh");
    assert_eq!(commands[0].args[0], "-S");
    assert_eq!(commands[0].args[2], "root@src");
    assert_eq!(
        commands[0].args[3],
        "zfs send -I tank/src@S tank/src@S_new | /usr/bin/lzop | /usr/bin/mbuffer -q -s 128k -m 16M"
    );

    assert_eq!(commands[1].program, "/usr/bin/mbuffer");
    assert_eq!(commands[2].program, "/usr/bin/lzop");
    assert_eq!(commands[2].args, vec!["-dfc"]);
    assert_eq!(commands[3].program, "/usr/bin/pv");
    assert_eq!(commands[3].args, vec!["-s", "1048576"]);
    assert_eq!(commands[4].args, vec!["receive", "tank/dst"]);
}

#[test]
fn unprivileged_remote_sender_gets_sudo_on_the_zfs_stage_only() {
    let scenario = Scenario {
        source: remote("backup@src", false),
        capabilities: CapabilitySet::assume_all(),
        compressor: Some(Compressor::Lzo),
        ..Scenario::local_to_local()
    };
    let commands = lower(&scenario.assemble());
    let remote_string = &commands[0].args[3];
    assert!(remote_string.starts_with("sudo zfs send"));
    assert!(!remote_string.contains("sudo /usr/bin/lzop"));
}

// ============================================================================
// Local→remote
// ============================================================================

#[test]
fn local_to_remote_sender_orders_pv_before_compress() {
    let scenario = Scenario {
        target: remote("root@dst", true),
        capabilities: CapabilitySet::assume_all(),
        compressor: Some(Compressor::Gzip),
        estimate: Some(8192),
        source_bwlimit: Some("10M"),
        target_bwlimit: Some("2M"),
        ..Scenario::local_to_local()
    };
    let kinds = scenario.kinds();
    assert_eq!(
        kinds[0],
        vec![
            StageKind::Send,
            StageKind::Pv,
            StageKind::Compress,
            StageKind::Mbuffer
        ]
    );
    assert_eq!(
        kinds[1],
        vec![StageKind::Mbuffer, StageKind::Decompress, StageKind::Receive]
    );

    let commands = lower(&scenario.assemble());
    // Sender-side mbuffer throttles writes, receiver-side throttles reads.
    assert_eq!(commands[3].args[0], "-R");
    assert_eq!(commands[3].args[1], "10M");
    assert!(commands[4].args[3].contains("/usr/bin/mbuffer -r 2M"));
}

// ============================================================================
// Remote→remote
// ============================================================================

#[test]
fn remote_to_remote_builds_three_hops() {
    let scenario = Scenario {
        source: remote("root@src", true),
        target: remote("root@dst", true),
        capabilities: CapabilitySet::assume_all(),
        compressor: Some(Compressor::Lzo),
        estimate: Some(65536),
        ..Scenario::local_to_local()
    };
    let kinds = scenario.kinds();
    assert_eq!(kinds.len(), 3);
    assert_eq!(
        kinds[0],
        vec![StageKind::Send, StageKind::Compress, StageKind::Mbuffer]
    );
    assert_eq!(
        kinds[1],
        vec![
            StageKind::Decompress,
            StageKind::Pv,
            StageKind::Compress,
            StageKind::Mbuffer
        ]
    );
    assert_eq!(
        kinds[2],
        vec![StageKind::Mbuffer, StageKind::Decompress, StageKind::Receive]
    );
}

#[test]
fn missing_local_compressor_disables_compression_everywhere() {
    let scenario = Scenario {
        source: remote("root@src", true),
        target: remote("root@dst", true),
        capabilities: CapabilitySet {
            local_compress: false,
            ..CapabilitySet::assume_all()
        },
        compressor: Some(Compressor::Gzip),
        estimate: Some(65536),
        ..Scenario::local_to_local()
    };
    let kinds = scenario.kinds();
    let flat: Vec<StageKind> = kinds.iter().flatten().copied().collect();
    assert!(!flat.contains(&StageKind::Compress));
    assert!(!flat.contains(&StageKind::Decompress));
    assert!(flat.contains(&StageKind::Pv));
    assert_eq!(flat.iter().filter(|kind| **kind == StageKind::Mbuffer).count(), 3);
}

// ============================================================================
// Stage omission and adjacency
// ============================================================================

#[test]
fn no_hop_contains_adjacent_stages_of_the_same_kind() {
    let scenarios = [
        Scenario {
            source: remote("root@src", true),
            target: remote("root@dst", true),
            capabilities: CapabilitySet::assume_all(),
            compressor: Some(Compressor::Lzo),
            estimate: Some(8192),
            ..Scenario::local_to_local()
        },
        Scenario {
            source: remote("root@src", true),
            capabilities: CapabilitySet::assume_all(),
            compressor: Some(Compressor::Gzip),
            ..Scenario::local_to_local()
        },
        Scenario::local_to_local(),
    ];
    for scenario in scenarios {
        for hop in scenario.kinds() {
            for pair in hop.windows(2) {
                assert_ne!(pair[0], pair[1], "adjacent duplicate stage in {hop:?}");
            }
        }
    }
}

#[test]
fn omitting_pv_removes_exactly_its_stage() {
    let with_pv = Scenario {
        source: remote("root@src", true),
        capabilities: CapabilitySet::assume_all(),
        compressor: Some(Compressor::Lzo),
        estimate: Some(8192),
        ..Scenario::local_to_local()
    };
    let without_pv = Scenario {
        capabilities: CapabilitySet {
            local_pv: false,
            ..CapabilitySet::assume_all()
        },
        ..with_pv.clone()
    };

    let full: Vec<StageKind> = with_pv.kinds().into_iter().flatten().collect();
    let trimmed: Vec<StageKind> = without_pv.kinds().into_iter().flatten().collect();
    let expected: Vec<StageKind> = full
        .iter()
        .copied()
        .filter(|kind| *kind != StageKind::Pv)
        .collect();
    assert_eq!(trimmed, expected);
}
