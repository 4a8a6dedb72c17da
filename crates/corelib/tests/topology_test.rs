//! Tests for topology construction and boot command attachment.
//!
//! # Test Strategy
//!
//! 1. **Fixed layout**: node count, addresses, commands
//! 2. **Exclusive layout**: hosts, pinning, effective cluster size
//! 3. **Command emission**: roles, start flag, attachment order
//! 4. **Properties**: offset contiguity for arbitrary node counts

use std::collections::BTreeMap;
use std::net::Ipv4Addr;

use corelib::command::{attach_boot_commands, Role};
use corelib::node::{Sliver, VolumeSize};
use corelib::params::{ExclusiveHosting, Hosting, ParameterContext, ParameterSet};
use corelib::settings::{BootstrapSettings, ProfileSettings};
use corelib::{build_topology, plan_cluster, Error, TopologyGraph};
use proptest::prelude::*;

fn fixed(node_count: u32) -> ParameterSet {
    ParameterSet {
        node_count,
        ..ParameterSet::default()
    }
}

fn exclusive(node_count: u32, core_count: u32, pinned: bool) -> ParameterSet {
    ParameterSet {
        node_count,
        hosting: Hosting::Exclusive(ExclusiveHosting {
            core_count,
            cores_per_vm: 2,
            worker_ram_mb: 8192,
            exclusive: pinned,
        }),
        ..ParameterSet::default()
    }
}

fn plan(params: &ParameterSet) -> TopologyGraph {
    plan_cluster(
        params,
        &ProfileSettings::default(),
        &BootstrapSettings::default(),
    )
    .unwrap()
}

fn last_octets(graph: &TopologyGraph) -> Vec<u8> {
    graph
        .nodes()
        .iter()
        .map(|n| n.address().octets()[3])
        .collect()
}

// ============================================================================
// Fixed Layout Tests
// ============================================================================

#[test]
fn test_three_node_fixed_cluster() {
    let graph = plan(&fixed(3));

    let names: Vec<&str> = graph.nodes().iter().map(|n| n.name.as_str()).collect();
    assert_eq!(names, ["node1", "node2", "node3"]);

    let addresses: Vec<Ipv4Addr> = graph.nodes().iter().map(|n| n.address()).collect();
    assert_eq!(
        addresses,
        [
            Ipv4Addr::new(10, 10, 1, 1),
            Ipv4Addr::new(10, 10, 1, 2),
            Ipv4Addr::new(10, 10, 1, 3),
        ]
    );

    let primary = graph.control().unwrap().command.as_ref().unwrap();
    assert_eq!(primary.role, Role::Primary);
    assert_eq!(primary.cluster_size, Some(2));

    for worker in graph.workers() {
        let cmd = worker.command.as_ref().unwrap();
        assert_eq!(cmd.role, Role::Secondary);
        assert_eq!(cmd.address, worker.address());
    }

    assert_eq!(graph.lan().members().len(), 3);
}

#[test]
fn test_every_node_has_a_blockstore() {
    let graph = plan(&fixed(4));

    for node in graph.nodes() {
        assert_eq!(node.blockstore.name, format!("{}-bs", node.name));
        assert_eq!(node.blockstore.mount_point, "/mydata");
        assert_eq!(node.blockstore.placement, "any");
    }
}

#[test]
fn test_zero_filesystem_size_means_maximum() {
    // 0 GB still produces a volume, sized to the platform maximum.
    let graph = plan(&fixed(2));
    for node in graph.nodes() {
        assert_eq!(node.blockstore.size, VolumeSize::Maximum);
        assert_eq!(node.blockstore.size.to_string(), "0GB");
    }

    let sized = ParameterSet {
        temp_fs_size_gb: 40,
        ..fixed(2)
    };
    let graph = plan(&sized);
    assert_eq!(graph.nodes()[1].blockstore.size.to_string(), "40GB");
}

// ============================================================================
// Exclusive Layout Tests
// ============================================================================

#[test]
fn test_exclusive_two_slots_four_cores() {
    let graph = plan(&exclusive(2, 4, true));

    assert_eq!(graph.nodes().len(), 5);
    assert_eq!(graph.hosts().len(), 1);
    assert_eq!(last_octets(&graph), [1, 2, 3, 4, 5]);

    let host = &graph.hosts()[0];
    assert_eq!(host.name, "host1");
    assert_eq!(host.hardware_type, "m510");
    assert!(host.exclusive);

    for worker in graph.workers() {
        assert_eq!(worker.instantiate_on.as_deref(), Some("host1"));
        assert_eq!(
            worker.sliver,
            Sliver::XenVm {
                cores: 2,
                ram_mb: 8192
            }
        );
    }

    let primary = graph.control().unwrap().command.as_ref().unwrap();
    assert_eq!(primary.cluster_size, Some(4));
}

#[test]
fn test_exclusive_workers_spread_across_hosts() {
    let graph = plan(&exclusive(3, 2, true));

    assert_eq!(graph.hosts().len(), 2);
    let pins: Vec<&str> = graph
        .workers()
        .iter()
        .map(|w| w.instantiate_on.as_deref().unwrap())
        .collect();
    assert_eq!(pins, ["host1", "host1", "host2", "host2"]);
    assert_eq!(last_octets(&graph), [1, 2, 3, 4, 5]);
}

#[test]
fn test_non_exclusive_allocates_no_hosts() {
    let graph = plan(&exclusive(3, 2, false));

    assert!(graph.hosts().is_empty());
    assert_eq!(graph.nodes().len(), 5);
    assert!(graph.workers().iter().all(|w| w.instantiate_on.is_none()));
    assert_eq!(graph.cluster_size(), 4);
}

#[test]
fn test_exclusive_lan_has_no_bandwidth() {
    let graph = plan(&exclusive(2, 1, true));
    assert_eq!(graph.lan().bandwidth_kbps, None);
    // Hosts are not LAN members.
    assert_eq!(graph.lan().members().len(), graph.nodes().len());
}

// ============================================================================
// Command Emission Tests
// ============================================================================

#[test]
fn test_start_flag_disabled_everywhere() {
    let params = ParameterSet {
        start_kubernetes: false,
        ..exclusive(3, 2, true)
    };
    let graph = plan(&params);

    for node in graph.nodes() {
        let cmd = node.command.as_ref().unwrap();
        assert!(!cmd.start_cluster);
        assert!(cmd.render().contains(" False > "), "{}", cmd.render());
        assert!(!cmd.render().contains("True"));
    }
}

#[test]
fn test_secondaries_attached_before_primary() {
    let mut graph = build_topology(&fixed(3), &ProfileSettings::default()).unwrap();
    assert!(graph.nodes().iter().all(|n| n.command.is_none()));

    let order = attach_boot_commands(&mut graph, true, &BootstrapSettings::default());
    assert_eq!(order, ["node2", "node3", "node1"]);
}

#[test]
fn test_primary_runs_attached_secondaries_detached() {
    let graph = plan(&fixed(3));

    let primary = graph.control().unwrap().command.as_ref().unwrap();
    assert!(!primary.detached);
    assert!(primary.render().ends_with("2>&1"));
    assert!(primary.args()[1].ends_with(".1"));

    for worker in graph.workers() {
        let cmd = worker.command.as_ref().unwrap();
        assert!(cmd.detached);
        assert!(cmd.render().ends_with("2>&1 &"));
    }
}

#[test]
fn test_custom_bootstrap_settings() {
    let bootstrap = BootstrapSettings {
        script: "/opt/setup.sh".to_string(),
        log_path: "/var/log/setup.log".to_string(),
        shell: "sh".to_string(),
    };
    let graph = plan_cluster(&fixed(2), &ProfileSettings::default(), &bootstrap).unwrap();

    let cmd = graph.nodes()[1].command.as_ref().unwrap();
    assert_eq!(cmd.shell, "sh");
    assert_eq!(
        cmd.render(),
        "/opt/setup.sh secondary 10.10.1.2 True > /var/log/setup.log 2>&1 &"
    );
}

#[test]
fn test_bound_parameters_flow_into_topology() {
    let supplied: BTreeMap<String, String> = [
        ("nodeCount", "2"),
        ("exclusiveHosting", "true"),
        ("coreCount", "4"),
        ("nodeType", "xl170"),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    let params = ParameterContext::profile().bind(&supplied).unwrap();
    let graph = plan(&params);

    assert_eq!(graph.nodes().len(), 5);
    assert_eq!(graph.hosts()[0].hardware_type, "xl170");
    assert_eq!(
        graph.control().unwrap().hardware_type.as_deref(),
        Some("xl170")
    );
}

// ============================================================================
// Address Space Tests
// ============================================================================

#[test]
fn test_builder_rejects_fixed_layout_past_subnet() {
    // Largest fixed layout that fits: 254 addresses.
    assert!(build_topology(&fixed(254), &ProfileSettings::default()).is_ok());

    let err = build_topology(&fixed(255), &ProfileSettings::default()).unwrap_err();
    assert_eq!(
        err,
        Error::AddressSpaceExhausted {
            requested: 255,
            capacity: 254
        }
    );
}

#[test]
fn test_builder_rejects_unbound_huge_requests() {
    // Built directly, without going through parameter binding.
    let err = build_topology(&fixed(u32::MAX), &ProfileSettings::default()).unwrap_err();
    assert!(matches!(err, Error::AddressSpaceExhausted { capacity: 254, .. }));

    let err = build_topology(
        &exclusive(1_000_000, 1_000_000, true),
        &ProfileSettings::default(),
    )
    .unwrap_err();
    assert_eq!(
        err,
        Error::AddressSpaceExhausted {
            requested: u32::MAX,
            capacity: 254
        }
    );
}

#[test]
fn test_builder_rejects_exclusive_layout_past_subnet() {
    // 1 + 64 * 4 = 257 addresses.
    let err = build_topology(&exclusive(65, 4, true), &ProfileSettings::default()).unwrap_err();
    assert_eq!(
        err,
        Error::AddressSpaceExhausted {
            requested: 257,
            capacity: 254
        }
    );
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #[test]
    fn prop_fixed_offsets_contiguous(node_count in 1u32..=254) {
        let graph = plan(&fixed(node_count));

        prop_assert_eq!(graph.nodes().len(), node_count as usize);
        prop_assert_eq!(graph.cluster_size(), u64::from(node_count - 1));
        for (i, node) in graph.nodes().iter().enumerate() {
            prop_assert_eq!(node.address().octets()[3] as usize, i + 1);
            prop_assert_eq!(&node.name, &format!("node{}", i + 1));
        }
    }

    #[test]
    fn prop_exclusive_counts(node_count in 1u32..=16, core_count in 1u32..=8, pinned in any::<bool>()) {
        let graph = plan(&exclusive(node_count, core_count, pinned));
        let workers = (node_count as usize - 1) * core_count as usize;

        prop_assert_eq!(graph.nodes().len(), 1 + workers);
        prop_assert_eq!(graph.cluster_size(), workers as u64);
        let expected_hosts = if pinned { node_count as usize - 1 } else { 0 };
        prop_assert_eq!(graph.hosts().len(), expected_hosts);

        let octets = last_octets(&graph);
        let expected: Vec<u8> = (1..=(1 + workers) as u8).collect();
        prop_assert_eq!(octets, expected);

        let primary = graph.nodes()[0].command.as_ref().unwrap();
        prop_assert_eq!(primary.role, Role::Primary);
        prop_assert_eq!(primary.cluster_size, Some(workers as u64));
    }
}
