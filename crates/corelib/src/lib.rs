//! Core library for the testbed cluster profile.
//!
//! This crate turns user parameters into the cluster layout the testbed is
//! asked to provision:
//! - Parameter declaration, binding and validation
//! - Sequential address assignment on the experiment LAN
//! - Node, physical host and LAN model
//! - Topology construction for the fixed and exclusive-host layouts
//! - Per-node bootstrap commands
//!
//! Nothing here performs I/O; serialization lives in the `rspec` crate.

pub mod address;
pub mod command;
pub mod error;
pub mod network;
pub mod node;
pub mod params;
pub mod settings;
pub mod topology;

pub use address::AddressPlan;
pub use command::{attach_boot_commands, BootCommand, Role};
pub use error::{Error, Result, ValidationErrors};
pub use network::Lan;
pub use node::{Node, NodeRole, PhysicalHost};
pub use params::{ParameterContext, ParameterSet};
pub use settings::{BootstrapSettings, ProfileSettings};
pub use topology::{build_topology, TopologyBuilder, TopologyGraph};

/// Build the topology and attach every node's boot command.
pub fn plan_cluster(
    params: &ParameterSet,
    profile: &ProfileSettings,
    bootstrap: &BootstrapSettings,
) -> Result<TopologyGraph> {
    let mut graph = build_topology(params, profile)?;
    attach_boot_commands(&mut graph, params.start_kubernetes, bootstrap);
    Ok(graph)
}
