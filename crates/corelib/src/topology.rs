//! Cluster topology construction.
//!
//! [`TopologyBuilder`] turns a [`ParameterSet`] into a [`TopologyGraph`]: one
//! control node, the worker nodes, the physical hosts of the exclusive layout,
//! and the LAN joining them.
//!
//! # Output contract
//!
//! - `nodes()[0]` is the control node and has address offset 1.
//! - Node `i` (zero based) has offset `i + 1`; offsets are contiguous in
//!   creation order whether the node is a plain worker or a hosted VM.
//! - Physical hosts get no interface and consume no offset.
//! - Every node owns exactly one interface and one blockstore, and every
//!   interface is a member of the LAN.

use tracing::{debug, info};

use crate::address::{AddressPlan, MAX_HOST_OFFSET};
use crate::error::{Error, Result};
use crate::network::Lan;
use crate::node::{Blockstore, Interface, Node, NodeRole, PhysicalHost, Sliver, VolumeSize};
use crate::params::{ExclusiveHosting, Hosting, ParameterSet};
use crate::settings::ProfileSettings;

pub const LAN_NAME: &str = "lan0";

/// The complete node/host/LAN graph for one request.
#[derive(Clone, Debug)]
pub struct TopologyGraph {
    nodes: Vec<Node>,
    hosts: Vec<PhysicalHost>,
    lan: Lan,
    cluster_size: u64,
}

impl TopologyGraph {
    /// Addressed nodes in creation order, control node first.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub(crate) fn nodes_mut(&mut self) -> &mut [Node] {
        &mut self.nodes
    }

    pub fn hosts(&self) -> &[PhysicalHost] {
        &self.hosts
    }

    pub fn lan(&self) -> &Lan {
        &self.lan
    }

    pub fn control(&self) -> Option<&Node> {
        self.nodes.first()
    }

    pub fn workers(&self) -> &[Node] {
        self.nodes.get(1..).unwrap_or(&[])
    }

    /// Worker count reported to the primary's bootstrap.
    pub fn cluster_size(&self) -> u64 {
        self.cluster_size
    }

    pub fn node(&self, name: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.name == name)
    }
}

/// Builds a [`TopologyGraph`] from validated parameters.
#[derive(Debug, Clone)]
pub struct TopologyBuilder<'a> {
    settings: &'a ProfileSettings,
}

impl<'a> TopologyBuilder<'a> {
    pub fn new(settings: &'a ProfileSettings) -> Self {
        Self { settings }
    }

    pub fn build(&self, params: &ParameterSet) -> Result<TopologyGraph> {
        self.settings.validate()?;

        // Parameters may not have gone through binding; reject before allocating.
        let requested = params.addressed_node_count();
        if requested > u64::from(MAX_HOST_OFFSET) {
            return Err(Error::AddressSpaceExhausted {
                requested: u32::try_from(requested).unwrap_or(u32::MAX),
                capacity: u32::from(MAX_HOST_OFFSET),
            });
        }

        let bandwidth = match params.hosting {
            Hosting::Fixed => self.settings.lan_bandwidth_kbps,
            Hosting::Exclusive(_) => None,
        };
        let mut state = BuildState {
            plan: self.settings.address_plan()?,
            nodes: Vec::with_capacity(requested as usize),
            hosts: Vec::new(),
            lan: Lan::new(LAN_NAME, bandwidth),
        };

        let control = self.node(
            &mut state,
            NodeRole::Control,
            Sliver::RawPc,
            Some(params.node_type.clone()),
            params,
        )?;
        state.push(control);

        let slots = params.node_count.saturating_sub(1);
        match &params.hosting {
            Hosting::Fixed => {
                let sliver = Sliver::XenVm {
                    cores: self.settings.worker_cores,
                    ram_mb: self.settings.worker_ram_mb,
                };
                for _ in 0..slots {
                    let worker = self.node(&mut state, NodeRole::Worker, sliver, None, params)?;
                    state.push(worker);
                }
            }
            Hosting::Exclusive(shape) => {
                for slot in 0..slots {
                    self.hosted_slot(&mut state, slot, shape, params)?;
                }
            }
        }

        let graph = TopologyGraph {
            nodes: state.nodes,
            hosts: state.hosts,
            lan: state.lan,
            cluster_size: params.worker_count(),
        };
        info!(
            nodes = graph.nodes.len(),
            hosts = graph.hosts.len(),
            cluster_size = graph.cluster_size,
            "built topology"
        );
        Ok(graph)
    }

    /// One physical-host slot of the exclusive layout.
    fn hosted_slot(
        &self,
        state: &mut BuildState,
        slot: u32,
        shape: &ExclusiveHosting,
        params: &ParameterSet,
    ) -> Result<()> {
        // Hosts are never given an interface; only VMs consume offsets.
        let host = if shape.exclusive {
            let host = PhysicalHost {
                name: format!("host{}", slot + 1),
                hardware_type: params.node_type.clone(),
                exclusive: true,
            };
            debug!(host = %host.name, "created physical host");
            let name = host.name.clone();
            state.hosts.push(host);
            Some(name)
        } else {
            None
        };

        let sliver = Sliver::XenVm {
            cores: shape.cores_per_vm,
            ram_mb: shape.worker_ram_mb,
        };
        for _ in 0..shape.core_count {
            let mut worker = self.node(state, NodeRole::Worker, sliver, None, params)?;
            worker.instantiate_on = host.clone();
            state.push(worker);
        }
        Ok(())
    }

    /// Create the next node: name, address, LAN membership, blockstore.
    fn node(
        &self,
        state: &mut BuildState,
        role: NodeRole,
        sliver: Sliver,
        hardware_type: Option<String>,
        params: &ParameterSet,
    ) -> Result<Node> {
        let name = format!("node{}", state.nodes.len() + 1);
        let interface = Interface {
            name: self.settings.interface_name.clone(),
            address: state.plan.allocate()?,
            netmask: state.plan.netmask(),
        };
        state.lan.attach(interface.client_id(&name));

        let blockstore = Blockstore {
            name: format!("{}-bs", name),
            mount_point: self.settings.mount_point.clone(),
            size: VolumeSize::from_gb(params.temp_fs_size_gb),
            placement: self.settings.placement.clone(),
        };

        debug!(node = %name, address = %interface.address, ?role, "created node");
        Ok(Node {
            name,
            role,
            sliver,
            disk_image: self.settings.disk_image.clone(),
            hardware_type,
            interface,
            blockstore,
            instantiate_on: None,
            command: None,
        })
    }
}

struct BuildState {
    plan: AddressPlan,
    nodes: Vec<Node>,
    hosts: Vec<PhysicalHost>,
    lan: Lan,
}

impl BuildState {
    fn push(&mut self, node: Node) {
        self.nodes.push(node);
    }
}

/// Build the topology for `params` with the given settings.
pub fn build_topology(params: &ParameterSet, settings: &ProfileSettings) -> Result<TopologyGraph> {
    TopologyBuilder::new(settings).build(params)
}
