//! Node abstractions for the generated cluster.
//!
//! A [`Node`] is one addressed compute unit: the control node or a worker VM.
//! A [`PhysicalHost`] only exists in the exclusive layout and carries no
//! network identity of its own.

use std::fmt;
use std::net::Ipv4Addr;

use crate::command::BootCommand;

/// Position of a node in the cluster.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum NodeRole {
    Control,
    Worker,
}

/// What kind of machine the platform should provision.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Sliver {
    /// A whole physical machine.
    RawPc,
    /// A Xen virtual machine with a fixed shape.
    XenVm { cores: u32, ram_mb: u32 },
}

/// The single experiment-LAN interface of a node.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Interface {
    /// Name local to the node, e.g. `if1`.
    pub name: String,
    pub address: Ipv4Addr,
    pub netmask: Ipv4Addr,
}

impl Interface {
    /// Globally unique id as the request document refers to it.
    pub fn client_id(&self, node_name: &str) -> String {
        format!("{}:{}", node_name, self.name)
    }
}

/// Requested size of an ephemeral volume.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum VolumeSize {
    /// As large as the platform allows. Rendered as `0GB`.
    Maximum,
    Gigabytes(u32),
}

impl VolumeSize {
    pub fn from_gb(gb: u32) -> Self {
        if gb == 0 {
            VolumeSize::Maximum
        } else {
            VolumeSize::Gigabytes(gb)
        }
    }
}

impl fmt::Display for VolumeSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VolumeSize::Maximum => f.write_str("0GB"),
            VolumeSize::Gigabytes(gb) => write!(f, "{}GB", gb),
        }
    }
}

/// Experiment-lifetime block storage attached to a node.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Blockstore {
    pub name: String,
    pub mount_point: String,
    pub size: VolumeSize,
    pub placement: String,
}

/// A provisioned, addressed compute unit.
#[derive(Clone, Debug)]
pub struct Node {
    /// Stable name: `node1`, `node2`, ...
    pub name: String,
    pub role: NodeRole,
    pub sliver: Sliver,
    pub disk_image: String,
    /// Hardware type constraint. Only set on raw machines.
    pub hardware_type: Option<String>,
    pub interface: Interface,
    pub blockstore: Blockstore,
    /// Name of the physical host this VM is pinned to.
    pub instantiate_on: Option<String>,
    /// Boot-time command, attached after the topology is complete.
    pub command: Option<BootCommand>,
}

impl Node {
    pub fn address(&self) -> Ipv4Addr {
        self.interface.address
    }

    pub fn is_control(&self) -> bool {
        self.role == NodeRole::Control
    }
}

/// Dedicated machine that hosts worker VMs in the exclusive layout.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct PhysicalHost {
    pub name: String,
    pub hardware_type: String,
    /// Not shared with other experiments.
    pub exclusive: bool,
}
