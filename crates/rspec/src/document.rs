//! Request document element types, serialized via `quick-xml` + `serde`.
//!
//! Mirrors the GENI v3 request schema plus the emulab extensions the profile
//! needs (Xen VM shape, blockstores).

use serde::Serialize;

use corelib::node::{Node, PhysicalHost, Sliver};
use corelib::{Lan, TopologyGraph};

pub const RSPEC_XMLNS: &str = "http://www.geni.net/resources/rspec/3";
pub const EMULAB_XMLNS: &str = "http://www.protogeni.net/resources/rspec/ext/emulab/1";
pub const XSI_XMLNS: &str = "http://www.w3.org/2001/XMLSchema-instance";
pub const SCHEMA_LOCATION: &str =
    "http://www.geni.net/resources/rspec/3 http://www.geni.net/resources/rspec/3/request.xsd";

const RAW_PC: &str = "raw-pc";
const XEN_VM: &str = "emulab-xen";

// -----------------------------------------------------------------------
// Root
// -----------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename = "rspec")]
pub(crate) struct RequestRspec {
    #[serde(rename = "@xmlns")]
    xmlns: &'static str,
    #[serde(rename = "@xmlns:emulab")]
    xmlns_emulab: &'static str,
    #[serde(rename = "@xmlns:xsi")]
    xmlns_xsi: &'static str,
    #[serde(rename = "@xsi:schemaLocation")]
    schema_location: &'static str,
    #[serde(rename = "@type")]
    kind: &'static str,
    #[serde(rename = "node", default)]
    pub(crate) nodes: Vec<NodeXml>,
    #[serde(rename = "link", default)]
    pub(crate) links: Vec<LinkXml>,
}

impl RequestRspec {
    /// Lay out the graph in creation order: each physical host is emitted
    /// just before the first VM pinned to it.
    pub(crate) fn from_graph(graph: &TopologyGraph) -> Self {
        let mut nodes = Vec::with_capacity(graph.nodes().len() + graph.hosts().len());
        let mut emitted_hosts: Vec<&str> = Vec::new();

        for node in graph.nodes() {
            if let Some(host_name) = node.instantiate_on.as_deref() {
                if !emitted_hosts.contains(&host_name) {
                    if let Some(host) = graph.hosts().iter().find(|h| h.name == host_name) {
                        nodes.push(NodeXml::from_host(host));
                    }
                    emitted_hosts.push(host_name);
                }
            }
            nodes.push(NodeXml::from_node(node));
        }

        // Hosts nothing was pinned to still get requested.
        for host in graph.hosts() {
            if !emitted_hosts.contains(&host.name.as_str()) {
                nodes.push(NodeXml::from_host(host));
            }
        }

        Self {
            xmlns: RSPEC_XMLNS,
            xmlns_emulab: EMULAB_XMLNS,
            xmlns_xsi: XSI_XMLNS,
            schema_location: SCHEMA_LOCATION,
            kind: "request",
            nodes,
            links: vec![LinkXml::from_lan(graph.lan())],
        }
    }
}

// -----------------------------------------------------------------------
// Nodes
// -----------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub(crate) struct NodeXml {
    #[serde(rename = "@client_id")]
    pub(crate) client_id: String,
    #[serde(rename = "@exclusive")]
    exclusive: bool,
    sliver_type: SliverTypeXml,
    #[serde(skip_serializing_if = "Option::is_none")]
    hardware_type: Option<NamedXml>,
    #[serde(skip_serializing_if = "Option::is_none")]
    interface: Option<InterfaceXml>,
    #[serde(skip_serializing_if = "Option::is_none")]
    relation: Option<RelationXml>,
    #[serde(skip_serializing_if = "Option::is_none")]
    services: Option<ServicesXml>,
    #[serde(rename = "emulab:blockstore", skip_serializing_if = "Option::is_none")]
    pub(crate) blockstore: Option<BlockstoreXml>,
}

impl NodeXml {
    fn from_node(node: &Node) -> Self {
        let (sliver_name, xen, exclusive) = match node.sliver {
            Sliver::RawPc => (RAW_PC, None, true),
            Sliver::XenVm { cores, ram_mb } => (
                XEN_VM,
                Some(XenXml {
                    cores,
                    ram: ram_mb,
                }),
                false,
            ),
        };

        Self {
            client_id: node.name.clone(),
            exclusive,
            sliver_type: SliverTypeXml {
                name: sliver_name,
                disk_image: Some(NamedXml {
                    name: node.disk_image.clone(),
                }),
                xen,
            },
            hardware_type: node
                .hardware_type
                .as_ref()
                .map(|name| NamedXml { name: name.clone() }),
            interface: Some(InterfaceXml {
                client_id: node.interface.client_id(&node.name),
                ip: IpXml {
                    address: node.interface.address.to_string(),
                    kind: "ipv4",
                    netmask: node.interface.netmask.to_string(),
                },
            }),
            relation: node.instantiate_on.as_ref().map(|host| RelationXml {
                kind: "instantiate_on",
                client_id: host.clone(),
            }),
            services: node.command.as_ref().map(|cmd| ServicesXml {
                execute: ExecuteXml {
                    shell: cmd.shell.clone(),
                    command: cmd.render(),
                },
            }),
            blockstore: Some(BlockstoreXml {
                name: node.blockstore.name.clone(),
                mountpoint: node.blockstore.mount_point.clone(),
                class: "local",
                size: node.blockstore.size.to_string(),
                placement: node.blockstore.placement.clone(),
            }),
        }
    }

    fn from_host(host: &PhysicalHost) -> Self {
        Self {
            client_id: host.name.clone(),
            exclusive: host.exclusive,
            sliver_type: SliverTypeXml {
                name: RAW_PC,
                disk_image: None,
                xen: None,
            },
            hardware_type: Some(NamedXml {
                name: host.hardware_type.clone(),
            }),
            interface: None,
            relation: None,
            services: None,
            blockstore: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct SliverTypeXml {
    #[serde(rename = "@name")]
    name: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    disk_image: Option<NamedXml>,
    #[serde(rename = "emulab:xen", skip_serializing_if = "Option::is_none")]
    xen: Option<XenXml>,
}

#[derive(Debug, Serialize)]
struct NamedXml {
    #[serde(rename = "@name")]
    name: String,
}

#[derive(Debug, Serialize)]
struct XenXml {
    #[serde(rename = "@cores")]
    cores: u32,
    #[serde(rename = "@ram")]
    ram: u32,
}

#[derive(Debug, Serialize)]
struct InterfaceXml {
    #[serde(rename = "@client_id")]
    client_id: String,
    ip: IpXml,
}

#[derive(Debug, Serialize)]
struct IpXml {
    #[serde(rename = "@address")]
    address: String,
    #[serde(rename = "@type")]
    kind: &'static str,
    #[serde(rename = "@netmask")]
    netmask: String,
}

#[derive(Debug, Serialize)]
struct RelationXml {
    #[serde(rename = "@type")]
    kind: &'static str,
    #[serde(rename = "@client_id")]
    client_id: String,
}

#[derive(Debug, Serialize)]
struct ServicesXml {
    execute: ExecuteXml,
}

#[derive(Debug, Serialize)]
struct ExecuteXml {
    #[serde(rename = "@shell")]
    shell: String,
    #[serde(rename = "@command")]
    command: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct BlockstoreXml {
    #[serde(rename = "@name")]
    name: String,
    #[serde(rename = "@mountpoint")]
    mountpoint: String,
    #[serde(rename = "@class")]
    class: &'static str,
    #[serde(rename = "@size")]
    pub(crate) size: String,
    #[serde(rename = "@placement")]
    placement: String,
}

// -----------------------------------------------------------------------
// LAN
// -----------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub(crate) struct LinkXml {
    #[serde(rename = "@client_id")]
    client_id: String,
    #[serde(rename = "interface_ref", default)]
    pub(crate) interface_refs: Vec<InterfaceRefXml>,
    #[serde(rename = "property", default)]
    pub(crate) properties: Vec<PropertyXml>,
    link_type: NamedXml,
}

impl LinkXml {
    /// Bandwidth is expressed as one capacity property per ordered pair of
    /// member interfaces.
    fn from_lan(lan: &Lan) -> Self {
        let members = lan.members();
        let properties = match lan.bandwidth_kbps {
            Some(capacity) => members
                .iter()
                .flat_map(|src| {
                    members
                        .iter()
                        .filter(move |dst| *dst != src)
                        .map(move |dst| PropertyXml {
                            source_id: src.clone(),
                            dest_id: dst.clone(),
                            capacity,
                        })
                })
                .collect(),
            None => Vec::new(),
        };

        Self {
            client_id: lan.name.clone(),
            interface_refs: members
                .iter()
                .map(|id| InterfaceRefXml {
                    client_id: id.clone(),
                })
                .collect(),
            properties,
            link_type: NamedXml {
                name: "lan".to_string(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct InterfaceRefXml {
    #[serde(rename = "@client_id")]
    client_id: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct PropertyXml {
    #[serde(rename = "@source_id")]
    source_id: String,
    #[serde(rename = "@dest_id")]
    dest_id: String,
    #[serde(rename = "@capacity")]
    capacity: u64,
}
