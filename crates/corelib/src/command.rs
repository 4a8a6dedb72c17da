//! Boot-time commands handed to the bootstrap script on each node.
//!
//! Every node runs the same script with a role as its first argument:
//!
//! ```text
//! <script> primary   <address> <cluster size> <start flag> > <log> 2>&1
//! <script> secondary <address> <start flag>                > <log> 2>&1 &
//! ```
//!
//! Secondaries are detached so their boot does not block on joining; the
//! primary runs in the foreground. The start flag is spelled `True`/`False`,
//! which is what the script matches on.

use std::fmt;
use std::net::Ipv4Addr;

use tracing::debug;

use crate::settings::BootstrapSettings;
use crate::topology::TopologyGraph;

/// Bootstrap role passed as the script's first argument.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Role {
    Primary,
    Secondary,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Primary => "primary",
            Role::Secondary => "secondary",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One node's bootstrap invocation.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct BootCommand {
    pub role: Role,
    pub address: Ipv4Addr,
    /// Worker count; only the primary is told.
    pub cluster_size: Option<u64>,
    pub start_cluster: bool,
    /// Run in the background (`&`).
    pub detached: bool,
    pub shell: String,
    script: String,
    log_path: String,
}

impl BootCommand {
    pub fn primary(
        address: Ipv4Addr,
        cluster_size: u64,
        start_cluster: bool,
        settings: &BootstrapSettings,
    ) -> Self {
        Self {
            role: Role::Primary,
            address,
            cluster_size: Some(cluster_size),
            start_cluster,
            detached: false,
            shell: settings.shell.clone(),
            script: settings.script.clone(),
            log_path: settings.log_path.clone(),
        }
    }

    pub fn secondary(address: Ipv4Addr, start_cluster: bool, settings: &BootstrapSettings) -> Self {
        Self {
            role: Role::Secondary,
            address,
            cluster_size: None,
            start_cluster,
            detached: true,
            shell: settings.shell.clone(),
            script: settings.script.clone(),
            log_path: settings.log_path.clone(),
        }
    }

    /// Positional arguments after the script path.
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![self.role.to_string(), self.address.to_string()];
        if let Some(size) = self.cluster_size {
            args.push(size.to_string());
        }
        args.push(start_flag(self.start_cluster).to_string());
        args
    }

    /// Full shell command line, redirection included.
    pub fn render(&self) -> String {
        let mut line = format!(
            "{} {} > {} 2>&1",
            self.script,
            self.args().join(" "),
            self.log_path
        );
        if self.detached {
            line.push_str(" &");
        }
        line
    }
}

impl fmt::Display for BootCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

fn start_flag(start: bool) -> &'static str {
    if start {
        "True"
    } else {
        "False"
    }
}

/// Attach a boot command to every node of `graph`.
///
/// Secondaries are attached first and the primary last. Returns the node
/// names in attachment order.
pub fn attach_boot_commands(
    graph: &mut TopologyGraph,
    start_cluster: bool,
    settings: &BootstrapSettings,
) -> Vec<String> {
    let cluster_size = graph.cluster_size();
    let mut order = Vec::with_capacity(graph.nodes().len());

    let Some((primary, secondaries)) = graph.nodes_mut().split_first_mut() else {
        return order;
    };

    for node in secondaries {
        let command = BootCommand::secondary(node.address(), start_cluster, settings);
        debug!(node = %node.name, command = %command, "attached secondary command");
        node.command = Some(command);
        order.push(node.name.clone());
    }

    let command = BootCommand::primary(primary.address(), cluster_size, start_cluster, settings);
    debug!(node = %primary.name, command = %command, "attached primary command");
    primary.command = Some(command);
    order.push(primary.name.clone());

    order
}
