//! Fixed profile constants, overridable from the `[profile]` and
//! `[bootstrap]` sections of the config file.

use std::net::Ipv4Addr;

use serde::Deserialize;

use crate::address::{parse_prefix, AddressPlan};
use crate::error::{Error, Result};

pub const DEFAULT_DISK_IMAGE: &str =
    "urn:publicid:IDN+utah.cloudlab.us+image+cuadvnetfall2022-PG0:k8s-flannel:1";

/// `[profile]` section: addressing, image and worker shape.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ProfileSettings {
    /// First three octets of the LAN subnet.
    pub base_ip: String,
    pub netmask: String,
    pub disk_image: String,
    /// LAN capacity in kbps. Only applied to the fixed layout.
    pub lan_bandwidth_kbps: Option<u64>,
    pub mount_point: String,
    pub placement: String,
    pub interface_name: String,
    /// Worker VM shape for the fixed layout.
    pub worker_cores: u32,
    pub worker_ram_mb: u32,
}

impl Default for ProfileSettings {
    fn default() -> Self {
        Self {
            base_ip: "10.10.1".to_string(),
            netmask: "255.255.255.0".to_string(),
            disk_image: DEFAULT_DISK_IMAGE.to_string(),
            lan_bandwidth_kbps: Some(10_000_000),
            mount_point: "/mydata".to_string(),
            placement: "any".to_string(),
            interface_name: "if1".to_string(),
            worker_cores: 1,
            worker_ram_mb: 16384,
        }
    }
}

impl ProfileSettings {
    /// A fresh address plan for this subnet.
    pub fn address_plan(&self) -> Result<AddressPlan> {
        let prefix = parse_prefix(&self.base_ip)?;
        let netmask = self.netmask.parse::<Ipv4Addr>().map_err(|_| {
            Error::InvalidSettings(format!("netmask {:?} is not an IPv4 address", self.netmask))
        })?;
        Ok(AddressPlan::new(prefix, netmask))
    }

    /// Check everything the builder relies on.
    pub fn validate(&self) -> Result<()> {
        self.address_plan()?;
        if self.disk_image.trim().is_empty() {
            return Err(Error::InvalidSettings("disk_image must not be empty".to_string()));
        }
        if self.interface_name.trim().is_empty() {
            return Err(Error::InvalidSettings(
                "interface_name must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// `[bootstrap]` section: how each node invokes the setup script.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BootstrapSettings {
    pub script: String,
    pub log_path: String,
    pub shell: String,
}

impl Default for BootstrapSettings {
    fn default() -> Self {
        Self {
            script: "/local/repository/start.sh".to_string(),
            log_path: "/home/k8s-flannel/start.log".to_string(),
            shell: "bash".to_string(),
        }
    }
}
