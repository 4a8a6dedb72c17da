//! The experiment LAN.

/// Single flat LAN every node interface is attached to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Lan {
    pub name: String,
    /// Capacity in kbps between every pair of members.
    pub bandwidth_kbps: Option<u64>,
    /// Member interface ids (`node:iface`) in attachment order.
    members: Vec<String>,
}

impl Lan {
    pub fn new(name: impl Into<String>, bandwidth_kbps: Option<u64>) -> Self {
        Self {
            name: name.into(),
            bandwidth_kbps,
            members: Vec::new(),
        }
    }

    pub fn attach(&mut self, interface_id: impl Into<String>) {
        self.members.push(interface_id.into());
    }

    pub fn members(&self) -> &[String] {
        &self.members
    }
}
