//! Sequential IPv4 address assignment on the experiment LAN.
//!
//! The bootstrap script on every node assumes the control node sits at
//! `<base>.1` and that the remaining cluster members follow at contiguous
//! offsets. [`AddressPlan`] is the only place offsets are handed out, so that
//! assumption holds for every layout the topology builder produces.

use std::net::Ipv4Addr;

use crate::error::{Error, Result};

/// Offset of the control node. Always the first host address.
pub const CONTROL_OFFSET: u8 = 1;

/// Highest usable host offset in a /24 (`.255` is broadcast).
pub const MAX_HOST_OFFSET: u8 = 254;

/// Parse a three-octet network prefix such as `"10.10.1"`.
pub fn parse_prefix(prefix: &str) -> Result<[u8; 3]> {
    let mut octets = [0u8; 3];
    let mut parts = prefix.split('.');
    for octet in octets.iter_mut() {
        *octet = parts
            .next()
            .and_then(|p| p.parse::<u8>().ok())
            .ok_or_else(|| {
                Error::InvalidSettings(format!("base_ip {:?} is not three dotted octets", prefix))
            })?;
    }
    if parts.next().is_some() {
        return Err(Error::InvalidSettings(format!(
            "base_ip {:?} is not three dotted octets",
            prefix
        )));
    }
    Ok(octets)
}

/// Hands out host addresses in strict creation order.
///
/// # Invariants
///
/// - The first call to [`AddressPlan::allocate`] returns offset 1.
/// - Each later call returns the previous offset plus one; nothing is skipped
///   or reused.
#[derive(Debug, Clone)]
pub struct AddressPlan {
    prefix: [u8; 3],
    netmask: Ipv4Addr,
    next_offset: u16,
}

impl AddressPlan {
    pub fn new(prefix: [u8; 3], netmask: Ipv4Addr) -> Self {
        Self {
            prefix,
            netmask,
            next_offset: u16::from(CONTROL_OFFSET),
        }
    }

    /// Address at `offset` within this plan's subnet.
    pub fn address_at(&self, offset: u8) -> Ipv4Addr {
        let [a, b, c] = self.prefix;
        Ipv4Addr::new(a, b, c, offset)
    }

    pub fn netmask(&self) -> Ipv4Addr {
        self.netmask
    }

    /// Number of offsets handed out so far.
    pub fn allocated(&self) -> u16 {
        self.next_offset - u16::from(CONTROL_OFFSET)
    }

    /// Next address in creation order.
    pub fn allocate(&mut self) -> Result<Ipv4Addr> {
        if self.next_offset > u16::from(MAX_HOST_OFFSET) {
            return Err(Error::AddressSpaceExhausted {
                requested: u32::from(self.next_offset),
                capacity: u32::from(MAX_HOST_OFFSET),
            });
        }
        // Bounded by MAX_HOST_OFFSET above.
        let offset = self.next_offset as u8;
        self.next_offset += 1;
        Ok(self.address_at(offset))
    }
}
