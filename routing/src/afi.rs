// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Address family and sub-address family identifiers

use crate::errors::RouterError;
use std::fmt::Display;

/// Address family of a RIB table
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Afi {
    Ip = 1,
    Ip6 = 2,
    L2vpn = 3,
}

impl Afi {
    /// Label used in operator-facing output
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Afi::Ip => "IPv4",
            Afi::Ip6 => "IPv6",
            Afi::L2vpn => "l2vpn",
        }
    }
}

impl TryFrom<u8> for Afi {
    type Error = RouterError;
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Afi::Ip),
            2 => Ok(Afi::Ip6),
            3 => Ok(Afi::L2vpn),
            _ => Err(RouterError::InvalidAfi(value)),
        }
    }
}

impl Display for Afi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// Sub-address family of a RIB table
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Safi {
    Unicast = 1,
    Multicast = 2,
    MplsVpn = 3,
    Encap = 4,
    Evpn = 5,
    LabeledUnicast = 6,
    Flowspec = 7,
}

impl Safi {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Safi::Unicast => "unicast",
            Safi::Multicast => "multicast",
            Safi::MplsVpn => "vpn",
            Safi::Encap => "encap",
            Safi::Evpn => "evpn",
            Safi::LabeledUnicast => "labeled-unicast",
            Safi::Flowspec => "flowspec",
        }
    }
}

impl TryFrom<u8> for Safi {
    type Error = RouterError;
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Safi::Unicast),
            2 => Ok(Safi::Multicast),
            3 => Ok(Safi::MplsVpn),
            4 => Ok(Safi::Encap),
            5 => Ok(Safi::Evpn),
            6 => Ok(Safi::LabeledUnicast),
            7 => Ok(Safi::Flowspec),
            _ => Err(RouterError::InvalidSafi(value)),
        }
    }
}

impl Display for Safi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn afi_safi_conversions() {
        assert_eq!(Afi::try_from(2u8), Ok(Afi::Ip6));
        assert_eq!(Afi::try_from(0u8), Err(RouterError::InvalidAfi(0)));
        assert_eq!(Safi::try_from(6u8), Ok(Safi::LabeledUnicast));
        assert_eq!(Safi::try_from(8u8), Err(RouterError::InvalidSafi(8)));
    }

    #[test]
    fn afi_safi_order_follows_values() {
        assert!(Afi::Ip < Afi::Ip6 && Afi::Ip6 < Afi::L2vpn);
        assert!(Safi::Unicast < Safi::Multicast && Safi::Evpn < Safi::Flowspec);
    }

    #[test]
    fn labels_honor_padding() {
        assert_eq!(format!("{:>7}", Afi::Ip), "   IPv4");
        assert_eq!(format!("{:>10}", Safi::MplsVpn), "       vpn");
    }
}
