// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The error results used by this library.

use crate::router::RouterStatus;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum RouterError {
    #[error("Invalid address family {0}")]
    InvalidAfi(u8),

    #[error("Invalid sub-address family {0}")]
    InvalidSafi(u8),

    #[error("Invalid route protocol {0}")]
    InvalidRouteProto(u8),

    #[error("Prefix {0} does not belong to the family of the table")]
    FamilyMismatch(String),

    #[error("Source prefixes are only supported in IPv6 tables")]
    SrcPrefixUnsupported,

    #[error("Invalid meta-queue sub-queue {0}")]
    InvalidSubQueue(usize),

    #[error("Router can't {op} while {status}")]
    InvalidTransition {
        op: &'static str,
        status: RouterStatus,
    },

    #[error("Router is not initialized")]
    NotInitialized,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(&'static str),
}
