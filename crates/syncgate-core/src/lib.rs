//! Core logic for `syncgate`, a CI gate that launches two papyrus nodes,
//! lets them sync over the peer-to-peer network, and asserts that the
//! client's state marker has advanced past a threshold.
//!
//! The node binary is an external collaborator: the gate reaches it only
//! through its command-line invocation ([`launcher`]) and its monitoring
//! HTTP endpoint ([`metrics`]). [`runner`] wires the phases together and
//! guarantees both node process groups are torn down on every exit path.

pub mod config;
pub mod launcher;
pub mod metrics;
pub mod runner;
