//! Control plane for hierarchical work decomposition.
//!
//! Work is split Epic → Roadmap → Phase → Task. A parent allocates token
//! budget to each child ([`budget`]), delegates with a spawn message and
//! parses the child's textual report ([`protocol`]), rolls completion back
//! up ([`progress`], [`hierarchy`]) and checks quality gates before it
//! advances ([`gates`]). [`coordinator`] wires these together for one
//! parent.

pub mod budget;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod gates;
pub mod github;
pub mod hierarchy;
pub mod progress;
pub mod protocol;
pub mod state;
