//! Cluster coordination slice.
//!
//! Every instance registers a heartbeat row once per cleanup cycle, prunes rows that went
//! silent and compares the lowest live node id with its own. The winner deletes expired
//! published entries. A separate keep-alive loop pings the store so idle connections survive.
mod election;
mod error;
mod jobs;
mod node;

pub use crate::election::{HeartbeatElection, LeaderElection, Role};
pub use crate::error::{ClusterError, ClusterErrorExt};
pub use crate::jobs::{BackgroundJobs, run_cleanup_cycle};
pub use crate::node::{local_node_id, node_id_from_ip, outbound_ip};
