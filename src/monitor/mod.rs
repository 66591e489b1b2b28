//! The background monitor and everything the hub uses to drive it.

pub mod mailbox;
pub mod relay;
pub mod supervisor;
pub mod worker;
