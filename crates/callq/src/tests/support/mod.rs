//! Test doubles and scenario state shared by the callq suites.

mod rules;
mod transport;
mod world;

pub use rules::rule_for;
pub use transport::MockTransport;
pub use world::{QueueWorld, world};
