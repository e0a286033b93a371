//! Test suites for the callq core.

pub(crate) mod support;
