//! Flutter-facing bindings of the TACOM core.

pub mod api;
