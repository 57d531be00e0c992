//! Application layer: the engines that own every state transition.
//!
//! Each engine re-reads current state from the stores on every call and
//! relies on the stores' conditional writes for atomicity, so any number of
//! instances may run concurrently against the same backing store.

pub mod alerts;
pub mod audit;
pub mod initiator;
pub mod reconciler;
