//! Access token values and the atomically replaced cache snapshot.

pub mod secret;
pub mod snapshot;
