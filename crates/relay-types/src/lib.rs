//! Shared wire types, canonical serialization and the error taxonomy for the
//! anonymizing intent-execution relay.
//!
//! Plays the role a `*-types` crate plays in a layered facilitator: every
//! other crate in this workspace depends on this one for the `Intent`
//! schema, the registry's lifecycle types, and `RelayError`, but this crate
//! depends on nothing workspace-internal.

pub mod amm;
pub mod b64;
pub mod canonical;
pub mod config;
pub mod error;
pub mod intent;
pub mod registry;
pub mod timestamp;

pub use canonical::{CanonicalIntentView, intent_hash};
pub use error::{RelayError, RelayResult};
pub use intent::{Action, Intent};
pub use registry::{ExecutionPlan, IntentStatus, RegistryEntry, ReplayLookup, Route};
pub use timestamp::UnixTimestampMs;
