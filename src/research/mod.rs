//! The iterative research loop and its stages.

pub mod controller;
pub mod dedup;
pub mod executor;
pub mod prompts;
pub mod query;
pub mod reflector;
pub mod state;
pub mod summarizer;
pub mod verifier;

#[cfg(test)]
pub mod testing;

pub use controller::{Collaborators, ProgressObserver, ResearchController};
pub use state::{ResearchState, Stage};
pub use verifier::DomainReputationVerifier;
