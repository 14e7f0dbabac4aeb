//! # Workflows Module
//!
//! Multi-step procedures that tie the layers together and report progress through a
//! [`crate::progress::ProgressReporter`].
//!
//! - **Connect** ([`connect`]) - opens the session, authorizes node access on clusters,
//!   picks the GPU and checks the host answers.

pub mod connect;
