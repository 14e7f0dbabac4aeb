//! Job parameters: a TOML file ([`file`]), `--set` overrides and CLI flags merged over the
//! built-in [`defaults`] by [`builder`].

pub mod builder;
pub mod defaults;
pub mod file;

pub use builder::build_job_request;
