// wikiedit-common: wire protocol and shared types for the wikiedit workspace

pub mod protocol;
pub mod types;
