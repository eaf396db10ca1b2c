// src/job/mod.rs

//! Job descriptions discovered in the spool directory.
//!
//! - [`descriptor`] holds the immutable [`JobDescriptor`].
//! - [`parser`] turns a job file (or inline job text) into a descriptor.
//! - [`archive`] moves processed job files out of the spool directory.

pub mod archive;
pub mod descriptor;
pub mod parser;

pub use archive::JobArchive;
pub use descriptor::JobDescriptor;
pub use parser::{JobParser, JobSource};
