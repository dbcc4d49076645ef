//! Utility functions for short codes, URLs, deadlines, and request metadata.

pub mod code_generator;
pub mod deadline;
pub mod request;
pub mod url_validator;
