//! Language-specific unit extractors.

pub mod javascript;
pub mod python;

pub use python::PythonExtractor;
