#![forbid(unsafe_code)]
#![warn(clippy::std_instead_of_core)]

//! Path resolution and on-demand URDF generation for robot description
//! packages.
//!
//! [`find_paths`] computes where a robot's URDF, SRDF and parameter files
//! live. When the URDF has not been generated yet, every `*.urdf.xacro`
//! template of the package is expanded first by a [`TemplateBuilder`].

pub mod engine;
pub mod error;
pub mod paths;
pub mod templates;
pub mod xacro;

#[cfg(test)]
mod test_utils;

pub use engine::{TemplateEngine, XacroCommand};
pub use error::{Error, Result, XacroError};
pub use paths::{find_paths, PathResolver, PathResolverBuilder, ResourceBundle, DEFAULT_FAMILY};
pub use templates::TemplateBuilder;
pub use xacro::{XacroBuilder, XacroProcessor};
