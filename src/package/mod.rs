//! Package formatters.
//!
//! Every backend consumes the staged tree (or, for DEB, the per-module
//! outputs selected by the same gates) and writes only under `build/`.
//! A failing backend never removes the staged tree or another backend's
//! output.

pub mod bundle;
pub mod deb;
pub mod gppkg;
pub mod rpm;
pub mod tarball;

pub use bundle::ArtifactMetadata;
pub use deb::DebArtifact;
pub use gppkg::GppkgArtifact;
pub use rpm::RpmArtifact;
pub use tarball::TarArtifact;
