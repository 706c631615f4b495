//! Write-once storage for the autoregressive program.
//!
//! The sequential grid layer records, for every cell-slot it has built,
//! the concatenated raw latent vector (box, attributes, depth, presence).
//! [`ProgramArena`] holds those entries for the lifetime of one forward
//! pass. Writes must arrive in canonical raster-then-slot order and each
//! slot may be written exactly once; reads of unwritten slots are
//! rejected. Context assembly resolves [`ContextSource`]s through
//! [`ProgramArena::resolve`].
//!
//! [`ContextSource`]: gridair_space::ContextSource

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod program;

pub use program::ProgramArena;
