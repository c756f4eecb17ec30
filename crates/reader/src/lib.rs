//! Descriptor and version metadata readers for the quarry resolver.
//!
//! These are the standard filesystem-backed implementations of the reader
//! contracts from `quarry-core`, built on the `quarry-transport` surface:
//! [`JsonDescriptorReader`] fetches and parses descriptor documents,
//! [`MetadataVersionRangeResolver`] expands version ranges against
//! per-artifact version listings. Both consult every repository the request
//! supplies, in order.

mod descriptor;
pub mod layout;
mod versions;

pub use descriptor::JsonDescriptorReader;
pub use versions::MetadataVersionRangeResolver;
