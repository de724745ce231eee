#![warn(missing_docs)]

//! noisy-zip writes deliberately hostile zip archives, and recovers file
//! trees from archives whose central directory is absent, lying, or
//! poisoned.
//!
//! The write side walks a directory tree and emits a container that lenient,
//! forward-reading extractors accept, while tools that trust the central
//! directory (or scan backwards for the end-of-central-directory magic) get
//! zeroed sizes, trailing garbage, synthetic `.junk/` members and a forged
//! trailer. The recovery side ignores the central directory entirely: it
//! scans the raw bytes for local file headers, guesses name encodings with a
//! plausibility score, and re-inflates payloads without trusting any
//! recorded size.
//!
//! [build()], [recover()] and [recover_to_zip()] are the top-level
//! operations; everything else supports them.

pub mod config;
pub mod encoding;
pub mod error;
pub mod format;
pub mod host;
pub mod recover;
pub mod rng;
pub mod write;

pub use config::{Compression, Config, Strategy};
pub use error::Error;
pub use host::Host;
pub use recover::{recover, recover_to_zip, RecoverReport};
pub use write::{build, BuildReport};
