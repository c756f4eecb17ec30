//! Transport surface for the quarry resolver.
//!
//! A [`Transporter`] moves bytes for one repository: `peek` checks
//! existence, `get` downloads into memory or a file (optionally resuming),
//! `put` uploads, and `classify` sorts errors into not-found versus
//! everything else. Transfers report progress through a
//! [`TransferListener`] which may cancel at any callback. The collection
//! engine never touches this layer directly; descriptor readers and
//! metadata resolvers are built on it.

mod error;
mod file;
mod listener;
mod task;
mod transporter;

pub use error::{ErrorClass, Result, TransportError};
pub use file::{FileTransporter, FileTransporterFactory};
pub use listener::{NoopTransferListener, TransferFlow, TransferListener};
pub use task::{GetTarget, GetTask, PeekTask, PutSource, PutTask};
pub use transporter::{Transporter, TransporterFactory};
