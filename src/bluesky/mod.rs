// Bluesky collaborators — identity lookups, moderator sessions, label emission.
//
// Plain reqwest over XRPC. Each submodule handles one area of the AT
// Protocol surface the pipeline touches.

pub mod client;
pub mod labeler;
pub mod profiles;
pub mod session;

pub use client::PublicAtpClient;
pub use labeler::OzoneLabeler;
pub use profiles::{IdentityResolver, PassthroughResolver};
