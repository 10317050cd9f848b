//! Domain types.

pub mod identity;
mod prompts;
mod recipient;

pub use identity::UserIdentity;
pub use prompts::TerminalPrompts;
pub use recipient::RecipientKey;
