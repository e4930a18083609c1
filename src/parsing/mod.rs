//! Low-level archive parsing utilities.
//!
//! - [`mbox`] splits an archive into raw records
//! - [`xml`] pulls XMPP stanzas out of old-style chat records
//! - [`html`] turns new-style HTML chat bodies into plain text
//!
//! The [`crate::extractor`] module combines these into typed messages.

pub mod html;
pub mod mbox;
pub mod xml;

pub use html::{clean_html_body, unescape_entities};
pub use mbox::{MboxReader, RawRecord};
pub use xml::{Stanza, extract_stanzas};
