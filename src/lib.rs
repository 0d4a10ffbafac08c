//! # cert-forge – roster-validated certificate generator
//!
//! Renders a participation certificate from a name, event and date, checks
//! the participant against a registration roster, and exports the result as
//! a print-ready document. The stages are:
//!
//! 1. **Validate** – form fields and roster membership ([`certificate`], [`roster`])
//! 2. **Render** – paint onto a raster surface, over a template image or with
//!    the code-drawn fallback design ([`render`], [`surface`], [`fonts`])
//! 3. **Export** – single-page A4 landscape PDF or self-printing HTML ([`export`])
//!
//! [`session::Session`] owns the state between user actions.

pub mod certificate;
pub mod error;
pub mod export;
pub mod fonts;
pub mod layout_config;
pub mod render;
pub mod roster;
pub mod session;
pub mod surface;

// Re-exports for convenience
pub use certificate::{CertificateForm, CertificateRecord};
pub use error::{CertError, Result};
pub use layout_config::LayoutConfig;
pub use roster::Roster;
pub use session::{Session, SessionConfig};
