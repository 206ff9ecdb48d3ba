//! Git hosting conventions used to locate published releases.
//!
//! - [`uri`]: canonical HTTPS form of repository URIs and provider detection
//! - [`credentials`]: credential store lookup for authenticated API access

pub mod credentials;
pub mod uri;

pub use credentials::{AuthMethod, Credential, CredentialResolver};
pub use uri::Provider;
