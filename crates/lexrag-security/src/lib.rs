//! Privacy checks and anonymization for lexrag.
//!
//! Two pieces run on every answer before it leaves the pipeline:
//!
//! | Piece | Role |
//! |-------|------|
//! | [`Anonymizer`] | Replaces recognized entities with placeholders (`[Person 1]`, `[PHONE]`, ...) |
//! | [`PrivacyScanner`] | Regex checks for data that must never be shown (phone, Aadhaar, PAN, email) |
//!
//! Entity recognition itself is an external collaborator; this crate only
//! consumes its [`Entity`] list.

pub mod anonymize;
pub mod privacy;

pub use anonymize::{Anonymized, Anonymizer, Entity, EntityKind};
pub use privacy::{PrivacyCategory, PrivacyCheck, PrivacyFinding, PrivacyScanner};
