//! The creator registry (C5): `simple` and `mod` authentication, creator
//! creation and mutation, and the background name-translation hook those
//! flows schedule on create/rename.

pub mod errors;
pub mod registry;
pub mod translator;

pub use errors::TranslationError;
pub use registry::{CreatorRegistry, ModAuth, SimpleAuth};
pub use translator::{NameTranslator, NoopTranslator};
