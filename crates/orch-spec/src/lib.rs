pub mod error;
pub mod export;
pub mod persistence;
pub mod validate;

pub use error::{Result, SpecError};
pub use export::export_human_readable;
pub use persistence::{load_approved, load_draft, save_approved, save_draft};
pub use validate::{validate, Finding, Severity};
