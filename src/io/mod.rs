//! External collaborators: the translation-table reader and the variant
//! source. Both are out of scope for algorithmic fidelity -- only their
//! interfaces matter to the rest of the crate -- so each is a small trait
//! plus one concrete, testable implementation.

pub mod translation_table;
pub mod variant_source;
