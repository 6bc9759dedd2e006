pub mod category;
pub mod outcome;
pub mod reference;

pub use category::{CategoryFilter, ModuleCategory};
pub use outcome::ProbeOutcome;
pub use reference::{Module, ModuleReference};
