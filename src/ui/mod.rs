pub mod prompts;
pub mod spinner;

pub use spinner::with_spinner;
