//! Text escaping for rendered content lines.

mod escape;

pub use escape::{escape_param_value, escape_text};
