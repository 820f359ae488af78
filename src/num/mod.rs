pub mod number;

pub use number::{double_to_text, text_to_double};
