pub mod character;
pub mod data_uri;
pub mod gemini;
pub mod prompt;
pub mod result;
pub mod settings;

pub use character::*;
pub use data_uri::*;
pub use gemini::*;
pub use prompt::*;
pub use result::*;
pub use settings::*;
