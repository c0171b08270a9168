mod error;
mod logging;

pub use error::{err, Context, Error, ErrorKind, Result};
pub use logging::init_logging;
