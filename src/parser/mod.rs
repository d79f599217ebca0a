pub mod error;
pub mod explodes;
pub mod registry;
pub mod subparser;

pub use error::{ParseError, ParseErrorKind};
pub use registry::{Decoder, DecoderTable};
pub use subparser::{detect_format, parse_subscription, SubFormat};
