mod arbitration;
mod capture;
mod confidence;
mod error;
mod session;

pub use arbitration::{Arbitration, LockDirective, Resolution};
pub use confidence::{Confidence, ConfidenceEvaluator};
pub use error::Error;
pub use session::{InputHandle, Session, State, TranscriptStream};
