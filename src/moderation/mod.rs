// Moderation actions — the label vocabulary and the actuator interface.
//
// LabelActuator is implemented by bluesky::labeler::OzoneLabeler for real
// label emission and by DryRunLabeler for log-only runs.

pub mod traits;

pub use traits::{DryRunLabeler, LabelActuator, LabelSubject};

/// Label values this service emits.
pub mod labels {
    pub const SPAM: &str = "spam";
    pub const POTENTIAL_SCAM: &str = "potential-scam";
    pub const SHILLING_CRYPTO: &str = "shilling-crypto";
    pub const BOT_ACTIVITY: &str = "bot-activity";
    pub const FOMO_INDUCER: &str = "fomo-inducer";
}
