// Cinder: spam and scam moderation pre-filter for Bluesky
//
// This is the library root. Each module corresponds to a major subsystem
// of the detection pipeline or one of its collaborators.

pub mod bluesky;
pub mod classifier;
pub mod clock;
pub mod config;
pub mod db;
pub mod ignore;
pub mod matcher;
pub mod moderation;
pub mod output;
pub mod pipeline;
pub mod retry;
