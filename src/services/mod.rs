//! Domain services
//!
//! - `reactions` - like/dislike toggles on posts
//! - `follows` - follow graph edges between users
//! - `tokens` - single-use verification and reset tokens
//! - `mailer` - outgoing mail backends
//! - `moderation` - profanity screening

pub mod follows;
pub mod mailer;
pub mod moderation;
pub mod reactions;
pub mod tokens;

pub use follows::{FollowOutcome, FollowService};
pub use mailer::{reset_mail, verification_mail, LogMailer, Mailer, OutgoingMail, SendGridMailer};
pub use moderation::is_profane;
pub use reactions::{Reaction, ReactionEngine, ReactionOutcome, ReactionState};
pub use tokens::{IssuedToken, Redemption, TokenWorkflow};
