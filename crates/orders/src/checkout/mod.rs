//! Checkout workflow.
//!
//! A [`CheckoutPipeline`] walks the customer through its panes:
//!
//! ```text
//! collecting --process ok--> reviewing --submit--> submitting --> complete
//!     ^                        |    ^                   |
//!     +--------- back ---------+    +--- gate rejects --+
//!                                   +--- save fails ----+
//! ```
//!
//! A submission whose completion status cannot be resolved ends `failed`.

mod gate;
mod pane;
pub mod panes;
mod pipeline;
mod session;

pub use gate::{GateOutcome, PaymentSubmissionGate, SubmissionGate};
pub use pane::{
    CheckoutInput, CheckoutPane, PaneCapabilities, PaneContext, PaneError, PaneField, PaneInput,
    PaneView, ReviewLine,
};
pub use panes::{AddressPane, CommentsPane, CustomerPane, PaymentPane};
pub use pipeline::{CheckoutPipeline, ReviewSection, SubmitOutcome};
pub use session::{CheckoutSession, CheckoutStage};
