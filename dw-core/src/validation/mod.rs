//! Temporal message validation
//!
//! A validator keeps its own rolling drift history, independent of any
//! predictor, and checks incoming messages for structure, fingerprint
//! agreement and freshness.

mod validator;

pub use validator::{
    create_message, create_message_at, TmbValidator, ValidationOutcome, ValidatorConfig,
};
