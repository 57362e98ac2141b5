pub mod core;
pub mod types;

pub use self::core::{Claims, Decision, Vars, set_var, var_str};
pub use types::{ClaimSet, RequestVars};

/// Variable the authentication middleware publishes the subject claim under.
pub const SUBJECT_VAR: &str = "sub";
