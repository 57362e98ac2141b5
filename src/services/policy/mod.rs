//! Relationship-based authorization against a policy engine (Permify).
pub mod checker;
pub mod engine;
pub mod entity;
pub mod factory;
pub mod mapping;
pub mod permify;
pub mod types;

pub use checker::{PermissionChecker, PermissionOptions, PermissionRule, SubjectOptions};
pub use engine::{PolicyEngine, PolicyError};
pub use entity::{EntityTarget, infer_entities};
pub use mapping::MethodPermissionMap;
pub use permify::PermifyClient;
pub use types::{
    CheckMetadata, EntityRef, PermissionCheckRequest, PermissionCheckResponse,
    PermissionDecision, SubjectRef,
};
