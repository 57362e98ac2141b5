use std::collections::HashMap;

use axum::http::Method;

/// HTTP method → permission name, used when a rule names no explicit permission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodPermissionMap(HashMap<Method, String>);

impl Default for MethodPermissionMap {
    fn default() -> Self {
        Self::empty()
            .with(Method::GET, "view")
            .with(Method::HEAD, "view")
            .with(Method::OPTIONS, "view")
            .with(Method::POST, "create")
            .with(Method::PUT, "update")
            .with(Method::PATCH, "update")
            .with(Method::DELETE, "delete")
    }
}

impl MethodPermissionMap {
    pub fn empty() -> Self {
        Self(HashMap::new())
    }

    pub fn with(mut self, method: Method, permission: impl Into<String>) -> Self {
        self.0.insert(method, permission.into());
        self
    }

    pub fn without(mut self, method: &Method) -> Self {
        self.0.remove(method);
        self
    }

    pub fn permission_for(&self, method: &Method) -> Option<&str> {
        self.0.get(method).map(String::as_str)
    }
}
