//! [`ChannelRegistry`] – the fixed set of channels a bridge node owns.
//!
//! Built once from a list of [`ChannelDecl`]s.  Construction is pure and
//! deterministic: the same declarations always yield the same descriptors
//! in the same order.  Every structural fault (bad or duplicate name,
//! missing payload shape, empty table) is reported here, never at runtime.
//!
//! # Name resolution
//!
//! Private names (`~name`) resolve to `/<namespace>/name`.  Absolute names
//! (`/a/b`) are kept as-is.  Anything else is rejected.

use std::collections::HashSet;
use std::sync::Arc;

use roscom_types::BridgeError;

use crate::channel::{ChannelDecl, ChannelDescriptor, ChannelRole};

/// Ordered, immutable collection of [`ChannelDescriptor`]s.
#[derive(Debug, Clone)]
pub struct ChannelRegistry {
    channels: Vec<Arc<ChannelDescriptor>>,
}

impl ChannelRegistry {
    /// Resolve and validate `decls` under `namespace`.
    ///
    /// # Errors
    ///
    /// - [`BridgeError::EmptyRegistry`] when `decls` is empty.
    /// - [`BridgeError::InvalidChannelName`] for malformed names or a
    ///   malformed namespace.
    /// - [`BridgeError::MissingPayloadShape`] when a declaration (or a
    ///   service's response) has no shape.
    /// - [`BridgeError::DuplicateChannel`] when two declarations resolve to
    ///   the same name.
    pub fn build(namespace: &str, decls: Vec<ChannelDecl>) -> Result<Self, BridgeError> {
        if decls.is_empty() {
            return Err(BridgeError::EmptyRegistry);
        }
        if !is_valid_segment_path(namespace) {
            return Err(BridgeError::InvalidChannelName(namespace.to_string()));
        }

        let mut seen = HashSet::new();
        let mut channels = Vec::with_capacity(decls.len());
        for decl in decls {
            let name = resolve_name(namespace, decl.name)?;
            let role = decl.handler.role();
            let payload = decl
                .payload
                .ok_or_else(|| BridgeError::MissingPayloadShape(name.clone()))?;
            if role == ChannelRole::Service && decl.response.is_none() {
                return Err(BridgeError::MissingPayloadShape(name));
            }
            if !seen.insert(name.clone()) {
                return Err(BridgeError::DuplicateChannel(name));
            }
            channels.push(Arc::new(ChannelDescriptor::new(
                name,
                decl.handler,
                payload,
                decl.response,
            )));
        }

        Ok(Self { channels })
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Descriptors in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<ChannelDescriptor>> {
        self.channels.iter()
    }

    /// Descriptors playing `role`, in declaration order.
    pub fn with_role(&self, role: ChannelRole) -> impl Iterator<Item = &Arc<ChannelDescriptor>> {
        self.channels.iter().filter(move |c| c.role() == role)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<ChannelDescriptor>> {
        self.channels.iter().find(|c| c.name() == name)
    }
}

/// Resolve a declared channel name against `namespace`.
pub fn resolve_name(namespace: &str, name: &str) -> Result<String, BridgeError> {
    let resolved = if let Some(private) = name.strip_prefix('~') {
        format!("/{namespace}/{private}")
    } else {
        name.to_string()
    };
    match resolved.strip_prefix('/') {
        Some(path) if is_valid_segment_path(path) => Ok(resolved),
        _ => Err(BridgeError::InvalidChannelName(name.to_string())),
    }
}

/// `a/b_c/d1`: non-empty segments of ASCII alphanumerics and underscores,
/// each starting with a letter.
fn is_valid_segment_path(path: &str) -> bool {
    !path.is_empty()
        && path.split('/').all(|segment| {
            let mut chars = segment.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}
