// Layer 1: Standard library imports
use std::fmt::{self, Display};

// Layer 2: Third-party crate imports
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// Layer 3: Internal module imports
// (none)

/// Unique identifier for a silo within the cluster.
///
/// # Design
/// Silo ids are opaque strings chosen by the operator (host names, pod names,
/// generated tokens). The runtime never inspects the content; it only compares
/// bytes exactly and orders lexicographically for deterministic tie-breaking
/// on the hash ring.
///
/// # Example
/// ```rust
/// use strand_rt::util::SiloId;
///
/// let silo = SiloId::new("silo-a");
/// assert_eq!(silo.as_str(), "silo-a");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SiloId(String);

impl SiloId {
    /// Create a silo id from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the underlying string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Get the raw bytes used for hashing.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl Display for SiloId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SiloId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Logical actor identity: the `(actor_type, actor_id)` routing pair.
///
/// # Design
/// Both components are opaque byte strings with exact, case-sensitive
/// equality. The pair as a whole is the unit of placement and activation;
/// hashing for ring placement streams both components through one hasher
/// without building a joined string (see [`crate::ring::hash`]).
///
/// # Example
/// ```rust
/// use strand_rt::util::ActorKey;
///
/// let key = ActorKey::new("Counter", "c1");
/// assert_eq!(key.actor_type(), "Counter");
/// assert_eq!(key.actor_id(), "c1");
/// assert_ne!(key, ActorKey::new("counter", "c1")); // case-sensitive
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActorKey {
    actor_type: String,
    actor_id: String,
}

impl ActorKey {
    /// Create a new actor key.
    pub fn new(actor_type: impl Into<String>, actor_id: impl Into<String>) -> Self {
        Self {
            actor_type: actor_type.into(),
            actor_id: actor_id.into(),
        }
    }

    /// The application-chosen type tag.
    pub fn actor_type(&self) -> &str {
        &self.actor_type
    }

    /// The per-type unique actor id.
    pub fn actor_id(&self) -> &str {
        &self.actor_id
    }
}

impl Display for ActorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.actor_type, self.actor_id)
    }
}

/// Unique identifier for request/response correlation.
///
/// Every request envelope carries a fresh `MessageId`; the matching response
/// echoes it, and the transport pending map is keyed by it.
///
/// # Example
/// ```rust
/// use strand_rt::util::MessageId;
///
/// let id = MessageId::new();
/// println!("Message ID: {id}");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(Uuid);

impl MessageId {
    /// Generate a new random MessageId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create MessageId from existing UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silo_id_roundtrip() {
        let id = SiloId::new("silo-1");
        assert_eq!(id.as_str(), "silo-1");
        assert_eq!(format!("{id}"), "silo-1");
    }

    #[test]
    fn test_silo_id_ordering() {
        let a = SiloId::new("silo-a");
        let b = SiloId::new("silo-b");
        assert!(a < b);
    }

    #[test]
    fn test_actor_key_equality() {
        let k1 = ActorKey::new("Counter", "c1");
        let k2 = ActorKey::new("Counter", "c1");
        let k3 = ActorKey::new("Counter", "c2");

        assert_eq!(k1, k2);
        assert_ne!(k1, k3);
    }

    #[test]
    fn test_actor_key_case_sensitive() {
        let lower = ActorKey::new("counter", "c1");
        let upper = ActorKey::new("Counter", "c1");
        assert_ne!(lower, upper);
    }

    #[test]
    fn test_actor_key_display() {
        let key = ActorKey::new("Counter", "c1");
        assert_eq!(format!("{key}"), "Counter/c1");
    }

    #[test]
    fn test_message_id_uniqueness() {
        let id1 = MessageId::new();
        let id2 = MessageId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_message_id_from_uuid() {
        let uuid = Uuid::new_v4();
        let id = MessageId::from_uuid(uuid);
        assert_eq!(id.as_uuid(), &uuid);
    }

    #[test]
    fn test_message_id_default() {
        let id = MessageId::default();
        assert_eq!(id.as_uuid().get_version_num(), 4);
    }
}
