//! # Storage Keys
//!
//! Broadcast keys are namespaced `{prefix}:{user_scope}:{purpose}` so
//! multiple clients can share one medium without colliding.

use crate::store::MutationKind;

/// Purpose of a broadcast key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyPurpose {
    /// Leader record: who last claimed leadership, and when
    Leader,
    /// Replicated `add` mutation envelope
    Add,
    /// Replicated `clean` mutation envelope
    Clean,
}

impl KeyPurpose {
    /// Returns the key segment for this purpose
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyPurpose::Leader => "leader",
            KeyPurpose::Add => "add",
            KeyPurpose::Clean => "clean",
        }
    }

    /// The key purpose carrying a given mutation kind
    pub fn for_mutation(kind: MutationKind) -> Self {
        match kind {
            MutationKind::Add => KeyPurpose::Add,
            MutationKind::Clean => KeyPurpose::Clean,
        }
    }
}

/// The set of broadcast keys owned by one client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySet {
    prefix: String,
    user_scope: String,
}

impl KeySet {
    /// Build the key set for a prefix and optional user scope
    pub fn new(prefix: &str, user_scope: Option<&str>) -> Self {
        Self {
            prefix: prefix.to_string(),
            user_scope: user_scope.unwrap_or("").to_string(),
        }
    }

    /// Full key for a purpose
    pub fn key(&self, purpose: KeyPurpose) -> String {
        format!("{}:{}:{}", self.prefix, self.user_scope, purpose.as_str())
    }

    /// The leader record key
    pub fn leader(&self) -> String {
        self.key(KeyPurpose::Leader)
    }

    /// The envelope key for a mutation kind
    pub fn for_mutation(&self, kind: MutationKind) -> String {
        self.key(KeyPurpose::for_mutation(kind))
    }

    /// All keys owned by this client
    pub fn all(&self) -> [String; 3] {
        [
            self.key(KeyPurpose::Leader),
            self.key(KeyPurpose::Add),
            self.key(KeyPurpose::Clean),
        ]
    }

    /// Classify an incoming key, if it belongs to this key set
    pub fn purpose_of(&self, key: &str) -> Option<KeyPurpose> {
        for purpose in [KeyPurpose::Leader, KeyPurpose::Add, KeyPurpose::Clean] {
            if key == self.key(purpose) {
                return Some(purpose);
            }
        }
        None
    }
}
