//! Shared API type definitions
//!
//! This crate contains the types exchanged over the broker's registration
//! channel: registration requests and grants, service descriptions used by
//! the discovery table, and the version descriptor checked at admission.

use serde::Deserialize;
use serde::Serialize;

/// Strictness applied when comparing a client's build identity against the
/// broker's own at registration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompatibilityCheckLevel {
    /// No check at all.
    Off,
    /// Major versions must match.
    Major,
    /// Major and minor versions must match.
    Minor,
    /// Versions and build identifier must match exactly.
    Build,
    /// Every field must match, including commit and build date.
    Strict,
}

impl std::fmt::Display for CompatibilityCheckLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Off => "off",
            Self::Major => "major",
            Self::Minor => "minor",
            Self::Build => "build",
            Self::Strict => "strict",
        };
        write!(f, "{name}")
    }
}

/// Build identity of a middleware participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    pub major: u16,
    pub minor: u16,
    pub patch: u16,
    /// Build identifier, e.g. a CI build tag
    pub build: String,
    /// Commit the participant was built from
    pub commit: String,
    /// Build date
    pub build_date: String,
}

impl VersionInfo {
    /// Compares two build identities under the given check level.
    pub fn is_compatible_with(&self, other: &VersionInfo, level: CompatibilityCheckLevel) -> bool {
        match level {
            CompatibilityCheckLevel::Off => true,
            CompatibilityCheckLevel::Major => self.major == other.major,
            CompatibilityCheckLevel::Minor => {
                self.major == other.major && self.minor == other.minor
            }
            CompatibilityCheckLevel::Build => {
                self.major == other.major
                    && self.minor == other.minor
                    && self.patch == other.patch
                    && self.build == other.build
            }
            CompatibilityCheckLevel::Strict => self == other,
        }
    }
}

impl std::fmt::Display for VersionInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}-{}", self.major, self.minor, self.patch, self.build)
    }
}

/// A service offering key in the discovery table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServiceDescription {
    pub service: String,
    pub instance: String,
    pub event: String,
}

impl std::fmt::Display for ServiceDescription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.service, self.instance, self.event)
    }
}

/// Fields a client sends to register with the broker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationRequest {
    /// Process name, unique per broker instance; doubles as the
    /// registration channel endpoint name
    pub name: String,
    /// Host process id of the registering process
    pub pid: u32,
    /// OS user the process runs as; selects the shared memory segment
    pub user: String,
    /// Whether the broker should watch this process for liveliness
    pub is_monitored: bool,
    /// Client supplied send timestamp, echoed for response matching
    pub transmission_timestamp: i64,
    /// Session id used to reject stale channel transmissions
    pub session_id: u64,
    /// Build identity of the client
    pub version: VersionInfo,
}

/// Identifiers handed back on successful registration; everything a client
/// needs to map its shared memory segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationGrant {
    /// Shared memory segment granted to the process's user
    pub segment_id: u64,
    /// Chunk pool leased to this process within the segment
    pub chunk_pool_id: u64,
    /// Echo of the accepted session id
    pub session_id: u64,
}

/// Response envelope for the registration channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationResponse {
    /// Whether the request was successful
    pub success: bool,
    /// Grant data (present when successful)
    pub data: Option<RegistrationGrant>,
    /// Response message
    pub message: String,
}

impl RegistrationResponse {
    pub fn ok(grant: RegistrationGrant) -> Self {
        Self {
            success: true,
            data: Some(grant),
            message: String::new(),
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: message.into(),
        }
    }
}
