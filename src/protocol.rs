//! Coherence protocols and cache line states

use std::fmt;
use std::str::FromStr;

use log::warn;

/// Cache line state, shared by MESI and MOESI
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CacheState {
    Modified,
    Owned,
    Exclusive,
    Shared,
    #[default]
    Invalid,
}

impl CacheState {
    /// The line carries data newer than memory and must be written back
    /// before it is dropped
    pub fn is_owner(self) -> bool {
        matches!(self, CacheState::Modified | CacheState::Owned)
    }

    pub fn is_valid(self) -> bool {
        self != CacheState::Invalid
    }
}

impl fmt::Display for CacheState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self {
            CacheState::Modified => "M",
            CacheState::Owned => "O",
            CacheState::Exclusive => "E",
            CacheState::Shared => "S",
            CacheState::Invalid => "I",
        };
        write!(f, "{}", letter)
    }
}

/// Protocol kind
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ProtocolKind {
    #[default]
    Mesi,
    Moesi,
}

impl ProtocolKind {
    pub const ALL: [ProtocolKind; 2] = [ProtocolKind::Mesi, ProtocolKind::Moesi];

    /// Parses a protocol name, falling back to MESI on anything unknown
    pub fn parse_or_default(s: &str) -> Self {
        s.parse().unwrap_or_else(|e| {
            warn!("{}; defaulting to MESI", e);
            ProtocolKind::Mesi
        })
    }
}

impl FromStr for ProtocolKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "MESI" => Ok(ProtocolKind::Mesi),
            "MOESI" => Ok(ProtocolKind::Moesi),
            _ => Err(format!(
                "Invalid protocol: '{}'. Expected 'MESI' or 'MOESI'.",
                s
            )),
        }
    }
}

impl fmt::Display for ProtocolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolKind::Mesi => write!(f, "MESI"),
            ProtocolKind::Moesi => write!(f, "MOESI"),
        }
    }
}

const MESI_STATES: [CacheState; 4] = [
    CacheState::Modified,
    CacheState::Exclusive,
    CacheState::Shared,
    CacheState::Invalid,
];

const MOESI_STATES: [CacheState; 5] = [
    CacheState::Modified,
    CacheState::Owned,
    CacheState::Exclusive,
    CacheState::Shared,
    CacheState::Invalid,
];

/// Static descriptor of the states a run may use
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Protocol {
    kind: ProtocolKind,
}

impl Protocol {
    pub fn new(kind: ProtocolKind) -> Self {
        Self { kind }
    }

    pub fn kind(&self) -> ProtocolKind {
        self.kind
    }

    /// Legal states, in M-O-E-S-I order
    pub fn valid_states(&self) -> &'static [CacheState] {
        match self.kind {
            ProtocolKind::Mesi => &MESI_STATES,
            ProtocolKind::Moesi => &MOESI_STATES,
        }
    }

    pub fn allows(&self, state: CacheState) -> bool {
        self.valid_states().contains(&state)
    }

    /// Whether a Modified line is demoted to Owned instead of being
    /// invalidated or shared
    pub fn has_owned_state(&self) -> bool {
        self.allows(CacheState::Owned)
    }
}
