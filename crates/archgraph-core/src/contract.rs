use crate::{ContractId, DefinitionId, ModuleId, ParticipantId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Communication role a definition plays on a contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantRole {
    Server,
    Client,
    Producer,
    Consumer,
    Emitter,
    Listener,
    Publisher,
    Subscriber,
    Sender,
    Receiver,
    Writer,
    Reader,
}

impl ParticipantRole {
    pub const ALL: [ParticipantRole; 12] = [
        ParticipantRole::Server,
        ParticipantRole::Client,
        ParticipantRole::Producer,
        ParticipantRole::Consumer,
        ParticipantRole::Emitter,
        ParticipantRole::Listener,
        ParticipantRole::Publisher,
        ParticipantRole::Subscriber,
        ParticipantRole::Sender,
        ParticipantRole::Receiver,
        ParticipantRole::Writer,
        ParticipantRole::Reader,
    ];

    /// Initiator roles drive matching; each has exactly one complement.
    pub fn complement(self) -> Option<ParticipantRole> {
        match self {
            ParticipantRole::Client => Some(ParticipantRole::Server),
            ParticipantRole::Consumer => Some(ParticipantRole::Producer),
            ParticipantRole::Listener => Some(ParticipantRole::Emitter),
            ParticipantRole::Subscriber => Some(ParticipantRole::Publisher),
            ParticipantRole::Receiver => Some(ParticipantRole::Sender),
            ParticipantRole::Reader => Some(ParticipantRole::Writer),
            _ => None,
        }
    }

    pub fn is_initiator(self) -> bool {
        self.complement().is_some()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ParticipantRole::Server => "server",
            ParticipantRole::Client => "client",
            ParticipantRole::Producer => "producer",
            ParticipantRole::Consumer => "consumer",
            ParticipantRole::Emitter => "emitter",
            ParticipantRole::Listener => "listener",
            ParticipantRole::Publisher => "publisher",
            ParticipantRole::Subscriber => "subscriber",
            ParticipantRole::Sender => "sender",
            ParticipantRole::Receiver => "receiver",
            ParticipantRole::Writer => "writer",
            ParticipantRole::Reader => "reader",
        }
    }
}

impl fmt::Display for ParticipantRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParticipantRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        ParticipantRole::ALL
            .into_iter()
            .find(|role| role.as_str() == lowered)
            .ok_or_else(|| format!("unknown participant role: {}", s))
    }
}

/// One definition bound to a contract under a role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractParticipant {
    pub id: ParticipantId,
    pub contract_id: ContractId,
    pub definition_id: DefinitionId,
    /// Resolved lazily; `None` until backfilled from the definition's module.
    pub module_id: Option<ModuleId>,
    pub role: ParticipantRole,
}

/// A cross-process channel keyed by `(protocol, normalized_key)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contract {
    pub id: ContractId,
    pub protocol: String,
    /// e.g. `GET /vehicles/{param}`
    pub normalized_key: String,
    pub participants: Vec<ContractParticipant>,
}

impl Contract {
    pub fn new(id: ContractId, protocol: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            id,
            protocol: protocol.into(),
            normalized_key: key.into(),
            participants: Vec::new(),
        }
    }

    pub fn with_participant(
        mut self,
        id: ParticipantId,
        definition_id: DefinitionId,
        module_id: Option<ModuleId>,
        role: ParticipantRole,
    ) -> Self {
        self.participants.push(ContractParticipant {
            id,
            contract_id: self.id,
            definition_id,
            module_id,
            role,
        });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complements_are_fixed_and_one_directional() {
        assert_eq!(
            ParticipantRole::Client.complement(),
            Some(ParticipantRole::Server)
        );
        assert_eq!(
            ParticipantRole::Reader.complement(),
            Some(ParticipantRole::Writer)
        );
        assert_eq!(ParticipantRole::Server.complement(), None);
        let initiators = ParticipantRole::ALL
            .iter()
            .filter(|r| r.is_initiator())
            .count();
        assert_eq!(initiators, 6);
    }

    #[test]
    fn roles_parse_case_insensitively() {
        assert_eq!(
            "Subscriber".parse::<ParticipantRole>(),
            Ok(ParticipantRole::Subscriber)
        );
        assert!("router".parse::<ParticipantRole>().is_err());
    }
}
