use crate::{DefinitionId, FlowId, InteractionId, ModuleId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Composition level of a flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum FlowTier {
    Atomic = 0,
    Composite = 1,
    Journey = 2,
}

impl From<FlowTier> for u8 {
    fn from(tier: FlowTier) -> Self {
        tier as u8
    }
}

impl TryFrom<u8> for FlowTier {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(FlowTier::Atomic),
            1 => Ok(FlowTier::Composite),
            2 => Ok(FlowTier::Journey),
            other => Err(format!("unknown flow tier: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    View,
    Create,
    Update,
    Delete,
    Process,
    Authenticate,
    Notify,
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ActionType::View => "view",
            ActionType::Create => "create",
            ActionType::Update => "update",
            ActionType::Delete => "delete",
            ActionType::Process => "process",
            ActionType::Authenticate => "authenticate",
            ActionType::Notify => "notify",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for ActionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "view" => Ok(ActionType::View),
            "create" => Ok(ActionType::Create),
            "update" => Ok(ActionType::Update),
            "delete" => Ok(ActionType::Delete),
            "process" => Ok(ActionType::Process),
            "authenticate" => Ok(ActionType::Authenticate),
            "notify" => Ok(ActionType::Notify),
            other => Err(format!("unknown action type: {}", other)),
        }
    }
}

/// One hop of a flow between two modules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowStep {
    pub from_module_id: ModuleId,
    pub to_module_id: ModuleId,
    pub interaction_id: Option<InteractionId>,
    pub from_definition_id: Option<DefinitionId>,
    pub to_definition_id: Option<DefinitionId>,
}

impl FlowStep {
    pub fn for_interaction(
        interaction_id: InteractionId,
        from_module_id: ModuleId,
        to_module_id: ModuleId,
    ) -> Self {
        Self {
            from_module_id,
            to_module_id,
            interaction_id: Some(interaction_id),
            from_definition_id: None,
            to_definition_id: None,
        }
    }
}

/// A named, ordered path through the interaction graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flow {
    pub id: Option<FlowId>,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub tier: FlowTier,
    pub stakeholder: Option<String>,
    pub action_type: Option<ActionType>,
    pub target_entity: Option<String>,
    pub entry_point_module_id: Option<ModuleId>,
    pub interaction_ids: Vec<InteractionId>,
    pub steps: Vec<FlowStep>,
    /// Constituent flow slugs; populated for journeys only.
    pub subflow_slugs: Vec<String>,
}

impl Flow {
    pub fn new(name: impl Into<String>, slug: impl Into<String>, tier: FlowTier) -> Self {
        Self {
            id: None,
            name: name.into(),
            slug: slug.into(),
            description: None,
            tier,
            stakeholder: None,
            action_type: None,
            target_entity: None,
            entry_point_module_id: None,
            interaction_ids: Vec::new(),
            steps: Vec::new(),
            subflow_slugs: Vec::new(),
        }
    }

    pub fn with_target_entity(mut self, entity: impl Into<String>) -> Self {
        self.target_entity = Some(entity.into());
        self
    }

    pub fn with_stakeholder(mut self, stakeholder: impl Into<String>) -> Self {
        self.stakeholder = Some(stakeholder.into());
        self
    }

    pub fn with_action(mut self, action: ActionType) -> Self {
        self.action_type = Some(action);
        self
    }

    pub fn with_entry_point(mut self, module_id: ModuleId) -> Self {
        self.entry_point_module_id = Some(module_id);
        self
    }

    pub fn with_interactions(mut self, ids: Vec<InteractionId>) -> Self {
        self.interaction_ids = ids;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_serializes_as_integer() {
        let flow = Flow::new("Checkout", "checkout", FlowTier::Journey);
        let json = serde_json::to_value(&flow).unwrap();
        assert_eq!(json["tier"], 2);
    }
}
