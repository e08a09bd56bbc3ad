use serde::{Deserialize, Serialize};

pub type ModuleId = i64;
pub type FileId = i64;
pub type DefinitionId = i64;
pub type ContractId = i64;
pub type ParticipantId = i64;
pub type InteractionId = i64;
pub type FlowId = i64;

/// Path segments that mark a module as test-only code.
const TEST_SEGMENTS: &[&str] = &["test", "tests", "__tests__", "spec", "specs", "testing"];

/// A named, hierarchical grouping of source definitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub id: ModuleId,
    pub parent_id: Option<ModuleId>,
    /// Dot-separated hierarchical path, e.g. `project.backend.auth`
    pub full_path: String,
    pub description: Option<String>,
}

impl Module {
    pub fn new(id: ModuleId, full_path: impl Into<String>) -> Self {
        Self {
            id,
            parent_id: None,
            full_path: full_path.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_parent(mut self, parent_id: ModuleId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    /// Last segment of the hierarchical path.
    pub fn name(&self) -> &str {
        self.full_path
            .rsplit('.')
            .next()
            .unwrap_or(self.full_path.as_str())
    }

    pub fn depth(&self) -> usize {
        self.full_path.split('.').count()
    }

    pub fn is_test_module(&self) -> bool {
        self.full_path
            .split('.')
            .any(|segment| TEST_SEGMENTS.contains(&segment.to_ascii_lowercase().as_str()))
    }
}

/// One file contributing definitions to a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModuleFile {
    pub module_id: ModuleId,
    pub file_id: FileId,
}

/// A file-level import edge as extracted by the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImportEdge {
    pub from_file: FileId,
    pub to_file: FileId,
    /// `import type` and friends; never implies shared-process execution.
    pub is_type_only: bool,
}

impl ImportEdge {
    pub fn runtime(from_file: FileId, to_file: FileId) -> Self {
        Self {
            from_file,
            to_file,
            is_type_only: false,
        }
    }

    pub fn type_only(from_file: FileId, to_file: FileId) -> Self {
        Self {
            from_file,
            to_file,
            is_type_only: true,
        }
    }
}

/// Ordered module pair with symbol-level relationship evidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModulePairEvidence {
    pub from_module_id: ModuleId,
    pub to_module_id: ModuleId,
    pub relationship_count: u32,
}

/// A sampled definition-to-definition relationship backing a module pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipSample {
    pub from_symbol: String,
    pub to_symbol: String,
    /// `calls`, `uses`, `extends`, ...
    pub kind: String,
    pub description: Option<String>,
}

/// A member definition of a module with its computed one-line description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberSymbol {
    pub definition_id: DefinitionId,
    pub name: String,
    pub kind: String,
    pub description: Option<String>,
}

/// Definition-level provenance for a materialised interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InteractionDefinitionLink {
    pub interaction_id: InteractionId,
    pub from_definition_id: DefinitionId,
    pub to_definition_id: DefinitionId,
    pub contract_id: Option<ContractId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_name_is_last_path_segment() {
        let module = Module::new(1, "project.backend.auth");
        assert_eq!(module.name(), "auth");
        assert_eq!(module.depth(), 3);
    }

    #[test]
    fn test_modules_detected_by_segment() {
        assert!(Module::new(1, "project.tests.auth").is_test_module());
        assert!(Module::new(2, "project.__tests__").is_test_module());
        assert!(!Module::new(3, "project.testimonials").is_test_module());
    }
}
