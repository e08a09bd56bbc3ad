use crate::union_find::UnionFind;
use archgraph_core::{FileId, ImportEdge, Module, ModuleFile, ModuleId};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

pub type GroupId = i64;

/// Module-to-process assignment for one run.
///
/// File-backed groups are identified by the smallest file id in their import
/// component; modules without files get `-module_id`, which never collides
/// with a (positive) file id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProcessGroups {
    module_to_group: HashMap<ModuleId, GroupId>,
    group_to_modules: BTreeMap<GroupId, Vec<ModuleId>>,
}

impl ProcessGroups {
    pub fn group_of(&self, module_id: ModuleId) -> Option<GroupId> {
        self.module_to_group.get(&module_id).copied()
    }

    /// Fails open: unknown modules are treated as sharing a process.
    pub fn are_same_process(&self, a: ModuleId, b: ModuleId) -> bool {
        match (self.group_of(a), self.group_of(b)) {
            (Some(ga), Some(gb)) => ga == gb,
            _ => true,
        }
    }

    pub fn modules_in(&self, group_id: GroupId) -> &[ModuleId] {
        self.group_to_modules
            .get(&group_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn groups(&self) -> impl Iterator<Item = (GroupId, &[ModuleId])> {
        self.group_to_modules
            .iter()
            .map(|(group, modules)| (*group, modules.as_slice()))
    }

    pub fn group_count(&self) -> usize {
        self.group_to_modules.len()
    }

    pub fn module_count(&self) -> usize {
        self.module_to_group.len()
    }

    fn assign(&mut self, module_id: ModuleId, group_id: GroupId) {
        self.module_to_group.insert(module_id, group_id);
        self.group_to_modules
            .entry(group_id)
            .or_default()
            .push(module_id);
    }
}

/// Partition modules into process groups by runtime import connectivity.
///
/// Type-only imports are never unioned. A module whose files span several
/// components joins the component holding most of its files; ties go to the
/// lowest group id.
pub fn compute_process_groups(
    modules: &[Module],
    module_files: &[ModuleFile],
    imports: &[ImportEdge],
) -> ProcessGroups {
    let mut slots: HashMap<FileId, usize> = HashMap::new();
    let mut files: Vec<FileId> = Vec::new();
    let mut slot_of = |file: FileId, files: &mut Vec<FileId>| -> usize {
        *slots.entry(file).or_insert_with(|| {
            files.push(file);
            files.len() - 1
        })
    };

    for mf in module_files {
        slot_of(mf.file_id, &mut files);
    }
    let runtime_edges: Vec<(usize, usize)> = imports
        .iter()
        .filter(|edge| !edge.is_type_only)
        .map(|edge| {
            (
                slot_of(edge.from_file, &mut files),
                slot_of(edge.to_file, &mut files),
            )
        })
        .collect();

    let mut uf = UnionFind::new(files.len());
    for (a, b) in runtime_edges {
        uf.union(a, b);
    }

    let mut component_min: HashMap<usize, FileId> = HashMap::new();
    for (slot, file) in files.iter().enumerate() {
        let root = uf.find(slot);
        component_min
            .entry(root)
            .and_modify(|min| *min = (*min).min(*file))
            .or_insert(*file);
    }

    let mut files_by_module: HashMap<ModuleId, Vec<FileId>> = HashMap::new();
    for mf in module_files {
        let entry = files_by_module.entry(mf.module_id).or_default();
        if !entry.contains(&mf.file_id) {
            entry.push(mf.file_id);
        }
    }

    let mut groups = ProcessGroups::default();
    for module in modules {
        let group = match files_by_module.get(&module.id) {
            Some(module_files) if !module_files.is_empty() => {
                let mut votes: BTreeMap<GroupId, usize> = BTreeMap::new();
                for file in module_files {
                    let root = uf.find(slots[file]);
                    *votes.entry(component_min[&root]).or_default() += 1;
                }
                majority(&votes)
            }
            _ => -module.id,
        };
        groups.assign(module.id, group);
    }

    debug!(
        modules = groups.module_count(),
        groups = groups.group_count(),
        files = files.len(),
        "Computed process groups"
    );
    groups
}

fn majority(votes: &BTreeMap<GroupId, usize>) -> GroupId {
    let mut best: Option<(GroupId, usize)> = None;
    // BTreeMap iterates in ascending group order, so strict `>` keeps the lowest id on ties.
    for (group, count) in votes {
        if best.map_or(true, |(_, best_count)| *count > best_count) {
            best = Some((*group, *count));
        }
    }
    best.map(|(group, _)| group).unwrap_or_default()
}
