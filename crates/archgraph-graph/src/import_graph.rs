use archgraph_core::{FileId, ImportEdge, ModuleFile, ModuleId};
use std::collections::{HashMap, HashSet, VecDeque};

/// File-level import adjacency with module lookups, used to answer
/// "does module A (transitively) import module B?".
///
/// Type-only imports count here: they still reveal which side depends on which.
#[derive(Debug, Clone, Default)]
pub struct ImportGraph {
    adjacency: HashMap<FileId, Vec<FileId>>,
    files_by_module: HashMap<ModuleId, Vec<FileId>>,
}

impl ImportGraph {
    pub fn new(module_files: &[ModuleFile], imports: &[ImportEdge]) -> Self {
        let mut adjacency: HashMap<FileId, Vec<FileId>> = HashMap::new();
        for edge in imports {
            if edge.from_file == edge.to_file {
                continue;
            }
            let targets = adjacency.entry(edge.from_file).or_default();
            if !targets.contains(&edge.to_file) {
                targets.push(edge.to_file);
            }
        }

        let mut files_by_module: HashMap<ModuleId, Vec<FileId>> = HashMap::new();
        for mf in module_files {
            files_by_module
                .entry(mf.module_id)
                .or_default()
                .push(mf.file_id);
        }

        Self {
            adjacency,
            files_by_module,
        }
    }

    pub fn files_of(&self, module_id: ModuleId) -> &[FileId] {
        self.files_by_module
            .get(&module_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// BFS from every file of `from_module` until any file of `to_module` is reached.
    pub fn has_import_path(&self, from_module: ModuleId, to_module: ModuleId) -> bool {
        let sources = self.files_of(from_module);
        let targets: HashSet<FileId> = self.files_of(to_module).iter().copied().collect();
        if sources.is_empty() || targets.is_empty() || from_module == to_module {
            return false;
        }

        let mut queue: VecDeque<FileId> = sources.iter().copied().collect();
        let mut visited: HashSet<FileId> = sources.iter().copied().collect();

        while let Some(current) = queue.pop_front() {
            let Some(neighbors) = self.adjacency.get(&current) else {
                continue;
            };
            for &next in neighbors {
                if targets.contains(&next) {
                    return true;
                }
                if visited.insert(next) {
                    queue.push_back(next);
                }
            }
        }

        false
    }
}
