//! Stack dependency resolver
//!
//! Computes the full set of stacks required by a project (explicit requests
//! plus transitive dependencies), a deterministic install order, and the
//! orphan set when explicit requests are reduced.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};

/// Dependency catalog: stack id to declared dependencies, in declaration order.
///
/// Built fresh from the registry index (or the lockfile, when offline) before
/// every resolve call; the resolver holds no state between calls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    entries: BTreeMap<String, Vec<String>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<String>, depends: Vec<String>) {
        self.entries.insert(id.into(), depends);
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn depends(&self, id: &str) -> Option<&[String]> {
        self.entries.get(id).map(|d| d.as_slice())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<I: Into<String>> FromIterator<(I, Vec<String>)> for Catalog {
    fn from_iter<T: IntoIterator<Item = (I, Vec<String>)>>(iter: T) -> Self {
        let mut catalog = Catalog::new();
        for (id, depends) in iter {
            catalog.insert(id, depends);
        }
        catalog
    }
}

/// Result of dependency resolution.
///
/// `order` is a topological order over the needed set: every dependency
/// precedes its dependents. `dependency_of` is defined only for stacks that
/// are not explicit and maps each to the stack that first requested it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub order: Vec<String>,
    pub explicit: BTreeSet<String>,
    pub dependency_of: BTreeMap<String, String>,
}

impl Resolution {
    pub fn is_explicit(&self, id: &str) -> bool {
        self.explicit.contains(id)
    }

    pub fn needed(&self) -> BTreeSet<String> {
        self.order.iter().cloned().collect()
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("stack not found: {stack}")]
    NotFound { stack: String },

    #[error("stack '{stack}' depends on '{dependency}', which does not exist")]
    MissingDependency { stack: String, dependency: String },

    #[error("circular dependency: {}", cycle.join(" -> "))]
    CircularDependency { cycle: Vec<String> },
}

/// Resolve the needed set and install order for the given explicit stacks.
///
/// Deterministic for a fixed catalog and explicit list: ties in the
/// topological order are broken by picking the lexicographically smallest
/// ready stack. Dependency attribution is first-discovery-wins over a
/// breadth-first traversal, so a transitive stack is attributed to whichever
/// requester reaches it first in explicit-list order.
pub fn resolve(catalog: &Catalog, explicit: &[String]) -> Result<Resolution, ResolveError> {
    for id in explicit {
        if !catalog.contains(id) {
            return Err(ResolveError::NotFound { stack: id.clone() });
        }
    }

    let explicit_set: BTreeSet<String> = explicit.iter().cloned().collect();
    let mut dependency_of: BTreeMap<String, String> = BTreeMap::new();
    let mut needed: HashSet<String> = HashSet::new();

    let mut queue: VecDeque<String> = explicit.iter().cloned().collect();
    while let Some(current) = queue.pop_front() {
        if !needed.insert(current.clone()) {
            continue;
        }

        let depends = catalog
            .depends(&current)
            .ok_or_else(|| ResolveError::NotFound {
                stack: current.clone(),
            })?;

        for dep in depends {
            if !catalog.contains(dep) {
                return Err(ResolveError::MissingDependency {
                    stack: current.clone(),
                    dependency: dep.clone(),
                });
            }
            if !explicit_set.contains(dep) && !dependency_of.contains_key(dep) {
                dependency_of.insert(dep.clone(), current.clone());
            }
            queue.push_back(dep.clone());
        }
    }

    // Kahn's algorithm over the needed subgraph; the ready set is a BTreeSet
    // so the smallest id always comes out first.
    let mut in_degree: HashMap<&str, usize> = needed.iter().map(|id| (id.as_str(), 0)).collect();
    let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();
    for id in &needed {
        for dep in catalog.depends(id).unwrap_or(&[]) {
            if needed.contains(dep.as_str()) {
                dependents.entry(dep.as_str()).or_default().push(id.as_str());
                if let Some(deg) = in_degree.get_mut(id.as_str()) {
                    *deg += 1;
                }
            }
        }
    }

    let mut ready: BTreeSet<&str> = in_degree
        .iter()
        .filter(|(_, deg)| **deg == 0)
        .map(|(id, _)| *id)
        .collect();

    let mut order: Vec<String> = Vec::with_capacity(needed.len());
    while let Some(&next) = ready.iter().next() {
        ready.remove(next);
        order.push(next.to_string());

        for dependent in dependents.get(next).map(|d| d.as_slice()).unwrap_or(&[]) {
            if let Some(deg) = in_degree.get_mut(dependent) {
                *deg -= 1;
                if *deg == 0 {
                    ready.insert(dependent);
                }
            }
        }
    }

    if order.len() != needed.len() {
        let cycle = find_cycle(catalog, &needed);
        return Err(ResolveError::CircularDependency { cycle });
    }

    Ok(Resolution {
        order,
        explicit: explicit_set,
        dependency_of,
    })
}

/// Compute the stacks orphaned by removing `removing` from `current_explicit`.
///
/// Resolves both the current and the remaining explicit sets and returns,
/// sorted, everything needed before but not after, excluding the removed
/// stacks themselves. Fail-open: any resolution error (e.g. a stack deleted
/// upstream from the catalog) yields an empty orphan set so removal can
/// proceed against a stale catalog view.
pub fn resolve_removal(
    catalog: &Catalog,
    current_explicit: &[String],
    removing: &[String],
) -> Vec<String> {
    let removing_set: BTreeSet<&str> = removing.iter().map(String::as_str).collect();
    let remaining: Vec<String> = current_explicit
        .iter()
        .filter(|id| !removing_set.contains(id.as_str()))
        .cloned()
        .collect();

    let Ok(current) = resolve(catalog, current_explicit) else {
        return Vec::new();
    };
    let still_needed: BTreeSet<String> = if remaining.is_empty() {
        BTreeSet::new()
    } else {
        match resolve(catalog, &remaining) {
            Ok(res) => res.needed(),
            Err(_) => return Vec::new(),
        }
    };

    let mut orphans: Vec<String> = current
        .order
        .into_iter()
        .filter(|id| !still_needed.contains(id) && !removing_set.contains(id.as_str()))
        .collect();
    orphans.sort();
    orphans
}

/// Reconstruct one cycle in the needed subgraph for diagnostics.
///
/// Depth-first search with an explicit frame stack (no recursion, so
/// pathological catalogs cannot blow the call stack). Start nodes are taken
/// in lexicographic order and dependency edges in declaration order, so the
/// reported cycle is deterministic. The repeated node appears as both the
/// first and last element.
fn find_cycle(catalog: &Catalog, needed: &HashSet<String>) -> Vec<String> {
    const UNVISITED: u8 = 0;
    const IN_PROGRESS: u8 = 1;
    const DONE: u8 = 2;

    let mut state: HashMap<&str, u8> = needed.iter().map(|id| (id.as_str(), UNVISITED)).collect();

    let mut starts: Vec<&str> = needed.iter().map(String::as_str).collect();
    starts.sort_unstable();

    for start in starts {
        if state[start] != UNVISITED {
            continue;
        }

        // Each frame is a node plus the index of the next dependency edge to
        // follow; `path` mirrors the frame stack for cycle extraction.
        let mut frames: Vec<(&str, usize)> = vec![(start, 0)];
        let mut path: Vec<&str> = vec![start];
        state.insert(start, IN_PROGRESS);

        while let Some(&(node, edge)) = frames.last() {
            let depends = catalog.depends(node).unwrap_or(&[]);

            let mut next_edge = edge;
            let mut dep: Option<&str> = None;
            while next_edge < depends.len() {
                let candidate = depends[next_edge].as_str();
                next_edge += 1;
                if needed.contains(candidate) {
                    dep = Some(candidate);
                    break;
                }
            }
            if let Some(top) = frames.last_mut() {
                top.1 = next_edge;
            }

            match dep {
                Some(dep) => match state.get(dep).copied().unwrap_or(UNVISITED) {
                    IN_PROGRESS => {
                        let pos = path.iter().position(|n| *n == dep).unwrap_or(0);
                        let mut cycle: Vec<String> =
                            path[pos..].iter().map(|s| s.to_string()).collect();
                        cycle.push(dep.to_string());
                        return cycle;
                    }
                    UNVISITED => {
                        state.insert(dep, IN_PROGRESS);
                        path.push(dep);
                        frames.push((dep, 0));
                    }
                    _ => {}
                },
                None => {
                    state.insert(node, DONE);
                    path.pop();
                    frames.pop();
                }
            }
        }
    }

    Vec::new()
}
