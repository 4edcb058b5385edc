//! Phase 3: Determining Build Order
//!
//! This phase turns the module dependency graph into the sequence the build
//! orchestrator walks. Every module comes after all of its dependencies.
//!
//! ## Process
//!
//! 1.  **Indegree Count**: Each module's indegree is the number of
//!     dependencies it declares inside the module set.
//!
//! 2.  **Kahn's Algorithm**: Modules with no outstanding dependencies are kept
//!     in a min-heap keyed by path. The module with the smallest path is
//!     emitted next, and its dependents have their indegree reduced. Using the
//!     path as the heap key makes the order reproducible across runs even
//!     though the graph itself is unordered.
//!
//! 3.  **Cycle Reporting**: If the heap empties before every module has been
//!     emitted, the remaining modules contain a cycle. A depth-first search
//!     over them recovers one concrete cycle for the error message.
//!
//! Dependencies naming modules outside the slice are ignored here; the
//! manifest rejects them before ordering runs.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use crate::error::{Error, Result};
use crate::manifest::Module;

/// Compute the build order of `modules` as indices into the slice.
///
/// Fails with `CyclicDependency` if the dependency graph is not acyclic.
pub fn build_order(modules: &[Module]) -> Result<Vec<usize>> {
    let index = name_index(modules);

    let mut indegree = vec![0usize; modules.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); modules.len()];
    for (i, module) in modules.iter().enumerate() {
        for dep in module.dependencies() {
            if let Some(&d) = index.get(dep.as_str()) {
                indegree[i] += 1;
                dependents[d].push(i);
            }
        }
    }

    let mut ready: BinaryHeap<Reverse<(&str, usize)>> = modules
        .iter()
        .enumerate()
        .filter(|(i, _)| indegree[*i] == 0)
        .map(|(i, module)| Reverse((module.path(), i)))
        .collect();

    let mut order = Vec::with_capacity(modules.len());
    while let Some(Reverse((_, i))) = ready.pop() {
        order.push(i);
        for &dependent in &dependents[i] {
            indegree[dependent] -= 1;
            if indegree[dependent] == 0 {
                ready.push(Reverse((modules[dependent].path(), dependent)));
            }
        }
    }

    if order.len() < modules.len() {
        let cycle = find_cycle(modules, &index).unwrap_or_default();
        return Err(Error::CyclicDependency {
            cycle: cycle.join(" -> "),
        });
    }

    Ok(order)
}

fn name_index(modules: &[Module]) -> HashMap<&str, usize> {
    modules
        .iter()
        .enumerate()
        .map(|(i, module)| (module.name(), i))
        .collect()
}

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Unvisited,
    OnStack,
    Done,
}

/// Find one dependency cycle, returned as module names with the first name
/// repeated at the end.
fn find_cycle(modules: &[Module], index: &HashMap<&str, usize>) -> Option<Vec<String>> {
    let mut starts: Vec<usize> = (0..modules.len()).collect();
    starts.sort_by_key(|&i| modules[i].path());

    let mut marks = vec![Mark::Unvisited; modules.len()];
    let mut stack = Vec::new();
    for start in starts {
        if marks[start] == Mark::Unvisited {
            if let Some(cycle) = visit(start, modules, index, &mut marks, &mut stack) {
                return Some(cycle);
            }
        }
    }
    None
}

fn visit(
    node: usize,
    modules: &[Module],
    index: &HashMap<&str, usize>,
    marks: &mut [Mark],
    stack: &mut Vec<usize>,
) -> Option<Vec<String>> {
    marks[node] = Mark::OnStack;
    stack.push(node);

    for dep in modules[node].dependencies() {
        let Some(&next) = index.get(dep.as_str()) else {
            continue;
        };
        match marks[next] {
            Mark::OnStack => {
                let from = stack.iter().position(|&n| n == next).unwrap_or(0);
                let mut cycle: Vec<String> = stack[from..]
                    .iter()
                    .map(|&n| modules[n].name().to_string())
                    .collect();
                cycle.push(modules[next].name().to_string());
                return Some(cycle);
            }
            Mark::Unvisited => {
                if let Some(cycle) = visit(next, modules, index, marks, stack) {
                    return Some(cycle);
                }
            }
            Mark::Done => {}
        }
    }

    stack.pop();
    marks[node] = Mark::Done;
    None
}
