use std::collections::{HashMap, HashSet, VecDeque};

use tagstep_step::{Step, StepLink};

use crate::error::GraphError;

/// Graph structure for ordering steps.
///
/// Nodes are identified by step name and keep the position the step had in
/// the input slice.
#[derive(Debug, Clone)]
pub struct StepGraph {
  /// Step names in input order.
  names: Vec<String>,
  /// Adjacency list: step -> steps that depend on it.
  adjacency: HashMap<String, Vec<String>>,
  /// Reverse adjacency: step -> steps it depends on.
  reverse_adjacency: HashMap<String, Vec<String>>,
  /// Steps with no dependencies.
  entry_points: Vec<String>,
  /// Topological order, ties broken by input order.
  order: Vec<usize>,
}

impl StepGraph {
  /// Build a graph from steps and the links that are satisfied without any step.
  pub fn new<S: AsRef<dyn Step>>(steps: &[S], satisfied: &[StepLink]) -> Result<Self, GraphError> {
    let mut names = Vec::with_capacity(steps.len());
    let mut index: HashMap<String, usize> = HashMap::new();
    for (i, step) in steps.iter().enumerate() {
      let name = step.as_ref().name();
      if index.insert(name.clone(), i).is_some() {
        return Err(GraphError::DuplicateStep(name));
      }
      names.push(name);
    }

    // Which steps create each link
    let mut creators: HashMap<StepLink, Vec<usize>> = HashMap::new();
    for (i, step) in steps.iter().enumerate() {
      for link in step.as_ref().creates() {
        creators.entry(link).or_default().push(i);
      }
    }

    let satisfied: HashSet<&StepLink> = satisfied.iter().collect();
    let mut edges: Vec<HashSet<usize>> = vec![HashSet::new(); steps.len()];
    for (i, step) in steps.iter().enumerate() {
      for link in step.as_ref().requires() {
        if satisfied.contains(&link) {
          continue;
        }
        // A step cannot satisfy its own requirement
        let from: Vec<usize> = creators
          .get(&link)
          .map(|c| c.iter().copied().filter(|&from| from != i).collect())
          .unwrap_or_default();
        if from.is_empty() {
          return Err(GraphError::UnsatisfiedRequirement {
            step: names[i].clone(),
            link,
          });
        }
        for from in from {
          edges[from].insert(i);
        }
      }
    }

    let order = topological_order(&edges)?;

    let mut adjacency: HashMap<String, Vec<String>> = HashMap::new();
    let mut reverse_adjacency: HashMap<String, Vec<String>> = HashMap::new();
    for name in &names {
      adjacency.entry(name.clone()).or_default();
      reverse_adjacency.entry(name.clone()).or_default();
    }
    for (from, targets) in edges.iter().enumerate() {
      let mut targets: Vec<usize> = targets.iter().copied().collect();
      targets.sort_unstable();
      for to in targets {
        adjacency
          .entry(names[from].clone())
          .or_default()
          .push(names[to].clone());
        reverse_adjacency
          .entry(names[to].clone())
          .or_default()
          .push(names[from].clone());
      }
    }

    let entry_points: Vec<String> = names
      .iter()
      .filter(|name| reverse_adjacency.get(*name).is_none_or(|v| v.is_empty()))
      .cloned()
      .collect();

    Ok(Self {
      names,
      adjacency,
      reverse_adjacency,
      entry_points,
      order,
    })
  }

  /// Indices into the input slice, in an order that runs every step after
  /// the steps it depends on.
  pub fn order(&self) -> &[usize] {
    &self.order
  }

  /// Step names in execution order.
  pub fn ordered_names(&self) -> Vec<&str> {
    self.order.iter().map(|&i| self.names[i].as_str()).collect()
  }

  /// Get entry points (steps with no dependencies).
  pub fn entry_points(&self) -> &[String] {
    &self.entry_points
  }

  /// Get the steps that depend on a given step.
  pub fn downstream(&self, name: &str) -> &[String] {
    self
      .adjacency
      .get(name)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  /// Get the steps a given step depends on.
  pub fn upstream(&self, name: &str) -> &[String] {
    self
      .reverse_adjacency
      .get(name)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }
}

/// Kahn's algorithm, always taking the lowest ready index first.
fn topological_order(edges: &[HashSet<usize>]) -> Result<Vec<usize>, GraphError> {
  let mut in_degree = vec![0usize; edges.len()];
  for targets in edges {
    for &to in targets {
      in_degree[to] += 1;
    }
  }

  let mut ready: VecDeque<usize> = (0..edges.len()).filter(|&i| in_degree[i] == 0).collect();
  let mut order = Vec::with_capacity(edges.len());

  while let Some(i) = ready.pop_front() {
    order.push(i);
    let mut targets: Vec<usize> = edges[i].iter().copied().collect();
    targets.sort_unstable();
    for to in targets {
      in_degree[to] -= 1;
      if in_degree[to] == 0 {
        // Keep the queue sorted so ties resolve by input order
        let pos = ready.partition_point(|&r| r < to);
        ready.insert(pos, to);
      }
    }
  }

  if order.len() != edges.len() {
    return Err(GraphError::CycleDetected);
  }
  Ok(order)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn edges(list: &[&[usize]]) -> Vec<HashSet<usize>> {
    list
      .iter()
      .map(|targets| targets.iter().copied().collect())
      .collect()
  }

  #[test]
  fn test_topological_order_keeps_input_order_for_ties() {
    let order = topological_order(&edges(&[&[], &[], &[]])).unwrap();
    assert_eq!(order, vec![0, 1, 2]);
  }

  #[test]
  fn test_topological_order_follows_edges() {
    // 2 -> 0 -> 1
    let order = topological_order(&edges(&[&[1], &[], &[0]])).unwrap();
    assert_eq!(order, vec![2, 0, 1]);
  }

  #[test]
  fn test_topological_order_detects_cycle() {
    let result = topological_order(&edges(&[&[1], &[0]]));
    assert!(matches!(result, Err(GraphError::CycleDetected)));
  }
}
