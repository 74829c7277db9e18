use std::collections::HashMap;
use std::sync::Arc;

use crate::scheduler::BuildError;

use super::Target;

/// Registry of declared targets, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct TargetSet {
  targets: Vec<Arc<Target>>,
  index: HashMap<String, usize>,
}

impl TargetSet {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register a target. Names must be unique.
  pub fn insert(&mut self, target: Target) -> Result<(), BuildError> {
    if self.index.contains_key(target.name()) {
      return Err(BuildError::DuplicateTarget(target.name().to_string()));
    }
    self.index.insert(target.name().to_string(), self.targets.len());
    self.targets.push(Arc::new(target));
    Ok(())
  }

  pub fn from_targets(targets: impl IntoIterator<Item = Target>) -> Result<Self, BuildError> {
    let mut set = Self::new();
    for target in targets {
      set.insert(target)?;
    }
    Ok(set)
  }

  pub fn get(&self, name: &str) -> Option<&Arc<Target>> {
    self.index.get(name).map(|&idx| &self.targets[idx])
  }

  pub fn iter(&self) -> impl Iterator<Item = &Arc<Target>> {
    self.targets.iter()
  }

  pub fn len(&self) -> usize {
    self.targets.len()
  }

  pub fn is_empty(&self) -> bool {
    self.targets.is_empty()
  }
}
