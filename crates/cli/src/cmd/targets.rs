use anyhow::Result;

use super::ProjectArgs;
use crate::output::{print_info, print_target};

pub fn cmd_targets(project: &ProjectArgs) -> Result<()> {
  let targets = project.load_targets()?;
  if targets.is_empty() {
    print_info("No targets declared");
    return Ok(());
  }

  for target in targets.iter() {
    print_target(target.name(), target.dependencies());
  }
  Ok(())
}
