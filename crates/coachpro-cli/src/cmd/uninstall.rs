use anyhow::bail;
use coachpro_core::project;
use std::path::Path;

pub fn run(root: &Path, yes: bool) -> anyhow::Result<()> {
    if !yes {
        bail!("uninstall drops every table and option; re-run with --yes to confirm");
    }
    project::uninstall(root)?;
    println!("Removed CoachPro data from {}", root.display());
    Ok(())
}
