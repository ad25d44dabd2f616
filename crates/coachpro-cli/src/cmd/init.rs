use anyhow::Context;
use coachpro_core::{paths, project};
use std::path::Path;

use crate::output::print_json;

pub fn run(root: &Path, site_name: Option<&str>, force: bool, json: bool) -> anyhow::Result<()> {
    let site_name = site_name
        .map(str::to_string)
        .or_else(|| root.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "CoachPro".to_string());

    let existed = paths::config_path(root).exists();
    let config = project::init(root, &site_name, force)
        .with_context(|| format!("failed to initialize {}", root.display()))?;
    let db_path = config.database_path(root);

    if json {
        return print_json(&serde_json::json!({
            "root": root,
            "site_name": config.site.name,
            "database": db_path,
            "config_created": !existed || force,
        }));
    }

    println!("Initializing CoachPro in: {}", root.display());
    match (existed, force) {
        (false, _) => println!("  created: {}", paths::CONFIG_FILE),
        (true, true) => println!("  reset:   {}", paths::CONFIG_FILE),
        (true, false) => println!("  exists:  {}", paths::CONFIG_FILE),
    }
    println!("  database: {}", db_path.display());
    println!("\nNext: `coachpro user add <login> --role administrator` then `coachpro serve`.");
    Ok(())
}
