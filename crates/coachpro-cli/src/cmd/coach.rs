use clap::Subcommand;
use coachpro_core::coach::CoachInput;
use std::path::Path;

use crate::output::{or_dash, print_json, print_table};

#[derive(Subcommand)]
pub enum CoachSubcommand {
    /// Create a coach profile
    Add {
        name: String,
        #[arg(long)]
        slug: Option<String>,
        #[arg(long)]
        specialty: Option<String>,
        #[arg(long)]
        excerpt: Option<String>,
    },
    /// List published coaches
    List {
        /// Only coaches with this specialty
        #[arg(long)]
        specialty: Option<String>,
    },
}

pub fn run(root: &Path, subcmd: CoachSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        CoachSubcommand::Add {
            name,
            slug,
            specialty,
            excerpt,
        } => {
            let (_, mut store) = super::open(root)?;
            let coach = store.create_coach(CoachInput {
                slug,
                name,
                excerpt,
                specialty,
                ..Default::default()
            })?;
            if json {
                print_json(&coach)
            } else {
                println!("Created coach '{}' (id {})", coach.slug, coach.id);
                Ok(())
            }
        }
        CoachSubcommand::List { specialty } => {
            let (_, store) = super::open(root)?;
            let coaches = store.list_published_coaches(specialty.as_deref())?;
            if json {
                return print_json(&coaches);
            }
            if coaches.is_empty() {
                println!("No coaches.");
                return Ok(());
            }
            let rows = coaches
                .iter()
                .map(|c| {
                    vec![
                        c.id.to_string(),
                        c.slug.clone(),
                        c.name.clone(),
                        or_dash(c.specialty.as_deref()),
                    ]
                })
                .collect();
            print_table(&["ID", "SLUG", "NAME", "SPECIALTY"], rows);
            Ok(())
        }
    }
}
