use clap::Subcommand;
use coachpro_core::program::ProgramInput;
use coachpro_core::types::PublishStatus;
use std::path::Path;

use crate::output::{or_dash, print_json, print_table};

#[derive(Subcommand)]
pub enum ProgramSubcommand {
    /// Create a program
    Add {
        title: String,
        /// URL slug (default: derived from the title)
        #[arg(long)]
        slug: Option<String>,
        #[arg(long)]
        excerpt: Option<String>,
        #[arg(long)]
        content: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        price: Option<String>,
        /// Keep the program out of public listings
        #[arg(long)]
        draft: bool,
    },
    /// List all programs, drafts included
    List,
    /// Publish or unpublish a program
    Status {
        id: i64,
        /// publish | draft
        status: String,
    },
}

pub fn run(root: &Path, subcmd: ProgramSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ProgramSubcommand::Add {
            title,
            slug,
            excerpt,
            content,
            category,
            price,
            draft,
        } => {
            let input = ProgramInput {
                slug,
                title: Some(title),
                excerpt,
                content,
                category,
                price,
                status: Some(if draft {
                    PublishStatus::Draft
                } else {
                    PublishStatus::Publish
                }),
                ..Default::default()
            };
            add(root, input, json)
        }
        ProgramSubcommand::List => list(root, json),
        ProgramSubcommand::Status { id, status } => set_status(root, id, &status, json),
    }
}

fn add(root: &Path, input: ProgramInput, json: bool) -> anyhow::Result<()> {
    let (config, mut store) = super::open(root)?;
    let program = store.create_program(input)?;
    if json {
        print_json(&program)
    } else {
        println!("Created program '{}' (id {})", program.slug, program.id);
        println!("  {}", program.permalink(config.site.base_url()));
        Ok(())
    }
}

fn list(root: &Path, json: bool) -> anyhow::Result<()> {
    let (_, store) = super::open(root)?;
    let programs = store.list_programs()?;
    if json {
        return print_json(&programs);
    }
    if programs.is_empty() {
        println!("No programs.");
        return Ok(());
    }
    let rows = programs
        .iter()
        .map(|p| {
            vec![
                p.id.to_string(),
                p.slug.clone(),
                p.title.clone(),
                or_dash(p.category.as_deref()),
                p.price_or_zero(),
                p.status.as_str().to_string(),
            ]
        })
        .collect();
    print_table(&["ID", "SLUG", "TITLE", "CATEGORY", "PRICE", "STATUS"], rows);
    Ok(())
}

fn set_status(root: &Path, id: i64, status: &str, json: bool) -> anyhow::Result<()> {
    let status: PublishStatus = status.parse()?;
    let (_, mut store) = super::open(root)?;
    let program = store.update_program(
        id,
        ProgramInput {
            status: Some(status),
            ..Default::default()
        },
    )?;
    if json {
        print_json(&program)
    } else {
        println!("Program '{}' is now {}", program.slug, program.status.as_str());
        Ok(())
    }
}
