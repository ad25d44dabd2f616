use clap::Subcommand;
use coachpro_core::analytics::{parse_date, AnalyticsQuery};
use coachpro_core::db;
use std::path::Path;

use crate::output::{print_json, print_table};

#[derive(Subcommand)]
pub enum AnalyticsSubcommand {
    /// Aggregate enrollments and progress of a program into a snapshot
    Compute {
        program_id: i64,
        /// Snapshot date, YYYY-MM-DD (default: today, UTC)
        #[arg(long)]
        date: Option<String>,
    },
    /// List recorded snapshots
    List {
        #[arg(long)]
        program: Option<i64>,
        /// First date, YYYY-MM-DD
        #[arg(long)]
        from: Option<String>,
        /// Last date, YYYY-MM-DD
        #[arg(long)]
        to: Option<String>,
    },
}

pub fn run(root: &Path, subcmd: AnalyticsSubcommand, json: bool) -> anyhow::Result<()> {
    let (_, mut store) = super::open(root)?;
    match subcmd {
        AnalyticsSubcommand::Compute { program_id, date } => {
            let now = db::now();
            let date = match date {
                Some(d) => parse_date(&d)?,
                None => now.date_naive(),
            };
            let snap = store.compute_snapshot(program_id, date, now)?;
            if json {
                print_json(&snap)
            } else {
                println!(
                    "{} program {}: {} enrollments, {}% complete, avg score {}",
                    snap.snapshot_date,
                    snap.program_id,
                    snap.enrollments,
                    snap.completion_rate,
                    snap.avg_score
                );
                Ok(())
            }
        }
        AnalyticsSubcommand::List { program, from, to } => {
            let rows = store.query_analytics(&AnalyticsQuery {
                program_id: program,
                from,
                to,
            })?;
            if json {
                return print_json(&rows);
            }
            if rows.is_empty() {
                println!("No snapshots.");
                return Ok(());
            }
            let table = rows
                .iter()
                .map(|s| {
                    vec![
                        s.snapshot_date.to_string(),
                        s.program_id.to_string(),
                        s.enrollments.to_string(),
                        format!("{:.2}", s.completion_rate),
                        format!("{:.2}", s.avg_score),
                    ]
                })
                .collect();
            print_table(&["DATE", "PROGRAM", "ENROLLED", "COMPLETE%", "AVG"], table);
            Ok(())
        }
    }
}
