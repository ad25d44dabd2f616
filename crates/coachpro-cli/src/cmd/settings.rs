use clap::Subcommand;
use coachpro_core::settings::{parse_flag, SettingsUpdate};
use std::path::Path;

use crate::output::{or_dash, print_json};

#[derive(Subcommand)]
pub enum SettingsSubcommand {
    /// Show current settings
    Show,
    /// Change one or more settings; omitted ones keep their value
    Set {
        /// ISO currency code used in program offers
        #[arg(long)]
        currency: Option<String>,
        /// Slug of the page that lists programs
        #[arg(long)]
        program_page: Option<String>,
        /// Auto-enroll on completed store orders (1/0, yes/no, on/off)
        #[arg(long)]
        woo_enable: Option<String>,
        /// Recommendation rules as a JSON document
        #[arg(long)]
        rules_json: Option<String>,
    },
}

pub fn run(root: &Path, subcmd: SettingsSubcommand, json: bool) -> anyhow::Result<()> {
    let (_, mut store) = super::open(root)?;
    let settings = match subcmd {
        SettingsSubcommand::Show => store.load_settings()?,
        SettingsSubcommand::Set {
            currency,
            program_page,
            woo_enable,
            rules_json,
        } => store.apply_settings(SettingsUpdate {
            currency,
            program_page,
            woo_enable: woo_enable.as_deref().map(parse_flag).transpose()?,
            rules_json,
        })?,
    };

    if json {
        return print_json(&settings);
    }
    println!("currency:      {}", settings.currency);
    println!("program_page:  {}", or_dash(Some(settings.program_page.as_str())));
    println!("woo_enable:    {}", settings.woo_enable);
    println!("rules_json:    {}", settings.rules_json);
    println!("version:       {}", or_dash(settings.version.as_deref()));
    Ok(())
}
