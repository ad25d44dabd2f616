use clap::Subcommand;
use coachpro_core::db;
use std::path::Path;

use crate::output::{print_json, print_table};

#[derive(Subcommand)]
pub enum ProductSubcommand {
    /// Enroll buyers of a product into a program
    Map { product_id: i64, program_id: i64 },
    /// Remove a product's program mapping
    Unmap { product_id: i64 },
    /// List product to program mappings
    List,
}

pub fn run(root: &Path, subcmd: ProductSubcommand, json: bool) -> anyhow::Result<()> {
    let (_, mut store) = super::open(root)?;
    match subcmd {
        ProductSubcommand::Map {
            product_id,
            program_id,
        } => {
            store.map_product(product_id, program_id, db::now())?;
            if json {
                print_json(&serde_json::json!({
                    "product_id": product_id,
                    "program_id": program_id,
                }))
            } else {
                println!("Product {product_id} -> program {program_id}");
                Ok(())
            }
        }
        ProductSubcommand::Unmap { product_id } => {
            let removed = store.unmap_product(product_id)?;
            if json {
                print_json(&serde_json::json!({ "product_id": product_id, "removed": removed }))
            } else {
                if removed {
                    println!("Product {product_id} unmapped");
                } else {
                    println!("Product {product_id} was not mapped");
                }
                Ok(())
            }
        }
        ProductSubcommand::List => {
            let mappings = store.list_product_mappings()?;
            if json {
                let list: Vec<_> = mappings
                    .iter()
                    .map(|(product, program)| {
                        serde_json::json!({ "product_id": product, "program_id": program })
                    })
                    .collect();
                return print_json(&list);
            }
            if mappings.is_empty() {
                println!("No product mappings.");
                return Ok(());
            }
            let rows = mappings
                .iter()
                .map(|(product, program)| vec![product.to_string(), program.to_string()])
                .collect();
            print_table(&["PRODUCT", "PROGRAM"], rows);
            Ok(())
        }
    }
}
