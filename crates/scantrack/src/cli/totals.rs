//! Totals command - distinct barcodes and summed quantity

use crate::cli::error::HelpfulError;
use crate::cli::output::{format_number, print_json};
use crate::cli::with_service;
use scantrack_server::StoreArgs;

pub fn run(store: StoreArgs, json: bool) -> anyhow::Result<()> {
    let totals = with_service(&store, |service| async move {
        service
            .totals()
            .await
            .map_err(|e| anyhow::Error::from(HelpfulError::from(e)))
    })?;

    if json {
        return print_json(&totals);
    }

    println!("Barcodes:         {}", format_number(totals.total_codes));
    println!(
        "Products scanned: {}",
        format_number(totals.total_products_scanned)
    );
    Ok(())
}
