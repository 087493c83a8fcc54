//! List command - every barcode with its current quantity

use crate::cli::error::HelpfulError;
use crate::cli::output::{format_number, format_timestamp, print_json, print_table};
use crate::cli::with_service;
use scantrack_server::StoreArgs;

pub fn run(store: StoreArgs, json: bool) -> anyhow::Result<()> {
    let records = with_service(&store, |service| async move {
        service
            .records()
            .await
            .map_err(|e| anyhow::Error::from(HelpfulError::from(e)))
    })?;

    if json {
        return print_json(&records);
    }

    if records.is_empty() {
        println!("No barcodes scanned yet.");
        return Ok(());
    }

    let rows = records
        .iter()
        .map(|r| {
            vec![
                r.barcode.clone(),
                format_number(r.quantity),
                format_timestamp(r.first_scan),
                format_timestamp(r.last_scan),
                r.responsible.clone(),
            ]
        })
        .collect();
    print_table(
        &["BARCODE", "QTY", "FIRST SCANNED", "LAST SCANNED", "RESPONSIBLE"],
        rows,
    );
    Ok(())
}
