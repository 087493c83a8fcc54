//! Scan command - record one scan from the terminal

use crate::cli::error::HelpfulError;
use crate::cli::output::{format_number, format_timestamp, print_json};
use crate::cli::with_service;
use scantrack_server::{ScanRequest, StoreArgs};

#[derive(Debug)]
pub struct ScanArgs {
    pub barcode: String,
    pub responsible: String,
    pub increment: i64,
    pub json: bool,
}

pub fn run(store: StoreArgs, args: ScanArgs) -> anyhow::Result<()> {
    let request = ScanRequest::new(args.barcode, args.responsible).with_increment(args.increment);
    let record = with_service(&store, |service| async move {
        service
            .record_scan(request)
            .await
            .map_err(|e| anyhow::Error::from(HelpfulError::from(e)))
    })?;

    if args.json {
        return print_json(&record);
    }

    println!(
        "{}  quantity {}  by {}  at {}",
        record.barcode,
        format_number(record.quantity),
        record.responsible,
        format_timestamp(record.last_scan)
    );
    Ok(())
}
