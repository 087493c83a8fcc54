//! Logs command - movement history for one barcode, newest first

use crate::cli::error::HelpfulError;
use crate::cli::output::{
    delta_color, format_number, format_number_signed, format_timestamp, print_json,
    print_table_colored,
};
use crate::cli::with_service;
use scantrack_server::{LogQuery, StoreArgs};

#[derive(Debug)]
pub struct LogsArgs {
    pub barcode: String,
    pub limit: Option<usize>,
    pub json: bool,
}

pub fn run(store: StoreArgs, args: LogsArgs) -> anyhow::Result<()> {
    let query = LogQuery {
        barcode: Some(args.barcode.clone()),
        limit: args.limit,
    };
    let entries = with_service(&store, |service| async move {
        service
            .history(query)
            .await
            .map_err(|e| anyhow::Error::from(HelpfulError::from(e)))
    })?;

    if args.json {
        return print_json(&entries);
    }

    if entries.is_empty() {
        println!("No movements recorded for {}.", args.barcode);
        return Ok(());
    }

    let rows = entries
        .iter()
        .map(|e| {
            vec![
                (format_timestamp(e.created_at), None),
                (format_number_signed(e.delta), delta_color(e.delta)),
                (format_number(e.quantity_after), None),
                (e.actor_name.clone(), None),
            ]
        })
        .collect();
    print_table_colored(&["TIME", "DELTA", "QTY AFTER", "BY"], rows);
    Ok(())
}
