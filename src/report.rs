use std::io::{self, Write};

use crate::card::{Card, Movement};

const LABEL_WIDTH: usize = 21;
const SEPARATOR: &str = " | ";
const COLUMNS: [&str; 7] = ["Id", "Date", "Type", "Description", "Debit", "Credit", "Balance"];

/// Print the card summary and, when there are movements, an aligned table.
pub fn write_report<W: Write>(out: &mut W, card: &Card) -> io::Result<()> {
    let header = [
        ("Holder Name:", card.holder_name.clone()),
        ("Card Number:", card.number.clone()),
        ("Expiration Date:", card.expiration_date.clone()),
        ("Outstanding Balance:", card.outstanding_balance.to_string()),
        ("Current Balance:", card.current_balance.to_string()),
    ];
    for (label, value) in &header {
        writeln!(out, "{:<width$}{}", label, value, width = LABEL_WIDTH)?;
    }

    if card.movements.is_empty() {
        return Ok(());
    }
    writeln!(out)?;

    let rows: Vec<[String; 7]> = std::iter::once(COLUMNS.map(String::from))
        .chain(card.movements.iter().map(cells))
        .collect();
    let widths = column_widths(&rows);

    for row in &rows {
        let mut line = String::from(SEPARATOR);
        for (cell, width) in row.iter().zip(widths) {
            line.push_str(&format!("{:<width$}", cell, width = width));
            line.push_str(SEPARATOR);
        }
        writeln!(out, "{}", line)?;
    }
    Ok(())
}

pub fn write_json<W: Write>(out: &mut W, card: &Card) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *out, card)?;
    writeln!(out)
}

fn cells(movement: &Movement) -> [String; 7] {
    [
        movement.id.clone(),
        movement.date.clone(),
        movement.kind.clone(),
        movement.description.clone(),
        movement.debit.to_string(),
        movement.credit.to_string(),
        movement.balance.to_string(),
    ]
}

fn column_widths(rows: &[[String; 7]]) -> [usize; 7] {
    let mut widths = [0; 7];
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }
    widths
}
