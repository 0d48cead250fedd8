use rust_decimal::Decimal;
use serde::Serialize;

/// Card summary and, when requested, its movements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Card {
    pub holder_name: String,
    pub number: String,
    pub expiration_date: String,
    pub outstanding_balance: Decimal,
    pub current_balance: Decimal,
    /// Page order; empty when history was not requested.
    pub movements: Vec<Movement>,
}

/// One history entry. `balance` should equal the previous row's balance
/// adjusted by this row's debit and credit; the portal's value is kept as is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Movement {
    pub id: String,
    pub date: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub debit: Decimal,
    pub credit: Decimal,
    pub balance: Decimal,
}
