//! CSV format handling for replay commands and account output
//!
//! This module centralizes all CSV format concerns, providing:
//! - CommandRecord structure for deserialization
//! - Conversion from CSV records to [`LedgerCommand`]s
//! - Account snapshot serialization
//!
//! All functions are pure (no I/O) for easy testing.

use crate::types::{AccountId, AccountSnapshot, LedgerCommand, LedgerError};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Write;
use std::str::FromStr;

/// CSV record structure for deserialization
///
/// Matches the input CSV format with columns:
/// `type, account, target, amount, last_name, first_name, credit_rating`.
/// Everything after `account` is optional; which fields are required
/// depends on the command type.
#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
pub struct CommandRecord {
    #[serde(rename = "type")]
    pub command: String,
    pub account: AccountId,
    #[serde(default)]
    pub target: Option<AccountId>,
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub credit_rating: Option<i32>,
}

fn non_empty(field: Option<String>) -> Option<String> {
    field
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn required_amount(record: &CommandRecord) -> Result<Decimal, LedgerError> {
    let amount = non_empty(record.amount.clone()).ok_or_else(|| {
        LedgerError::parse(format!(
            "{} on account {} requires an amount",
            record.command, record.account
        ))
    })?;

    Decimal::from_str(&amount).map_err(|_| {
        LedgerError::parse(format!(
            "Invalid amount '{}' for {} on account {}",
            amount, record.command, record.account
        ))
    })
}

/// Convert a CommandRecord to a LedgerCommand
///
/// The command type is matched case-insensitively (`withdrawal` is accepted
/// as an alias of `withdraw`). Sign checks on amounts are left to the ledger,
/// which journals the rejection.
///
/// # Returns
///
/// * `Ok(LedgerCommand)` - Successfully converted record
/// * `Err(LedgerError::ParseError)` - Unknown type or missing/invalid fields
pub fn convert_command_record(record: CommandRecord) -> Result<LedgerCommand, LedgerError> {
    let account = record.account;

    match record.command.trim().to_lowercase().as_str() {
        "open" => {
            let last_name = non_empty(record.last_name.clone());
            let first_name = non_empty(record.first_name.clone());
            match (last_name, first_name) {
                (Some(last_name), Some(first_name)) => Ok(LedgerCommand::Open {
                    account,
                    last_name,
                    first_name,
                    credit_rating: record.credit_rating.unwrap_or_default(),
                }),
                _ => Err(LedgerError::parse(format!(
                    "open on account {} requires a holder name",
                    account
                ))),
            }
        }
        "deposit" => Ok(LedgerCommand::Deposit {
            account,
            amount: required_amount(&record)?,
        }),
        "withdraw" | "withdrawal" => Ok(LedgerCommand::Withdraw {
            account,
            amount: required_amount(&record)?,
        }),
        "transfer" => {
            let to = record.target.ok_or_else(|| {
                LedgerError::parse(format!(
                    "transfer from account {} requires a target",
                    account
                ))
            })?;
            Ok(LedgerCommand::Transfer {
                from: account,
                to,
                amount: required_amount(&record)?,
            })
        }
        "close" => Ok(LedgerCommand::Close { account }),
        _ => Err(LedgerError::parse(format!(
            "Invalid command type '{}' for account {}",
            record.command, account
        ))),
    }
}

/// Write account snapshots to CSV format
///
/// Writes accounts in CSV format with columns: account, holder, balance, closed.
/// Snapshots are sorted by account ID for deterministic output and balances
/// are printed with four decimal places.
pub fn write_accounts_csv(
    accounts: &[AccountSnapshot],
    output: &mut dyn Write,
) -> Result<(), LedgerError> {
    use csv::Writer;

    let mut writer = Writer::from_writer(output);

    writer.write_record(["account", "holder", "balance", "closed"])?;

    let mut sorted_accounts = accounts.to_vec();
    sorted_accounts.sort_by_key(|snapshot| snapshot.account);

    for snapshot in sorted_accounts {
        writer.write_record(&[
            snapshot.account.to_string(),
            snapshot.holder,
            format!("{:.4}", snapshot.balance),
            snapshot.closed.to_string(),
        ])?;
    }

    writer.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal::Decimal;

    fn record(command: &str, amount: Option<&str>) -> CommandRecord {
        CommandRecord {
            command: command.to_string(),
            account: 1,
            amount: amount.map(|s| s.to_string()),
            ..CommandRecord::default()
        }
    }

    #[rstest]
    #[case::deposit("deposit", LedgerCommand::Deposit { account: 1, amount: Decimal::new(1000, 1) })]
    #[case::uppercase("DEPOSIT", LedgerCommand::Deposit { account: 1, amount: Decimal::new(1000, 1) })]
    #[case::withdraw("withdraw", LedgerCommand::Withdraw { account: 1, amount: Decimal::new(1000, 1) })]
    #[case::withdrawal_alias("withdrawal", LedgerCommand::Withdraw { account: 1, amount: Decimal::new(1000, 1) })]
    fn test_convert_amount_commands(#[case] command: &str, #[case] expected: LedgerCommand) {
        let result = convert_command_record(record(command, Some("100.0")));
        assert_eq!(result, Ok(expected));
    }

    #[test]
    fn test_convert_open_defaults_rating() {
        let csv_record = CommandRecord {
            command: "open".to_string(),
            account: 4,
            last_name: Some("Turing".to_string()),
            first_name: Some(" Alan ".to_string()),
            ..CommandRecord::default()
        };

        assert_eq!(
            convert_command_record(csv_record),
            Ok(LedgerCommand::Open {
                account: 4,
                last_name: "Turing".to_string(),
                first_name: "Alan".to_string(),
                credit_rating: 0,
            })
        );
    }

    #[test]
    fn test_convert_transfer_and_close() {
        let transfer = CommandRecord {
            command: "transfer".to_string(),
            account: 1,
            target: Some(2),
            amount: Some("25.5".to_string()),
            ..CommandRecord::default()
        };
        assert_eq!(
            convert_command_record(transfer),
            Ok(LedgerCommand::Transfer {
                from: 1,
                to: 2,
                amount: Decimal::new(255, 1),
            })
        );

        let close = convert_command_record(record("close", None)).unwrap();
        assert_eq!(close, LedgerCommand::Close { account: 1 });
        assert_eq!(close.account(), 1);
    }

    #[rstest]
    #[case::invalid_type(record("interest", Some("1.0")), "Invalid command type")]
    #[case::deposit_missing_amount(record("deposit", None), "requires an amount")]
    #[case::whitespace_amount(record("withdraw", Some("  ")), "requires an amount")]
    #[case::invalid_amount(record("deposit", Some("ten")), "Invalid amount")]
    #[case::transfer_missing_target(record("transfer", Some("1.0")), "requires a target")]
    #[case::open_missing_name(record("open", None), "requires a holder name")]
    fn test_convert_command_record_errors(
        #[case] csv_record: CommandRecord,
        #[case] expected_error: &str,
    ) {
        let result = convert_command_record(csv_record);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains(expected_error));
    }

    #[rstest]
    #[case::sorted_by_account(
        vec![
            AccountSnapshot { account: 2, holder: "Hopper, Grace".to_string(), balance: Decimal::new(505, 1), closed: true },
            AccountSnapshot { account: 1, holder: "Lovelace, Ada".to_string(), balance: Decimal::ZERO, closed: false },
        ],
        "account,holder,balance,closed\n1,\"Lovelace, Ada\",0.0000,false\n2,\"Hopper, Grace\",50.5000,true\n"
    )]
    #[case::four_decimal_precision(
        vec![AccountSnapshot { account: 1, holder: "Doe".to_string(), balance: Decimal::new(1001234, 4), closed: false }],
        "account,holder,balance,closed\n1,Doe,100.1234,false\n"
    )]
    #[case::empty_accounts(vec![], "account,holder,balance,closed\n")]
    fn test_write_accounts_csv(#[case] accounts: Vec<AccountSnapshot>, #[case] expected_output: &str) {
        let mut output = Vec::new();
        let result = write_accounts_csv(&accounts, &mut output);
        assert!(result.is_ok());

        let output_str = String::from_utf8(output).unwrap();
        assert_eq!(output_str, expected_output);
    }
}
