use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum Direction {
    In,
    Out,
}

impl Direction {
    /// The quantity with the sign this direction applies to a balance.
    pub fn signed(self, quantity: Decimal) -> Decimal {
        match self {
            Direction::In => quantity,
            Direction::Out => -quantity,
        }
    }
}

impl TryFrom<String> for Direction {
    type Error = strum::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// What happens to an OUT movement for a (product, warehouse) pair that has
/// no balance row yet.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum OutWithoutBalance {
    /// Record the ledger entry and leave the balance table untouched.
    #[default]
    Ignore,
    /// Refuse the movement before anything is appended.
    Reject,
    /// Open a balance row at the negated quantity.
    Materialize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceEffect {
    /// Add the signed delta to the existing row.
    Adjust(Decimal),
    /// Open a new row holding this quantity.
    Open(Decimal),
    /// Ledger entry only.
    LedgerOnly,
}

/// Decides how one movement changes the balance of its pair.
pub fn plan_balance_effect(
    direction: Direction,
    quantity: Decimal,
    has_balance: bool,
    policy: OutWithoutBalance,
) -> StoreResult<BalanceEffect> {
    if has_balance {
        return Ok(BalanceEffect::Adjust(direction.signed(quantity)));
    }
    match (direction, policy) {
        (Direction::In, _) => Ok(BalanceEffect::Open(quantity)),
        (Direction::Out, OutWithoutBalance::Ignore) => Ok(BalanceEffect::LedgerOnly),
        (Direction::Out, OutWithoutBalance::Materialize) => Ok(BalanceEffect::Open(-quantity)),
        (Direction::Out, OutWithoutBalance::Reject) => Err(StoreError::ValidationFailure(
            "no stock on hand for this product at this warehouse".to_string(),
        )),
    }
}

/// Decimal places a stored quantity keeps (`NUMERIC(14, 4)`).
pub const QUANTITY_SCALE: u32 = 4;

/// Largest magnitude a stored quantity can hold: 9999999999.9999.
pub fn max_quantity() -> Decimal {
    Decimal::new(99_999_999_999_999, QUANTITY_SCALE)
}

/// Checks that `quantity` fits the stored column: at most four decimal
/// places and a magnitude no larger than [`max_quantity`].
pub fn check_quantity(field: &str, quantity: Decimal) -> StoreResult<()> {
    if quantity.normalize().scale() > QUANTITY_SCALE {
        return Err(StoreError::ValidationFailure(format!(
            "{field} allows at most {QUANTITY_SCALE} decimal places"
        )));
    }
    if quantity.abs() > max_quantity() {
        return Err(StoreError::ValidationFailure(format!(
            "{field} must be between -{max} and {max}",
            max = max_quantity()
        )));
    }
    Ok(())
}

/// `balance + delta`, refused when the sum leaves the storable range.
pub fn add_to_balance(balance: Decimal, delta: Decimal) -> StoreResult<Decimal> {
    balance
        .checked_add(delta)
        .filter(|sum| sum.abs() <= max_quantity())
        .ok_or_else(|| {
            StoreError::ValidationFailure(format!(
                "balance quantity would leave the range -{max}..={max}",
                max = max_quantity()
            ))
        })
}

/// Replays one pair's ledger, oldest first, and returns the balance quantity
/// the applier would have produced, or `None` if no row would exist.
///
/// Entries the policy would now refuse are skipped: they were accepted under
/// an earlier policy and carry no balance effect. So are entries whose effect
/// would overflow the balance, which the applier refuses too.
pub fn replay<'a, I>(movements: I, policy: OutWithoutBalance) -> Option<Decimal>
where
    I: IntoIterator<Item = &'a StockMovement>,
{
    replay_from(None, movements, policy)
}

fn replay_from<'a, I>(
    mut balance: Option<Decimal>,
    movements: I,
    policy: OutWithoutBalance,
) -> Option<Decimal>
where
    I: IntoIterator<Item = &'a StockMovement>,
{
    for movement in movements {
        let effect =
            plan_balance_effect(movement.direction, movement.quantity, balance.is_some(), policy);
        match effect {
            Ok(BalanceEffect::Adjust(delta)) => {
                if let Some(next) = balance.and_then(|q| add_to_balance(q, delta).ok()) {
                    balance = Some(next);
                }
            }
            Ok(BalanceEffect::Open(quantity)) => balance = Some(quantity),
            Ok(BalanceEffect::LedgerOnly) | Err(_) => {}
        }
    }
    balance
}

/// A balance row rewritten by reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Correction {
    pub product_id: i64,
    pub warehouse_code: String,
    /// `None` when the row was missing.
    pub previous: Option<Decimal>,
    pub corrected: Decimal,
}

/// Compares every balance row with the quantity its ledger history implies
/// and returns the rows that disagree, ordered by pair.
///
/// A row opened by hand starts from its `opening_quantity` and only counts
/// entries appended after it (`id > ledger_floor`). Any other row replays the
/// pair's whole ledger. Rows with nothing to replay are left alone, and
/// `ledger` must be in append order.
pub fn plan_corrections(
    ledger: &[StockMovement],
    balances: &[InventoryBalance],
    policy: OutWithoutBalance,
) -> Vec<Correction> {
    let mut history: BTreeMap<(i64, &str), Vec<&StockMovement>> = BTreeMap::new();
    for movement in ledger {
        history
            .entry((movement.product_id, movement.warehouse_code.as_str()))
            .or_default()
            .push(movement);
    }
    let rows: HashMap<(i64, &str), &InventoryBalance> = balances
        .iter()
        .map(|b| ((b.product_id, b.warehouse_code.as_str()), b))
        .collect();

    let mut pairs: BTreeSet<(i64, &str)> = history.keys().copied().collect();
    pairs.extend(rows.keys().copied());

    let mut corrections = Vec::new();
    for pair in pairs {
        let entries = history.get(&pair).map(Vec::as_slice).unwrap_or_default();
        let row = rows.get(&pair).copied();
        let baseline = row.and_then(|b| b.ledger_floor.map(|floor| (floor, b.opening_quantity)));
        let expected = match baseline {
            Some((floor, opening)) => replay_from(
                Some(opening),
                entries.iter().copied().filter(|m| m.id > floor),
                policy,
            ),
            None => replay(entries.iter().copied(), policy),
        };
        let Some(expected) = expected else {
            continue;
        };
        let previous = row.map(|b| b.quantity);
        if previous == Some(expected) {
            continue;
        }
        corrections.push(Correction {
            product_id: pair.0,
            warehouse_code: pair.1.to_string(),
            previous,
            corrected: expected,
        });
    }
    corrections
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct InventoryBalance {
    pub id: i64,
    pub product_id: i64,
    pub warehouse_code: String,
    pub quantity: Decimal,
    pub reserved_quantity: Decimal,
    /// Quantity a hand-opened row started with; zero otherwise.
    pub opening_quantity: Decimal,
    /// Last ledger id that predates a hand-opened row. `None` for rows opened
    /// by a movement or by reconciliation.
    pub ledger_floor: Option<i64>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBalance {
    pub product_id: i64,
    pub warehouse_code: String,
    pub quantity: Decimal,
    #[serde(default)]
    pub reserved_quantity: Decimal,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BalanceChanges {
    pub quantity: Option<Decimal>,
    pub reserved_quantity: Option<Decimal>,
}

impl BalanceChanges {
    pub fn apply_to(self, balance: &mut InventoryBalance) {
        if let Some(quantity) = self.quantity {
            balance.quantity = quantity;
        }
        if let Some(reserved) = self.reserved_quantity {
            balance.reserved_quantity = reserved;
        }
        balance.updated_at = Utc::now();
    }
}

/// Immutable ledger entry.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StockMovement {
    pub id: i64,
    pub product_id: i64,
    pub warehouse_code: String,
    #[sqlx(try_from = "String")]
    pub direction: Direction,
    pub quantity: Decimal,
    pub reference: Option<String>,
    pub note: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl StockMovement {
    pub fn signed_quantity(&self) -> Decimal {
        self.direction.signed(self.quantity)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMovement {
    pub product_id: i64,
    pub warehouse_code: String,
    pub direction: Direction,
    pub quantity: Decimal,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub created_by: Option<Uuid>,
}

impl NewMovement {
    pub fn new(
        product_id: i64,
        warehouse_code: impl Into<String>,
        direction: Direction,
        quantity: Decimal,
    ) -> Self {
        Self {
            product_id,
            warehouse_code: warehouse_code.into(),
            direction,
            quantity,
            reference: None,
            note: None,
            created_by: None,
        }
    }
}

/// The appended entry together with the balance row it touched, if any.
#[derive(Debug, Clone, Serialize)]
pub struct MovementReceipt {
    pub movement: StockMovement,
    pub balance: Option<InventoryBalance>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn entry(direction: Direction, quantity: Decimal) -> StockMovement {
        entry_with_id(0, direction, quantity)
    }

    fn entry_with_id(id: i64, direction: Direction, quantity: Decimal) -> StockMovement {
        StockMovement {
            id,
            product_id: 1,
            warehouse_code: "W1".to_string(),
            direction,
            quantity,
            reference: None,
            note: None,
            created_by: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn existing_balance_takes_signed_delta() {
        let policy = OutWithoutBalance::Reject;
        assert_eq!(
            plan_balance_effect(Direction::In, dec!(4), true, policy).unwrap(),
            BalanceEffect::Adjust(dec!(4))
        );
        assert_eq!(
            plan_balance_effect(Direction::Out, dec!(4), true, policy).unwrap(),
            BalanceEffect::Adjust(dec!(-4))
        );
    }

    #[test]
    fn out_without_balance_follows_policy() {
        let plan = |policy| plan_balance_effect(Direction::Out, dec!(3), false, policy);
        assert_eq!(plan(OutWithoutBalance::Ignore).unwrap(), BalanceEffect::LedgerOnly);
        assert_eq!(plan(OutWithoutBalance::Materialize).unwrap(), BalanceEffect::Open(dec!(-3)));
        assert!(matches!(
            plan(OutWithoutBalance::Reject),
            Err(StoreError::ValidationFailure(_))
        ));
    }

    #[test]
    fn replay_matches_applier_rules() {
        let ledger = vec![
            entry(Direction::Out, dec!(5)),
            entry(Direction::In, dec!(10)),
            entry(Direction::Out, dec!(3)),
            entry(Direction::Out, dec!(20)),
        ];
        assert_eq!(replay(&ledger, OutWithoutBalance::Ignore), Some(dec!(-13)));
        assert_eq!(replay(&ledger, OutWithoutBalance::Materialize), Some(dec!(-18)));
        assert_eq!(replay(&ledger[..1], OutWithoutBalance::Ignore), None);
    }

    #[test]
    fn replay_skips_entries_that_would_overflow() {
        let ledger = vec![
            entry(Direction::In, max_quantity()),
            entry(Direction::In, dec!(1)),
            entry(Direction::Out, dec!(2)),
        ];
        assert_eq!(
            replay(&ledger, OutWithoutBalance::Ignore),
            Some(max_quantity() - dec!(2))
        );
    }

    #[test]
    fn quantity_check_enforces_scale_and_range() {
        assert!(check_quantity("q", dec!(0.0001)).is_ok());
        assert!(check_quantity("q", dec!(2.50000)).is_ok());
        assert!(check_quantity("q", -max_quantity()).is_ok());
        assert!(check_quantity("q", dec!(0.00001)).is_err());
        assert!(check_quantity("q", max_quantity() + dec!(0.0001)).is_err());
        assert!(add_to_balance(-max_quantity(), dec!(-1)).is_err());
    }

    #[test]
    fn hand_opened_row_replays_from_its_floor() {
        let ledger = vec![
            entry_with_id(1, Direction::Out, dec!(4)),
            entry_with_id(2, Direction::In, dec!(10)),
            entry_with_id(3, Direction::In, dec!(3)),
        ];
        let mut row = InventoryBalance {
            id: 9,
            product_id: 1,
            warehouse_code: "W1".to_string(),
            quantity: dec!(63),
            reserved_quantity: dec!(0),
            opening_quantity: dec!(50),
            ledger_floor: Some(1),
            updated_at: Utc::now(),
        };
        let policy = OutWithoutBalance::Ignore;
        assert!(plan_corrections(&ledger, std::slice::from_ref(&row), policy).is_empty());

        row.ledger_floor = None;
        assert_eq!(
            plan_corrections(&ledger, std::slice::from_ref(&row), policy),
            vec![Correction {
                product_id: 1,
                warehouse_code: "W1".to_string(),
                previous: Some(dec!(63)),
                corrected: dec!(13),
            }]
        );
    }

    #[test]
    fn missing_row_is_planned_from_full_history() {
        let ledger = vec![entry_with_id(1, Direction::In, dec!(8))];
        let corrections = plan_corrections(&ledger, &[], OutWithoutBalance::Ignore);
        assert_eq!(corrections.len(), 1);
        assert_eq!(corrections[0].previous, None);
        assert_eq!(corrections[0].corrected, dec!(8));
    }

    #[test]
    fn direction_parses_case_insensitively() {
        assert_eq!("in".parse::<Direction>().unwrap(), Direction::In);
        assert_eq!(Direction::Out.to_string(), "OUT");
        assert_eq!("MATERIALIZE".parse::<OutWithoutBalance>().unwrap(), OutWithoutBalance::Materialize);
    }
}
