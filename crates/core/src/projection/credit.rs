//! Credit lines: drawdowns, repayments, and monthly compounding interest.

use cimiento_shared::types::{CreditLineId, cents, round_money};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::ProjectionError;
use super::period::ProjectMonth;

/// Months per year, for converting annual rates.
const MONTHS_PER_YEAR: Decimal = Decimal::from_parts(12, 0, 0, false, 0);

/// How accrued interest is settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterestMode {
    /// Interest is added to the balance and compounds until repaid.
    Capitalized,
    /// Interest is paid in cash in the month it accrues.
    Paid,
}

/// Direction of a credit movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    /// Funds drawn from the line.
    Drawdown,
    /// Funds paid back to the lender.
    Repayment,
}

/// A scheduled drawdown or repayment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditMovement {
    /// Month of the movement.
    pub month: ProjectMonth,
    /// Drawdown or repayment.
    pub kind: MovementKind,
    /// Amount moved.
    #[serde(serialize_with = "cents::serialize")]
    pub amount: Decimal,
}

/// A construction or bridge credit line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditLine {
    /// Credit line ID.
    pub id: CreditLineId,
    /// Display name.
    pub name: String,
    /// Maximum principal that may be drawn over the life of the line.
    #[serde(serialize_with = "cents::serialize")]
    pub limit: Decimal,
    /// Nominal annual interest rate (0.09 for 9%).
    pub annual_rate: Decimal,
    /// First month of the line.
    pub start_month: ProjectMonth,
    /// Term in months; the balance is settled in the last month of the term.
    pub term_months: u32,
    /// Interest settlement mode.
    pub interest_mode: InterestMode,
    /// Scheduled movements.
    pub movements: Vec<CreditMovement>,
}

impl CreditLine {
    /// Month in which any outstanding balance is repaid in full.
    #[must_use]
    pub fn maturity_month(&self) -> ProjectMonth {
        self.start_month
            .saturating_add(self.term_months.max(1))
            .saturating_sub(1)
    }

    /// Checks rates, amounts, and movement months.
    pub fn validate(&self) -> Result<(), ProjectionError> {
        if self.limit.is_sign_negative() && !self.limit.is_zero() {
            return Err(ProjectionError::NegativeAmount(format!(
                "credit line '{}' limit",
                self.name
            )));
        }
        if self.annual_rate < Decimal::ZERO || self.annual_rate > Decimal::ONE {
            return Err(ProjectionError::InvalidInterestRate(self.name.clone()));
        }
        if self.term_months == 0 {
            return Err(ProjectionError::InvalidTerm(self.name.clone()));
        }

        let maturity = self.maturity_month();
        for movement in &self.movements {
            if movement.amount.is_sign_negative() && !movement.amount.is_zero() {
                return Err(ProjectionError::NegativeAmount(format!(
                    "credit line '{}' movement",
                    self.name
                )));
            }
            if movement.month < self.start_month {
                return Err(ProjectionError::MovementBeforeStart {
                    line: self.name.clone(),
                    month: movement.month,
                    start: self.start_month,
                });
            }
            if movement.month > maturity {
                return Err(ProjectionError::MovementAfterMaturity {
                    line: self.name.clone(),
                    month: movement.month,
                    maturity,
                });
            }
        }

        Ok(())
    }

    fn movements_in(&self, month: ProjectMonth, kind: MovementKind) -> Decimal {
        self.movements
            .iter()
            .filter(|m| m.month == month && m.kind == kind)
            .map(|m| m.amount)
            .sum()
    }
}

/// One month of a credit line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditMonth {
    /// Project month.
    pub month: ProjectMonth,
    /// Balance at the start of the month.
    #[serde(serialize_with = "cents::serialize")]
    pub opening: Decimal,
    /// Principal drawn.
    #[serde(serialize_with = "cents::serialize")]
    pub drawdown: Decimal,
    /// Interest accrued on the opening balance.
    #[serde(serialize_with = "cents::serialize")]
    pub interest: Decimal,
    /// Portion of the interest paid in cash.
    #[serde(serialize_with = "cents::serialize")]
    pub interest_paid: Decimal,
    /// Amount repaid (principal plus capitalized interest).
    #[serde(serialize_with = "cents::serialize")]
    pub repayment: Decimal,
    /// Balance at the end of the month.
    #[serde(serialize_with = "cents::serialize")]
    pub closing: Decimal,
}

/// Full schedule of a credit line over the projection horizon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditSchedule {
    /// Credit line ID.
    pub line_id: CreditLineId,
    /// Credit line name.
    pub name: String,
    /// Interest settlement mode.
    pub interest_mode: InterestMode,
    /// Month rows, one per horizon month.
    pub months: Vec<CreditMonth>,
    /// Total principal drawn.
    #[serde(serialize_with = "cents::serialize")]
    pub total_drawn: Decimal,
    /// Total interest accrued.
    #[serde(serialize_with = "cents::serialize")]
    pub total_interest: Decimal,
    /// Total interest paid in cash as it accrued.
    #[serde(serialize_with = "cents::serialize")]
    pub total_interest_paid: Decimal,
    /// Total repaid.
    #[serde(serialize_with = "cents::serialize")]
    pub total_repaid: Decimal,
    /// Highest closing balance.
    #[serde(serialize_with = "cents::serialize")]
    pub peak_balance: Decimal,
    /// Non-fatal adjustments made while scheduling.
    pub warnings: Vec<String>,
}

/// Builds the month-by-month schedule of a credit line.
///
/// Each month, in order: interest accrues on the opening balance, drawdowns
/// are applied, then repayments (capped at the outstanding balance). At
/// maturity any remaining balance is repaid in full.
pub fn schedule_credit_line(
    line: &CreditLine,
    horizon: u32,
) -> Result<CreditSchedule, ProjectionError> {
    line.validate()?;

    let maturity = line.maturity_month();
    if maturity >= horizon {
        return Err(ProjectionError::BeyondHorizon {
            month: maturity,
            horizon,
        });
    }

    let monthly_rate = line.annual_rate / MONTHS_PER_YEAR;
    let mut balance = Decimal::ZERO;
    let mut drawn = Decimal::ZERO;
    let mut months = Vec::with_capacity(horizon as usize);
    let mut warnings = Vec::new();

    for month in 0..horizon {
        if month < line.start_month || month > maturity {
            months.push(CreditMonth {
                month,
                ..CreditMonth::default()
            });
            continue;
        }

        let opening = balance;
        let interest = round_money(opening * monthly_rate);
        let interest_paid = match line.interest_mode {
            InterestMode::Capitalized => {
                balance += interest;
                Decimal::ZERO
            }
            InterestMode::Paid => interest,
        };

        let drawdown = round_money(line.movements_in(month, MovementKind::Drawdown));
        drawn += drawdown;
        if drawn > line.limit {
            return Err(ProjectionError::CreditLimitExceeded {
                line: line.name.clone(),
                month,
            });
        }
        balance += drawdown;

        let requested = round_money(line.movements_in(month, MovementKind::Repayment));
        let mut repayment = requested.min(balance);
        if requested > balance {
            warnings.push(format!(
                "Credit line '{}': repayment of {requested} in month {month} capped at outstanding balance {balance}",
                line.name
            ));
        }

        if month == maturity && balance > repayment {
            repayment = balance;
        }
        balance -= repayment;

        months.push(CreditMonth {
            month,
            opening,
            drawdown,
            interest,
            interest_paid,
            repayment,
            closing: balance,
        });
    }

    let total_drawn = months.iter().map(|m| m.drawdown).sum();
    let total_interest = months.iter().map(|m| m.interest).sum();
    let total_interest_paid = months.iter().map(|m| m.interest_paid).sum();
    let total_repaid = months.iter().map(|m| m.repayment).sum();
    let peak_balance = months
        .iter()
        .map(|m| m.closing.max(m.opening + m.drawdown))
        .max()
        .unwrap_or(Decimal::ZERO);

    Ok(CreditSchedule {
        line_id: line.id,
        name: line.name.clone(),
        interest_mode: line.interest_mode,
        months,
        total_drawn,
        total_interest,
        total_interest_paid,
        total_repaid,
        peak_balance,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn movement(month: u32, kind: MovementKind, amount: Decimal) -> CreditMovement {
        CreditMovement {
            month,
            kind,
            amount,
        }
    }

    fn line(mode: InterestMode, movements: Vec<CreditMovement>) -> CreditLine {
        CreditLine {
            id: CreditLineId::new(),
            name: "Construction loan".to_string(),
            limit: dec!(100000),
            annual_rate: dec!(0.12),
            start_month: 0,
            term_months: 4,
            interest_mode: mode,
            movements,
        }
    }

    #[test]
    fn test_capitalized_interest_compounds() {
        let line = line(
            InterestMode::Capitalized,
            vec![movement(0, MovementKind::Drawdown, dec!(10000))],
        );
        let schedule = schedule_credit_line(&line, 4).unwrap();

        // 1% a month on the growing balance
        assert_eq!(schedule.months[0].closing, dec!(10000));
        assert_eq!(schedule.months[1].interest, dec!(100));
        assert_eq!(schedule.months[1].closing, dec!(10100));
        assert_eq!(schedule.months[2].interest, dec!(101));
        assert_eq!(schedule.months[2].closing, dec!(10201));
        assert_eq!(schedule.months[3].interest, dec!(102.01));
        // Balloon at maturity
        assert_eq!(schedule.months[3].repayment, dec!(10303.01));
        assert_eq!(schedule.months[3].closing, dec!(0));
        assert_eq!(schedule.total_interest, dec!(303.01));
        assert_eq!(schedule.total_interest_paid, dec!(0));
    }

    #[test]
    fn test_paid_interest_does_not_compound() {
        let line = line(
            InterestMode::Paid,
            vec![movement(0, MovementKind::Drawdown, dec!(10000))],
        );
        let schedule = schedule_credit_line(&line, 4).unwrap();

        assert_eq!(schedule.months[1].interest_paid, dec!(100));
        assert_eq!(schedule.months[2].interest_paid, dec!(100));
        assert_eq!(schedule.months[3].repayment, dec!(10000));
        assert_eq!(schedule.total_interest, dec!(300));
        assert_eq!(schedule.total_interest_paid, dec!(300));
    }

    #[test]
    fn test_repayment_capped_with_warning() {
        let line = line(
            InterestMode::Paid,
            vec![
                movement(0, MovementKind::Drawdown, dec!(1000)),
                movement(1, MovementKind::Repayment, dec!(5000)),
            ],
        );
        let schedule = schedule_credit_line(&line, 4).unwrap();

        assert_eq!(schedule.months[1].repayment, dec!(1000));
        assert_eq!(schedule.months[1].closing, dec!(0));
        assert_eq!(schedule.warnings.len(), 1);
    }

    #[test]
    fn test_limit_exceeded() {
        let line = line(
            InterestMode::Paid,
            vec![
                movement(0, MovementKind::Drawdown, dec!(60000)),
                movement(1, MovementKind::Drawdown, dec!(50000)),
            ],
        );
        let err = schedule_credit_line(&line, 4).unwrap_err();
        assert_eq!(
            err,
            ProjectionError::CreditLimitExceeded {
                line: "Construction loan".to_string(),
                month: 1
            }
        );
    }

    #[test]
    fn test_movement_before_start_rejected() {
        let mut line = line(
            InterestMode::Paid,
            vec![movement(0, MovementKind::Drawdown, dec!(100))],
        );
        line.start_month = 1;
        let err = schedule_credit_line(&line, 6).unwrap_err();
        assert!(matches!(err, ProjectionError::MovementBeforeStart { .. }));
    }

    #[test]
    fn test_movement_after_maturity_rejected() {
        let line = line(
            InterestMode::Paid,
            vec![movement(5, MovementKind::Drawdown, dec!(100))],
        );
        let err = schedule_credit_line(&line, 8).unwrap_err();
        assert!(matches!(
            err,
            ProjectionError::MovementAfterMaturity { maturity: 3, .. }
        ));
    }

    #[test]
    fn test_rows_outside_term_are_zero() {
        let mut line = line(
            InterestMode::Capitalized,
            vec![movement(2, MovementKind::Drawdown, dec!(500))],
        );
        line.start_month = 2;
        line.term_months = 2;
        let schedule = schedule_credit_line(&line, 6).unwrap();

        assert_eq!(schedule.months.len(), 6);
        assert_eq!(schedule.months[0], CreditMonth { month: 0, ..CreditMonth::default() });
        assert_eq!(schedule.months[3].repayment, dec!(505));
        assert_eq!(schedule.months[5].closing, dec!(0));
    }

    #[test]
    fn test_closing_balance_identity() {
        let line = line(
            InterestMode::Capitalized,
            vec![
                movement(0, MovementKind::Drawdown, dec!(20000)),
                movement(1, MovementKind::Drawdown, dec!(15000)),
                movement(2, MovementKind::Repayment, dec!(7000)),
            ],
        );
        let schedule = schedule_credit_line(&line, 4).unwrap();

        for m in &schedule.months {
            let capitalized = m.interest - m.interest_paid;
            assert_eq!(m.closing, m.opening + m.drawdown + capitalized - m.repayment);
            assert!(m.closing >= Decimal::ZERO);
        }
        assert_eq!(schedule.total_repaid, schedule.total_drawn + schedule.total_interest);
    }
}
