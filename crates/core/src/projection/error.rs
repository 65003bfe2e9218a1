//! Projection error types.

use rust_decimal::Decimal;
use thiserror::Error;

/// Projection-related errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProjectionError {
    /// Project duration outside the accepted range.
    #[error("Project duration must be between 1 and {max} months")]
    InvalidProjectDuration {
        /// Largest accepted duration.
        max: u32,
    },

    /// Discount rate outside 0..=1.
    #[error("Discount rate must be between 0 and 1")]
    InvalidDiscountRate,

    /// A monetary input is negative.
    #[error("Amount cannot be negative: {0}")]
    NegativeAmount(String),

    /// A phased cost item spans zero months.
    #[error("Cost item '{0}' must span at least one month")]
    InvalidDuration(String),

    /// Custom distribution percentages do not add up to 100.
    #[error("Custom distribution for '{item}' sums to {sum}, expected 100")]
    InvalidDistribution {
        /// Cost item description.
        item: String,
        /// Actual sum of the percentages.
        sum: Decimal,
    },

    /// Interest rate outside 0..=1.
    #[error("Interest rate for credit line '{0}' must be between 0 and 1")]
    InvalidInterestRate(String),

    /// Credit line term of zero months.
    #[error("Credit line '{0}' must have a term of at least one month")]
    InvalidTerm(String),

    /// Drawdowns exceed the credit limit.
    #[error("Credit line '{line}' exceeds its limit in month {month}")]
    CreditLimitExceeded {
        /// Credit line name.
        line: String,
        /// Month in which the limit was exceeded.
        month: u32,
    },

    /// Movement scheduled before the credit line opens.
    #[error("Credit line '{line}' has a movement in month {month} before its start month {start}")]
    MovementBeforeStart {
        /// Credit line name.
        line: String,
        /// Month of the offending movement.
        month: u32,
        /// First month of the line.
        start: u32,
    },

    /// Movement scheduled after the credit line matured.
    #[error("Credit line '{line}' has a movement in month {month} after its maturity month {maturity}")]
    MovementAfterMaturity {
        /// Credit line name.
        line: String,
        /// Month of the offending movement.
        month: u32,
        /// Maturity month of the line.
        maturity: u32,
    },

    /// Percentage outside 0..=100.
    #[error("Percentage for {0} must be between 0 and 100")]
    InvalidPercentage(String),

    /// Sales pace of zero with unsold units.
    #[error("Absorption must be at least one unit per month when unsold units exist")]
    InvalidAbsorption,

    /// Horizon exceeds the configured maximum.
    #[error("Projection horizon of {horizon} months exceeds the maximum of {max}")]
    HorizonTooLong {
        /// Required horizon.
        horizon: u32,
        /// Configured maximum.
        max: u32,
    },

    /// A scheduled amount falls outside the horizon passed in.
    #[error("Month {month} is beyond the projection horizon of {horizon} months")]
    BeyondHorizon {
        /// Offending month.
        month: u32,
        /// Horizon length.
        horizon: u32,
    },
}
