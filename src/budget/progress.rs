//! How much of a budget has been spent in its current window.

use rust_decimal::Decimal;
use serde::Serialize;
use time::{Date, Duration, Month};

use crate::{
    EntryType,
    budget::{Budget, BudgetPeriod},
    transaction::Transaction,
};

/// The spending levels, in percent of the budget amount, that raise an alert.
pub const ALERT_THRESHOLDS: [u32; 2] = [80, 100];

/// The inclusive range of days that count towards a budget right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetWindow {
    /// The first day of the window.
    pub start: Date,
    /// The last day of the window.
    pub end: Date,
}

impl BudgetWindow {
    /// Whether `date` falls inside the window.
    pub fn contains(&self, date: Date) -> bool {
        self.start <= date && date <= self.end
    }
}

/// A budget's spending in its current window.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetProgress {
    /// The days being counted.
    pub window: BudgetWindow,
    /// The total of the category's expenses in the window.
    pub spent: Decimal,
    /// `amount - spent`, negative once the budget is exceeded.
    pub remaining: Decimal,
    /// `spent / amount * 100`, rounded to two decimal places.
    pub percentage: Decimal,
    /// The thresholds from [ALERT_THRESHOLDS] that `percentage` has reached.
    pub alerts: Vec<u32>,
}

fn days_in_month(year: i32, month: Month) -> u8 {
    match month {
        Month::February if time::util::is_leap_year(year) => 29,
        Month::February => 28,
        Month::April | Month::June | Month::September | Month::November => 30,
        _ => 31,
    }
}

/// Add whole months to `date`, clamping the day to the end of shorter months.
///
/// Saturates at [Date::MAX] if the result is out of range.
fn add_months(date: Date, months: i64) -> Date {
    let total = date.year() as i64 * 12 + (date.month() as i64 - 1) + months;

    let Ok(year) = i32::try_from(total.div_euclid(12)) else {
        return Date::MAX;
    };
    let Ok(month) = Month::try_from(total.rem_euclid(12) as u8 + 1) else {
        return Date::MAX;
    };
    let day = date.day().min(days_in_month(year, month));

    Date::from_calendar_date(year, month, day).unwrap_or(Date::MAX)
}

fn add_days(date: Date, days: i64) -> Date {
    date.checked_add(Duration::days(days)).unwrap_or(Date::MAX)
}

fn months_between(start: Date, end: Date) -> i64 {
    let months = (end.year() as i64 - start.year() as i64) * 12
        + (end.month() as i64 - start.month() as i64);

    if add_months(start, months) > end {
        months - 1
    } else {
        months
    }
}

/// The window of `budget` that counts as current on `today`.
///
/// Custom budgets have a single window from the start date to the end date.
/// Recurring budgets step forward from the start date one period at a time;
/// the window is the step containing `today`, the first step if the budget
/// has not started, or the last step if it has ended. Windows never extend
/// past the end date.
pub fn current_window(budget: &Budget, today: Date) -> BudgetWindow {
    let start_date = budget.start_date;
    let end_date = budget.end_date.unwrap_or(Date::MAX);
    let reference = today.clamp(start_date, end_date.max(start_date));
    let elapsed_days = (reference - start_date).whole_days();

    let (start, end) = match budget.period {
        BudgetPeriod::Custom => (start_date, end_date),
        BudgetPeriod::Daily => (reference, reference),
        BudgetPeriod::Weekly => {
            let start = add_days(start_date, elapsed_days - elapsed_days % 7);
            (start, add_days(start, 6))
        }
        BudgetPeriod::Monthly => {
            let steps = months_between(start_date, reference);
            (
                add_months(start_date, steps),
                add_days(add_months(start_date, steps + 1), -1),
            )
        }
        BudgetPeriod::Yearly => {
            let steps = months_between(start_date, reference) / 12;
            (
                add_months(start_date, steps * 12),
                add_days(add_months(start_date, (steps + 1) * 12), -1),
            )
        }
    };

    BudgetWindow {
        start,
        end: end.min(end_date),
    }
}

/// Work out how much of `budget` has been spent on `today`.
///
/// Only `transactions` that are expenses in the budget's category and dated
/// inside [current_window] are counted, so callers may pass a superset.
pub fn compute_progress(budget: &Budget, transactions: &[Transaction], today: Date) -> BudgetProgress {
    let window = current_window(budget, today);

    let spent: Decimal = transactions
        .iter()
        .filter(|transaction| {
            transaction.category_id == budget.category_id
                && transaction.transaction_type == EntryType::Expense
                && window.contains(transaction.date)
        })
        .fold(Decimal::ZERO, |spent, transaction| {
            spent.saturating_add(transaction.amount.value())
        });

    let amount = budget.amount.value();
    // Saturates rather than panics for stored amounts beyond `Decimal`'s range.
    let percentage = if amount.is_zero() {
        Decimal::ZERO
    } else {
        spent
            .checked_div(amount)
            .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
            .unwrap_or(Decimal::MAX)
            .round_dp(2)
    };

    let alerts = ALERT_THRESHOLDS
        .into_iter()
        .filter(|threshold| percentage >= Decimal::from(*threshold))
        .collect();

    BudgetProgress {
        window,
        spent,
        remaining: amount.saturating_sub(spent),
        percentage,
        alerts,
    }
}

#[cfg(test)]
mod window_tests {
    use rust_decimal::Decimal;
    use time::{Date, macros::date};

    use crate::{
        amount::Amount,
        budget::{Budget, BudgetPeriod, BudgetWindow, current_window},
    };

    fn budget(period: BudgetPeriod, start_date: Date, end_date: Option<Date>) -> Budget {
        Budget {
            id: 1,
            category_id: 1,
            amount: Amount::new_unchecked(Decimal::ONE_HUNDRED),
            period,
            start_date,
            end_date,
        }
    }

    #[track_caller]
    fn assert_window(budget: &Budget, today: Date, start: Date, end: Date) {
        assert_eq!(current_window(budget, today), BudgetWindow { start, end });
    }

    #[test]
    fn custom_window_spans_start_to_end() {
        let budget = budget(
            BudgetPeriod::Custom,
            date!(2025 - 03 - 10),
            Some(date!(2025 - 04 - 20)),
        );

        assert_window(&budget, date!(2025 - 01 - 01), date!(2025 - 03 - 10), date!(2025 - 04 - 20));
        assert_window(&budget, date!(2025 - 04 - 01), date!(2025 - 03 - 10), date!(2025 - 04 - 20));
    }

    #[test]
    fn daily_window_is_today() {
        let budget = budget(BudgetPeriod::Daily, date!(2025 - 01 - 01), None);

        assert_window(&budget, date!(2025 - 06 - 15), date!(2025 - 06 - 15), date!(2025 - 06 - 15));
    }

    #[test]
    fn weekly_window_counts_from_start_date() {
        // 2025-01-01 is a Wednesday, so weeks run Wednesday to Tuesday.
        let budget = budget(BudgetPeriod::Weekly, date!(2025 - 01 - 01), None);

        assert_window(&budget, date!(2025 - 01 - 01), date!(2025 - 01 - 01), date!(2025 - 01 - 07));
        assert_window(&budget, date!(2025 - 01 - 08), date!(2025 - 01 - 08), date!(2025 - 01 - 14));
        assert_window(&budget, date!(2025 - 01 - 20), date!(2025 - 01 - 15), date!(2025 - 01 - 21));
    }

    #[test]
    fn monthly_window_follows_start_day() {
        let budget = budget(BudgetPeriod::Monthly, date!(2025 - 01 - 15), None);

        assert_window(&budget, date!(2025 - 03 - 14), date!(2025 - 02 - 15), date!(2025 - 03 - 14));
        assert_window(&budget, date!(2025 - 03 - 15), date!(2025 - 03 - 15), date!(2025 - 04 - 14));
    }

    #[test]
    fn monthly_window_on_first_is_calendar_month() {
        let budget = budget(BudgetPeriod::Monthly, date!(2024 - 01 - 01), None);

        assert_window(&budget, date!(2024 - 02 - 10), date!(2024 - 02 - 01), date!(2024 - 02 - 29));
    }

    #[test]
    fn monthly_window_clamps_short_months() {
        let budget = budget(BudgetPeriod::Monthly, date!(2025 - 01 - 31), None);

        assert_window(&budget, date!(2025 - 02 - 28), date!(2025 - 02 - 28), date!(2025 - 03 - 30));
    }

    #[test]
    fn yearly_window_spans_twelve_months() {
        let budget = budget(BudgetPeriod::Yearly, date!(2024 - 07 - 01), None);

        assert_window(&budget, date!(2025 - 06 - 30), date!(2024 - 07 - 01), date!(2025 - 06 - 30));
        assert_window(&budget, date!(2025 - 07 - 01), date!(2025 - 07 - 01), date!(2026 - 06 - 30));
    }

    #[test]
    fn window_before_start_is_first_period() {
        let budget = budget(BudgetPeriod::Monthly, date!(2025 - 05 - 01), None);

        assert_window(&budget, date!(2025 - 01 - 01), date!(2025 - 05 - 01), date!(2025 - 05 - 31));
    }

    #[test]
    fn window_is_clipped_to_end_date() {
        let budget = budget(
            BudgetPeriod::Monthly,
            date!(2025 - 01 - 01),
            Some(date!(2025 - 03 - 10)),
        );

        assert_window(&budget, date!(2025 - 03 - 05), date!(2025 - 03 - 01), date!(2025 - 03 - 10));
        // Ended budgets report their final window.
        assert_window(&budget, date!(2025 - 12 - 25), date!(2025 - 03 - 01), date!(2025 - 03 - 10));
    }
}
