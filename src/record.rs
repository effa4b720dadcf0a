//! Per-property rental records and their state transitions.
//!
//! Transitions are pure: the caller identity, the transferred value and the
//! current time (in seconds) are passed in explicitly, and a failed
//! transition leaves the record untouched.

use ink::prelude::string::String;
use ink::primitives::AccountId;

use crate::error::{RentalError, Result};

type Balance = <ink::env::DefaultEnvironment as ink::env::Environment>::Balance;

/// Longest property id accepted, in bytes. A stored record has to fit the
/// 16 KiB static buffer ink! encodes storage values into; the fixed fields
/// and the length prefix take well under 128 bytes of it.
pub const MAX_PROPERTY_ID_LEN: usize = 16 * 1024 - 128;

#[derive(scale::Decode, scale::Encode, Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(
    feature = "std",
    derive(scale_info::TypeInfo, ink::storage::traits::StorageLayout)
)]
#[repr(u8)]
pub enum RentalStatus {
    Pending = 0,
    Active = 1,
    Expired = 2,
    Late = 3,
}

/// Amount `pay_rent` accepts at a given moment.
#[derive(scale::Decode, scale::Encode, Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "std", derive(scale_info::TypeInfo))]
pub struct RentDue {
    pub amount: Balance,
    pub late: bool,
}

#[derive(scale::Decode, scale::Encode, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(
    feature = "std",
    derive(scale_info::TypeInfo, ink::storage::traits::StorageLayout)
)]
pub struct RentalRecord {
    pub property_id: String,
    pub tenant: AccountId,
    pub rent_amount: Balance,
    pub deposit_amount: Balance,
    pub late_fee: Balance,
    /// Seconds between due dates.
    pub rent_interval: u64,
    pub status: RentalStatus,
    pub start_time: u64,
    pub rent_due_date: u64,
    pub end_time: u64,
}

impl RentalRecord {
    /// Builds a `Pending` record, rejecting terms the later transitions
    /// could not honour.
    pub fn new(
        property_id: String,
        tenant: AccountId,
        rent_amount: Balance,
        deposit_amount: Balance,
        late_fee: Balance,
        rent_interval: u64,
    ) -> Result<Self> {
        if rent_interval == 0 || property_id.len() > MAX_PROPERTY_ID_LEN {
            return Err(RentalError::InvalidTerms);
        }
        rent_amount
            .checked_add(deposit_amount)
            .ok_or(RentalError::InvalidTerms)?;
        rent_amount
            .checked_add(late_fee)
            .ok_or(RentalError::InvalidTerms)?;

        Ok(Self {
            property_id,
            tenant,
            rent_amount,
            deposit_amount,
            late_fee,
            rent_interval,
            status: RentalStatus::Pending,
            start_time: 0,
            rent_due_date: 0,
            end_time: 0,
        })
    }

    /// First period's rent plus the deposit.
    pub fn activation_amount(&self) -> Balance {
        // Cannot saturate: checked in `new`.
        self.rent_amount.saturating_add(self.deposit_amount)
    }

    /// Active or Late: the record takes payments and can be ended.
    pub fn is_open(&self) -> bool {
        matches!(self.status, RentalStatus::Active | RentalStatus::Late)
    }

    /// Deposit the escrow must keep back for this record.
    pub fn held_deposit(&self) -> Balance {
        if self.is_open() {
            self.deposit_amount
        } else {
            0
        }
    }

    pub fn amount_due(&self, now: u64) -> Result<RentDue> {
        if !self.is_open() {
            return Err(RentalError::InvalidState);
        }

        if now > self.rent_due_date {
            Ok(RentDue {
                amount: self.rent_amount.saturating_add(self.late_fee),
                late: true,
            })
        } else {
            Ok(RentDue {
                amount: self.rent_amount,
                late: false,
            })
        }
    }

    pub fn activate(&mut self, caller: &AccountId, attached: Balance, now: u64) -> Result<()> {
        self.ensure_tenant(caller)?;
        if self.status != RentalStatus::Pending {
            return Err(RentalError::InvalidState);
        }
        if attached != self.activation_amount() {
            return Err(RentalError::IncorrectPayment);
        }
        let rent_due_date = now
            .checked_add(self.rent_interval)
            .ok_or(RentalError::ArithmeticOverflow)?;

        self.status = RentalStatus::Active;
        self.start_time = now;
        self.rent_due_date = rent_due_date;
        Ok(())
    }

    /// Accepts one period's rent. The next due date is always one interval
    /// past the previous one, however late the payment arrives.
    pub fn pay_rent(&mut self, caller: &AccountId, attached: Balance, now: u64) -> Result<RentDue> {
        self.ensure_tenant(caller)?;
        let due = self.amount_due(now)?;
        if attached != due.amount {
            return Err(RentalError::IncorrectPayment);
        }
        let rent_due_date = self
            .rent_due_date
            .checked_add(self.rent_interval)
            .ok_or(RentalError::ArithmeticOverflow)?;

        self.rent_due_date = rent_due_date;
        self.status = if due.late {
            RentalStatus::Late
        } else {
            RentalStatus::Active
        };
        Ok(due)
    }

    /// Terminates the agreement and returns the deposit owed to the tenant.
    pub fn end(&mut self, now: u64) -> Result<Balance> {
        if !self.is_open() {
            return Err(RentalError::InvalidState);
        }

        self.status = RentalStatus::Expired;
        self.end_time = now;
        Ok(self.deposit_amount)
    }

    fn ensure_tenant(&self, caller: &AccountId) -> Result<()> {
        if *caller != self.tenant {
            return Err(RentalError::Unauthorized);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY: u64 = 24 * 60 * 60;
    const UNIT: Balance = 1_000_000_000_000;
    const START: u64 = 1_700_000_000;

    fn tenant() -> AccountId {
        AccountId::from([0x02; 32])
    }

    fn stranger() -> AccountId {
        AccountId::from([0x03; 32])
    }

    fn pending() -> RentalRecord {
        RentalRecord::new(
            String::from("p1"),
            tenant(),
            UNIT,
            2 * UNIT,
            UNIT / 10,
            30 * DAY,
        )
        .unwrap()
    }

    fn active() -> RentalRecord {
        let mut record = pending();
        record.activate(&tenant(), 3 * UNIT, START).unwrap();
        record
    }

    #[test]
    fn new_record_is_pending_with_terms() {
        let record = pending();
        assert_eq!(record.status, RentalStatus::Pending);
        assert_eq!(record.rent_amount, UNIT);
        assert_eq!(record.deposit_amount, 2 * UNIT);
        assert_eq!(record.late_fee, UNIT / 10);
        assert_eq!(record.rent_interval, 30 * DAY);
        assert_eq!(
            (record.start_time, record.rent_due_date, record.end_time),
            (0, 0, 0)
        );
    }

    #[test]
    fn new_rejects_unusable_terms() {
        let zero_interval = RentalRecord::new(String::from("p"), tenant(), UNIT, UNIT, 0, 0);
        assert_eq!(zero_interval, Err(RentalError::InvalidTerms));

        let overflowing =
            RentalRecord::new(String::from("p"), tenant(), Balance::MAX, 1, 0, DAY);
        assert_eq!(overflowing, Err(RentalError::InvalidTerms));

        let overflowing_fee =
            RentalRecord::new(String::from("p"), tenant(), Balance::MAX, 0, 1, DAY);
        assert_eq!(overflowing_fee, Err(RentalError::InvalidTerms));

        let long_id = "x".repeat(MAX_PROPERTY_ID_LEN + 1);
        assert_eq!(
            RentalRecord::new(long_id, tenant(), UNIT, UNIT, 0, DAY),
            Err(RentalError::InvalidTerms)
        );
    }

    #[test]
    fn new_accepts_long_property_ids() {
        let id = "p".repeat(1024);
        let record = RentalRecord::new(id.clone(), tenant(), UNIT, UNIT, 0, DAY).unwrap();
        assert_eq!(record.property_id, id);
    }

    #[test]
    fn activation_sets_schedule() {
        let record = active();
        assert_eq!(record.status, RentalStatus::Active);
        assert_eq!(record.start_time, START);
        assert_eq!(record.rent_due_date, record.start_time + record.rent_interval);
    }

    #[test]
    fn activation_requires_exact_amount() {
        let mut record = pending();
        for attached in [0, 3 * UNIT - 1, 3 * UNIT + 1, UNIT] {
            assert_eq!(
                record.activate(&tenant(), attached, START),
                Err(RentalError::IncorrectPayment)
            );
        }
        assert_eq!(record, pending());
    }

    #[test]
    fn activation_checks_tenant_then_state() {
        let mut record = pending();
        assert_eq!(
            record.activate(&stranger(), 3 * UNIT, START),
            Err(RentalError::Unauthorized)
        );

        let mut record = active();
        assert_eq!(
            record.activate(&tenant(), 3 * UNIT, START + DAY),
            Err(RentalError::InvalidState)
        );
    }

    #[test]
    fn pending_record_takes_no_rent() {
        let mut record = pending();
        assert_eq!(
            record.pay_rent(&tenant(), UNIT, START),
            Err(RentalError::InvalidState)
        );
        assert_eq!(record.amount_due(START), Err(RentalError::InvalidState));
    }

    #[test]
    fn on_time_payment_advances_one_interval() {
        let mut record = active();
        let due_before = record.rent_due_date;
        let due = record.pay_rent(&tenant(), UNIT, START + 20 * DAY).unwrap();
        assert!(!due.late);
        assert_eq!(record.rent_due_date, due_before + 30 * DAY);
        assert_eq!(record.status, RentalStatus::Active);
    }

    #[test]
    fn payment_exactly_at_due_date_is_on_time() {
        let mut record = active();
        let at = record.rent_due_date;
        assert_eq!(record.amount_due(at).unwrap().late, false);
        record.pay_rent(&tenant(), UNIT, at).unwrap();
        assert_eq!(record.status, RentalStatus::Active);
    }

    #[test]
    fn late_payment_requires_fee_and_marks_late() {
        let mut record = active();
        let now = record.rent_due_date + 1;
        assert_eq!(
            record.pay_rent(&tenant(), UNIT, now),
            Err(RentalError::IncorrectPayment)
        );
        assert_eq!(record, active());

        let due = record.pay_rent(&tenant(), UNIT + UNIT / 10, now).unwrap();
        assert!(due.late);
        assert_eq!(record.status, RentalStatus::Late);
        assert_eq!(record.rent_due_date, START + 60 * DAY);
    }

    #[test]
    fn payment_rejects_inexact_amounts_on_both_branches() {
        let fee = UNIT / 10;
        let on_time = START + 20 * DAY;
        let late = START + 31 * DAY;
        let cases = [
            (on_time, UNIT - 1),
            (on_time, UNIT + 1),
            (on_time, UNIT + fee),
            (on_time, 0),
            (late, UNIT),
            (late, UNIT + fee - 1),
            (late, UNIT + fee + 1),
        ];

        for (now, attached) in cases {
            let mut record = active();
            assert_eq!(
                record.pay_rent(&tenant(), attached, now),
                Err(RentalError::IncorrectPayment)
            );
            assert_eq!(record, active());
        }
    }

    #[test]
    fn lump_late_payment_keeps_due_date_grid() {
        let mut record = active();
        // Three periods behind, still only one interval forward.
        let now = START + 95 * DAY;
        record.pay_rent(&tenant(), UNIT + UNIT / 10, now).unwrap();
        assert_eq!(record.rent_due_date, START + 60 * DAY);
        assert_eq!((record.rent_due_date - START) % (30 * DAY), 0);
    }

    // Assumes Late is a flag on the last payment, cleared by an on-time one.
    #[test]
    fn on_time_payment_clears_late_flag() {
        let mut record = active();
        record
            .pay_rent(&tenant(), UNIT + UNIT / 10, START + 31 * DAY)
            .unwrap();
        assert_eq!(record.status, RentalStatus::Late);

        record.pay_rent(&tenant(), UNIT, START + 50 * DAY).unwrap();
        assert_eq!(record.status, RentalStatus::Active);
    }

    #[test]
    fn only_tenant_pays() {
        let mut record = active();
        assert_eq!(
            record.pay_rent(&stranger(), UNIT, START + DAY),
            Err(RentalError::Unauthorized)
        );
    }

    #[test]
    fn due_date_overflow_is_reported() {
        let mut record =
            RentalRecord::new(String::from("p"), tenant(), UNIT, UNIT, 0, u64::MAX).unwrap();
        assert_eq!(
            record.activate(&tenant(), 2 * UNIT, 1),
            Err(RentalError::ArithmeticOverflow)
        );
        assert_eq!(record.status, RentalStatus::Pending);
    }

    #[test]
    fn end_releases_deposit_once() {
        let mut record = active();
        assert_eq!(record.held_deposit(), 2 * UNIT);
        assert_eq!(record.end(START + 40 * DAY), Ok(2 * UNIT));
        assert_eq!(record.status, RentalStatus::Expired);
        assert_eq!(record.end_time, START + 40 * DAY);
        assert_ne!(record.rent_due_date, 0);
        assert_eq!(record.held_deposit(), 0);

        assert_eq!(record.end(START + 41 * DAY), Err(RentalError::InvalidState));
        assert_eq!(record.end_time, START + 40 * DAY);
    }

    #[test]
    fn pending_record_cannot_end() {
        let mut record = pending();
        assert_eq!(record.end(START), Err(RentalError::InvalidState));
        assert_eq!(record.status, RentalStatus::Pending);
    }

    #[test]
    fn expired_record_rejects_everything() {
        let mut record = active();
        record.end(START + DAY).unwrap();
        assert_eq!(
            record.pay_rent(&tenant(), UNIT, START + 2 * DAY),
            Err(RentalError::InvalidState)
        );
        assert_eq!(
            record.activate(&tenant(), 3 * UNIT, START + 2 * DAY),
            Err(RentalError::InvalidState)
        );
    }

    #[test]
    fn status_codes_match_wire_order() {
        use scale::Encode;
        assert_eq!(RentalStatus::Pending.encode(), [0]);
        assert_eq!(RentalStatus::Active.encode(), [1]);
        assert_eq!(RentalStatus::Expired.encode(), [2]);
        assert_eq!(RentalStatus::Late.encode(), [3]);
    }
}
