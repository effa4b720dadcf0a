#![cfg_attr(not(feature = "std"), no_std, no_main)]

pub mod error;
pub mod record;

pub use self::rental_agreement::{RentalAgreement, RentalAgreementRef};

#[ink::contract]
mod rental_agreement {
    use ink::prelude::string::String;
    use ink::prelude::vec::Vec;
    use ink::storage::Mapping;

    use crate::error::{RentalError, Result};
    use crate::record::{RentDue, RentalRecord};

    /// Block timestamps are milliseconds; rental schedules are kept in seconds.
    pub const MILLIS_PER_SECOND: u64 = 1_000;

    #[derive(scale::Decode, scale::Encode, Clone, Copy, PartialEq, Eq, Debug)]
    #[cfg_attr(
        feature = "std",
        derive(scale_info::TypeInfo, ink::storage::traits::StorageLayout)
    )]
    pub enum AuditAction {
        RentalCreated,
        RentalActivated,
        RentPaid,
        LateRentPaid,
        RentalEnded,
        RentCollected,
        Paused,
        Unpaused,
    }

    #[derive(scale::Decode, scale::Encode, Clone, PartialEq, Eq, Debug)]
    #[cfg_attr(
        feature = "std",
        derive(scale_info::TypeInfo, ink::storage::traits::StorageLayout)
    )]
    pub struct AuditLogEntry {
        pub caller: AccountId,
        /// Seconds.
        pub timestamp: u64,
        pub action: AuditAction,
        pub property_id: Option<String>,
        /// Value moved by the call, zero when none.
        pub amount: Balance,
    }

    #[ink(storage)]
    pub struct RentalAgreement {
        owner: AccountId,
        paused: bool,
        rentals: Mapping<String, RentalRecord>,
        /// Captured payments not yet released, per property.
        escrow: Mapping<String, Balance>,
        audit_log: Mapping<u64, AuditLogEntry>,
        audit_log_count: u64,
    }

    #[ink(event)]
    pub struct ContractCreated {
        #[ink(topic)]
        pub owner: AccountId,
    }

    #[ink(event)]
    pub struct ContractPaused {
        #[ink(topic)]
        pub by: AccountId,
    }

    #[ink(event)]
    pub struct ContractUnpaused {
        #[ink(topic)]
        pub by: AccountId,
    }

    #[ink(event)]
    pub struct RentalCreated {
        #[ink(topic)]
        pub property_id: String,
        #[ink(topic)]
        pub tenant: AccountId,
        pub rent_amount: Balance,
        pub deposit_amount: Balance,
    }

    #[ink(event)]
    pub struct RentalActivated {
        #[ink(topic)]
        pub property_id: String,
        #[ink(topic)]
        pub tenant: AccountId,
        pub start_time: u64,
        pub rent_due_date: u64,
    }

    #[ink(event)]
    pub struct RentPaid {
        #[ink(topic)]
        pub property_id: String,
        #[ink(topic)]
        pub tenant: AccountId,
        pub amount: Balance,
        pub late: bool,
        pub rent_due_date: u64,
    }

    #[ink(event)]
    pub struct RentalEnded {
        #[ink(topic)]
        pub property_id: String,
        #[ink(topic)]
        pub tenant: AccountId,
        pub deposit_refunded: Balance,
        pub end_time: u64,
    }

    #[ink(event)]
    pub struct RentCollected {
        #[ink(topic)]
        pub property_id: String,
        #[ink(topic)]
        pub owner: AccountId,
        pub amount: Balance,
    }

    impl RentalAgreement {
        #[ink(constructor)]
        pub fn new(paused: bool) -> Self {
            let caller = Self::env().caller();

            Self::env().emit_event(ContractCreated { owner: caller });

            Self {
                owner: caller,
                paused,
                rentals: Mapping::default(),
                escrow: Mapping::default(),
                audit_log: Mapping::default(),
                audit_log_count: 0,
            }
        }

        #[ink(constructor)]
        pub fn default() -> Self {
            Self::new(false)
        }

        #[ink(message)]
        pub fn get_owner(&self) -> AccountId {
            self.owner
        }

        #[ink(message)]
        pub fn is_paused(&self) -> bool {
            self.paused
        }

        /// Pausing only blocks `create_rental`; existing agreements keep running.
        #[ink(message)]
        pub fn set_paused(&mut self, paused: bool) -> Result<()> {
            let caller = self.ensure_owner()?;

            self.paused = paused;
            if paused {
                self.env().emit_event(ContractPaused { by: caller });
                self.log_action(AuditAction::Paused, None, 0);
            } else {
                self.env().emit_event(ContractUnpaused { by: caller });
                self.log_action(AuditAction::Unpaused, None, 0);
            }
            Ok(())
        }

        #[ink(message)]
        pub fn create_rental(
            &mut self,
            property_id: String,
            tenant: AccountId,
            rent_amount: Balance,
            deposit_amount: Balance,
            late_fee: Balance,
            rent_interval: u64,
        ) -> Result<()> {
            self.ensure_owner()?;
            if self.paused {
                return Err(RentalError::Paused);
            }

            let record = RentalRecord::new(
                property_id,
                tenant,
                rent_amount,
                deposit_amount,
                late_fee,
                rent_interval,
            )?;
            if self.rentals.contains(&record.property_id) {
                return Err(RentalError::DuplicateProperty);
            }

            self.rentals.insert(&record.property_id, &record);

            self.env().emit_event(RentalCreated {
                property_id: record.property_id.clone(),
                tenant,
                rent_amount,
                deposit_amount,
            });
            self.log_action(AuditAction::RentalCreated, Some(record.property_id), 0);
            Ok(())
        }

        /// Tenant pays first period's rent plus the deposit, exactly.
        #[ink(message, payable)]
        pub fn activate_rental(&mut self, property_id: String) -> Result<()> {
            let caller = self.env().caller();
            let attached = self.env().transferred_value();
            let now = self.now();

            let mut record = self.load(&property_id)?;
            record.activate(&caller, attached, now)?;
            let escrowed = self.escrow_after_payment(&property_id, attached)?;

            self.rentals.insert(&property_id, &record);
            self.escrow.insert(&property_id, &escrowed);

            self.env().emit_event(RentalActivated {
                property_id: property_id.clone(),
                tenant: caller,
                start_time: record.start_time,
                rent_due_date: record.rent_due_date,
            });
            self.log_action(AuditAction::RentalActivated, Some(property_id), attached);
            Ok(())
        }

        /// Tenant pays one period: the rent, plus the late fee once the due
        /// date has passed.
        #[ink(message, payable)]
        pub fn pay_rent(&mut self, property_id: String) -> Result<()> {
            let caller = self.env().caller();
            let attached = self.env().transferred_value();
            let now = self.now();

            let mut record = self.load(&property_id)?;
            let due = record.pay_rent(&caller, attached, now)?;
            let escrowed = self.escrow_after_payment(&property_id, attached)?;

            self.rentals.insert(&property_id, &record);
            self.escrow.insert(&property_id, &escrowed);

            self.env().emit_event(RentPaid {
                property_id: property_id.clone(),
                tenant: caller,
                amount: due.amount,
                late: due.late,
                rent_due_date: record.rent_due_date,
            });
            let action = if due.late {
                AuditAction::LateRentPaid
            } else {
                AuditAction::RentPaid
            };
            self.log_action(action, Some(property_id), attached);
            Ok(())
        }

        /// Terminates the agreement and refunds the full deposit to the tenant.
        #[ink(message)]
        pub fn end_rental(&mut self, property_id: String) -> Result<()> {
            let mut record = self.load(&property_id)?;
            self.ensure_owner()?;

            let deposit = record.end(self.now())?;
            let remaining = self
                .escrow_balance(property_id.clone())
                .checked_sub(deposit)
                .ok_or(RentalError::TransferFailed)?;

            if deposit > 0 {
                self.env()
                    .transfer(record.tenant, deposit)
                    .map_err(|_| RentalError::TransferFailed)?;
            }

            self.rentals.insert(&property_id, &record);
            self.escrow.insert(&property_id, &remaining);

            self.env().emit_event(RentalEnded {
                property_id: property_id.clone(),
                tenant: record.tenant,
                deposit_refunded: deposit,
                end_time: record.end_time,
            });
            self.log_action(AuditAction::RentalEnded, Some(property_id), deposit);
            Ok(())
        }

        /// Releases accrued rent to the owner, keeping back the deposit of a
        /// running agreement. Returns the amount released.
        #[ink(message)]
        pub fn collect_rent(&mut self, property_id: String) -> Result<Balance> {
            let record = self.load(&property_id)?;
            let owner = self.ensure_owner()?;

            let escrowed = self.escrow_balance(property_id.clone());
            let held = record.held_deposit();
            let amount = escrowed.saturating_sub(held);
            if amount == 0 {
                return Ok(0);
            }

            self.env()
                .transfer(owner, amount)
                .map_err(|_| RentalError::TransferFailed)?;
            self.escrow.insert(&property_id, &held);

            self.env().emit_event(RentCollected {
                property_id: property_id.clone(),
                owner,
                amount,
            });
            self.log_action(AuditAction::RentCollected, Some(property_id), amount);
            Ok(amount)
        }

        #[ink(message)]
        pub fn get_deposit(&self, property_id: String) -> Result<Balance> {
            self.load(&property_id).map(|record| record.deposit_amount)
        }

        #[ink(message)]
        pub fn rentals(&self, property_id: String) -> Option<RentalRecord> {
            self.rentals.get(&property_id)
        }

        /// What `pay_rent` would accept in the current block.
        #[ink(message)]
        pub fn amount_due(&self, property_id: String) -> Result<RentDue> {
            self.load(&property_id)?.amount_due(self.now())
        }

        #[ink(message)]
        pub fn escrow_balance(&self, property_id: String) -> Balance {
            self.escrow.get(&property_id).unwrap_or_default()
        }

        fn load(&self, property_id: &String) -> Result<RentalRecord> {
            self.rentals.get(property_id).ok_or(RentalError::NotFound)
        }

        fn ensure_owner(&self) -> Result<AccountId> {
            let caller = self.env().caller();
            if caller != self.owner {
                return Err(RentalError::Unauthorized);
            }
            Ok(caller)
        }

        fn now(&self) -> u64 {
            self.env().block_timestamp() / MILLIS_PER_SECOND
        }

        fn escrow_after_payment(&self, property_id: &String, attached: Balance) -> Result<Balance> {
            self.escrow
                .get(property_id)
                .unwrap_or_default()
                .checked_add(attached)
                .ok_or(RentalError::ArithmeticOverflow)
        }

        // === AUDIT LOG FUNCTIONALITY ===

        fn log_action(&mut self, action: AuditAction, property_id: Option<String>, amount: Balance) {
            let log_entry = AuditLogEntry {
                caller: self.env().caller(),
                timestamp: self.now(),
                action,
                property_id,
                amount,
            };

            // Store with current count as index, then increment
            self.audit_log.insert(self.audit_log_count, &log_entry);
            self.audit_log_count = self.audit_log_count.saturating_add(1);
        }

        #[ink(message)]
        pub fn get_audit_log_count(&self) -> u64 {
            self.audit_log_count
        }

        #[ink(message)]
        pub fn get_audit_log(&self, start: u64, limit: u64) -> Vec<AuditLogEntry> {
            let mut entries = Vec::new();
            let end = start.saturating_add(limit).min(self.audit_log_count);

            for i in start..end {
                if let Some(entry) = self.audit_log.get(i) {
                    entries.push(entry);
                }
            }

            entries
        }

        /// Entries touching `property_id`, scanning from index `start`.
        #[ink(message)]
        pub fn get_audit_log_for_property(
            &self,
            property_id: String,
            start: u64,
            limit: u64,
        ) -> Vec<AuditLogEntry> {
            let mut entries = Vec::new();
            let mut count = 0u64;

            for i in start..self.audit_log_count {
                if count >= limit {
                    break;
                }
                if let Some(entry) = self.audit_log.get(i) {
                    if entry.property_id.as_ref() == Some(&property_id) {
                        entries.push(entry);
                        count = count.saturating_add(1);
                    }
                }
            }

            entries
        }
    }


}
