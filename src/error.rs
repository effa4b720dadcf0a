//! Failures returned by the rental ledger's messages.

#[derive(Debug, Clone, Copy, PartialEq, Eq, scale::Encode, scale::Decode)]
#[cfg_attr(feature = "std", derive(scale_info::TypeInfo))]
pub enum RentalError {
    /// Caller lacks the role the message requires.
    Unauthorized,
    /// New agreements cannot be created while the ledger is paused.
    Paused,
    /// No rental exists for the property id.
    NotFound,
    /// A rental already exists for the property id.
    DuplicateProperty,
    /// The message is not valid for the rental's current status.
    InvalidState,
    /// Transferred value differs from the exact amount required.
    IncorrectPayment,
    /// Rental terms are unusable (zero interval, overflowing totals, oversized id).
    InvalidTerms,
    /// A due date would move past the end of the timestamp range.
    ArithmeticOverflow,
    /// The runtime rejected an escrow release.
    TransferFailed,
}

pub type Result<T> = core::result::Result<T, RentalError>;
