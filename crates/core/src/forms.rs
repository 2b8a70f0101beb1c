//! User-submitted forms and the business rules they must satisfy.
//!
//! Validation runs on the client before any request is sent, so the user
//! sees the failure immediately. The server re-validates everything.

use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use crate::types::{Email, EmailError, Role};

/// Minimum password length accepted at signup and password change.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Length of a Nigerian Bank Verification Number.
pub const BVN_LENGTH: usize = 11;

/// Length of a NUBAN bank account number.
pub const ACCOUNT_NUMBER_LENGTH: usize = 10;

/// A form field or business rule was violated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field was left blank.
    #[error("{0} is required")]
    Required(&'static str),

    /// The email address is not usable.
    #[error(transparent)]
    Email(#[from] EmailError),

    /// The password is shorter than [`MIN_PASSWORD_LENGTH`].
    #[error("Password must be at least {min} characters")]
    PasswordTooShort {
        /// Minimum length.
        min: usize,
    },

    /// Password and confirmation differ.
    #[error("Passwords do not match")]
    PasswordMismatch,

    /// The new password is the same as the current one.
    #[error("New password must be different from the current password")]
    PasswordUnchanged,

    /// Admin accounts cannot be created through signup.
    #[error("Cannot sign up as {0}")]
    RoleNotAllowed(Role),

    /// BVN is not exactly eleven digits.
    #[error("BVN must be exactly {} digits", BVN_LENGTH)]
    InvalidBvn,

    /// Account number is not exactly ten digits.
    #[error("Account number must be exactly {} digits", ACCOUNT_NUMBER_LENGTH)]
    InvalidAccountNumber,

    /// An amount that must be positive was zero or negative.
    #[error("Amount must be greater than zero")]
    NonPositiveAmount,

    /// A payout exceeds the seller's available balance.
    #[error("Amount exceeds available balance of {available}")]
    InsufficientBalance {
        /// Balance available for withdrawal.
        available: Decimal,
    },
}

fn require(value: &str, field: &'static str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required(field));
    }
    Ok(())
}

fn trim_in_place(value: &mut String) {
    let trimmed = value.trim();
    if trimmed.len() != value.len() {
        *value = trimmed.to_string();
    }
}

fn digits_only(value: &str, len: usize) -> bool {
    value.len() == len && value.bytes().all(|b| b.is_ascii_digit())
}

fn check_new_password(password: &str, confirm: &str) -> Result<(), ValidationError> {
    require(password, "Password")?;
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::PasswordTooShort {
            min: MIN_PASSWORD_LENGTH,
        });
    }
    if password != confirm {
        return Err(ValidationError::PasswordMismatch);
    }
    Ok(())
}

/// Account registration form.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupForm {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(skip)]
    pub confirm_password: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Token from the captcha widget, forwarded verbatim.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recaptcha_token: Option<String>,
}

impl SignupForm {
    /// Validate the form and normalize the email address in place.
    ///
    /// # Errors
    ///
    /// Returns the first rule the form violates.
    pub fn validate(&mut self) -> Result<(), ValidationError> {
        require(&self.name, "Name")?;
        self.email = Email::parse(&self.email)?.into_inner();
        check_new_password(&self.password, &self.confirm_password)?;
        if self.role == Role::Admin {
            return Err(ValidationError::RoleNotAllowed(self.role));
        }
        self.name = self.name.trim().to_string();
        Ok(())
    }
}

/// Password change form.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChangeForm {
    pub current_password: String,
    pub new_password: String,
    #[serde(skip)]
    pub confirm_password: String,
}

impl PasswordChangeForm {
    /// # Errors
    ///
    /// Returns the first rule the form violates.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require(&self.current_password, "Current password")?;
        check_new_password(&self.new_password, &self.confirm_password)?;
        if self.new_password == self.current_password {
            return Err(ValidationError::PasswordUnchanged);
        }
        Ok(())
    }
}

/// Destination bank account for seller payouts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BankAccount {
    pub bank_name: String,
    pub account_number: String,
    pub account_name: String,
}

impl BankAccount {
    /// Validate the account and trim its fields in place.
    ///
    /// # Errors
    ///
    /// Returns an error if a field is blank or the account number is not a
    /// ten-digit NUBAN.
    pub fn validate(&mut self) -> Result<(), ValidationError> {
        require(&self.bank_name, "Bank name")?;
        require(&self.account_name, "Account name")?;
        if !digits_only(self.account_number.trim(), ACCOUNT_NUMBER_LENGTH) {
            return Err(ValidationError::InvalidAccountNumber);
        }
        trim_in_place(&mut self.bank_name);
        trim_in_place(&mut self.account_name);
        trim_in_place(&mut self.account_number);
        Ok(())
    }
}

/// Seller KYC submission.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationForm {
    pub business_name: String,
    pub business_address: String,
    pub bvn: String,
    pub id_type: String,
    pub id_number: String,
    #[serde(flatten)]
    pub bank: BankAccount,
    /// URLs of uploaded business documents.
    pub documents: Vec<String>,
}

impl VerificationForm {
    /// Validate the form and trim its identifiers in place.
    ///
    /// # Errors
    ///
    /// Returns the first rule the form violates.
    pub fn validate(&mut self) -> Result<(), ValidationError> {
        require(&self.business_name, "Business name")?;
        require(&self.business_address, "Business address")?;
        if !digits_only(self.bvn.trim(), BVN_LENGTH) {
            return Err(ValidationError::InvalidBvn);
        }
        require(&self.id_type, "ID type")?;
        require(&self.id_number, "ID number")?;
        self.bank.validate()?;
        trim_in_place(&mut self.bvn);
        trim_in_place(&mut self.id_number);
        Ok(())
    }
}

/// A seller's request to withdraw part of their balance.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutRequest {
    pub amount: Decimal,
    #[serde(flatten)]
    pub bank: BankAccount,
}

impl PayoutRequest {
    /// Check the request against the seller's available balance.
    ///
    /// # Errors
    ///
    /// Returns an error if the amount is not positive, exceeds `available`,
    /// or the bank account is invalid.
    pub fn validate(&mut self, available: Decimal) -> Result<(), ValidationError> {
        if self.amount <= Decimal::ZERO {
            return Err(ValidationError::NonPositiveAmount);
        }
        if self.amount > available {
            return Err(ValidationError::InsufficientBalance { available });
        }
        self.bank.validate()
    }
}
