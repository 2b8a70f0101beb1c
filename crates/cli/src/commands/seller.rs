//! Seller wallet and payout commands.

use rust_decimal::Decimal;

use cartify_client::Cartify;
use cartify_core::{BankAccount, Money, PayoutRequest, Role, commission, seller_earnings};

use super::{CommandError, require_session};

fn require_seller(cartify: &Cartify) -> Result<(), CommandError> {
    require_session(cartify)?;
    if cartify.auth().is_seller() {
        Ok(())
    } else {
        Err(CommandError::WrongRole(Role::Seller))
    }
}

/// Print the wallet and payout history.
pub async fn payouts(cartify: &Cartify) -> Result<(), CommandError> {
    require_seller(cartify)?;
    let seller = cartify.api().seller();
    let wallet = seller.wallet().await?;
    println!("Available: {}", Money::naira(wallet.balance));
    println!("Pending:   {}", Money::naira(wallet.pending));
    println!(
        "Earned:    {} (after {} platform commission)",
        Money::naira(seller_earnings(wallet.total_earned)),
        Money::naira(commission(wallet.total_earned))
    );

    for payout in seller.payouts().await? {
        println!(
            "{:<26} {:<9} {:>14}  {}",
            payout.id,
            payout.status,
            Money::naira(payout.amount),
            payout.reason.unwrap_or_default()
        );
    }
    Ok(())
}

pub async fn request_payout(
    cartify: &Cartify,
    amount: Decimal,
    bank: BankAccount,
) -> Result<(), CommandError> {
    require_seller(cartify)?;
    let request = PayoutRequest { amount, bank };
    let payout = cartify.api().seller().request_payout(request).await?;
    println!(
        "Payout {} requested for {} ({})",
        payout.id,
        Money::naira(payout.amount),
        payout.status
    );
    Ok(())
}
