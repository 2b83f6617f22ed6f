use rust_decimal::Decimal;
use std::str::FromStr;

use fixedpronos_api::referral::available_balance;

fn dec(value: &str) -> Decimal {
    Decimal::from_str(value).expect("decimal literal")
}

#[test]
fn available_balance_subtracts_pending_withdrawals() {
    assert_eq!(available_balance(dec("100.00"), dec("60.00")), dec("40.00"));
    assert_eq!(available_balance(dec("100.00"), Decimal::ZERO), dec("100.00"));
}

#[test]
fn available_balance_never_goes_negative() {
    // Pending payouts can transiently exceed the balance; the reported
    // available balance still floors at zero.
    assert_eq!(available_balance(dec("10.00"), dec("15.00")), Decimal::ZERO);
    assert_eq!(available_balance(Decimal::ZERO, dec("1.00")), Decimal::ZERO);
}
