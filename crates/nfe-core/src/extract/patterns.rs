//! Common regex patterns for receipt field extraction.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Registration codes
    pub static ref NATIONAL_REGISTRATION: Regex =
        Regex::new(r"^\d\d\.\d{3}\.\d{3}/\d{4}-\d{2}$").unwrap();

    pub static ref STATE_REGISTRATION: Regex = Regex::new(r"^\d+$").unwrap();

    // DD/MM/YYYY HH:MM:SS
    pub static ref DATE_TIME: Regex =
        Regex::new(r"\d{2}/\d{2}/\d{4} \d{2}:\d{2}:\d{2}").unwrap();

    // Locale-formatted amount, optionally with a thousands separator
    // (1.234,56 / 17,00 / 3)
    pub static ref AMOUNT: Regex = Regex::new(r"(\d+\.)?(\d+,)?\d+").unwrap();

    pub static ref DIGITS: Regex = Regex::new(r"\d+").unwrap();

    // Address scrubbing
    pub static ref ADDRESS_PLACEHOLDER_SEGMENT: Regex = Regex::new(r", +0,").unwrap();
    pub static ref ADDRESS_BLANK_SEGMENT: Regex = Regex::new(r",\s+,").unwrap();

    // Payment vocabulary. The single dots cover the accented variants
    // the portal emits (cartão/cartao, débito, alimentação).
    pub static ref CREDIT_CARD: Regex = Regex::new(r"(?i)cart.o de cr.dito").unwrap();
    pub static ref DEBIT_CARD: Regex = Regex::new(r"(?i)cart.o de d.bito").unwrap();
    pub static ref MONEY: Regex = Regex::new(r"(?i)dinheiro").unwrap();
    pub static ref FOOD_VOUCHER: Regex = Regex::new(r"(?i)vale alimenta..o").unwrap();
    pub static ref OTHER_PAYMENT: Regex = Regex::new(r"(?i)^outros").unwrap();
}
