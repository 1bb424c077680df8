use crate::rate::Rate;

pub trait MessageFormatter: Send + Sync {
    fn subject(&self, rate: &Rate) -> String;

    fn body(&self, rate: &Rate) -> String;
}

/// `USD-UAH exchange rate` / `1 USD = 27.5 UAH`
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainRateFormatter;

impl MessageFormatter for PlainRateFormatter {
    fn subject(&self, rate: &Rate) -> String {
        format!("{}-{} exchange rate", rate.currency_from, rate.currency_to)
    }

    fn body(&self, rate: &Rate) -> String {
        format!(
            "1 {} = {} {}",
            rate.currency_from,
            rate.value.normalize(),
            rate.currency_to
        )
    }
}
