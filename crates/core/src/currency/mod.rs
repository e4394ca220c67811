//! Currency codes, exchange rates and base-currency conversion.

pub mod conversion;
pub mod exchange;

pub use conversion::{convert_amount, normalize_currency_code};
pub use exchange::ExchangeRate;
