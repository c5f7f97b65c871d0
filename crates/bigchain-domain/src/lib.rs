pub mod asset;
pub mod currency;

pub use asset::{owned_assets, AssetLedger};
pub use currency::{CurrencyLedger, LastCurrency};
