pub mod durability;
pub mod store;

pub use durability::Durability;
pub use store::StoreAdapter;
