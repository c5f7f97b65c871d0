pub mod builder;
pub mod sign;
pub mod submit;
pub mod validate;

pub use builder::create_transaction;
pub use sign::{sign_transaction, verify_transaction_signatures};
pub use submit::{pick_assignee, submit_transaction};
pub use validate::{
    is_valid_transaction, validate_fulfillments, validate_transaction,
    validate_transaction_structure, InputResolver,
};
