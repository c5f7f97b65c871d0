/// Where a transaction stands, derived from the election status of the
/// block(s) that contain it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransactionStatus {
    Valid,
    Undecided,
}
