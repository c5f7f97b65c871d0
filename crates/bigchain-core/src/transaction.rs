use serde::{Deserialize, Serialize};

use crate::payload::Payload;
use crate::types::{Cid, Fid, PubKey, Signature, Timestamp, TxId, TxInput};

/// The operation a transaction performs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    Create,
    Transfer,
    Genesis,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "CREATE",
            Operation::Transfer => "TRANSFER",
            Operation::Genesis => "GENESIS",
        }
    }

    pub fn requires_input(&self) -> bool {
        matches!(self, Operation::Transfer)
    }
}

/// The ownership predicate attached to a condition. Single-signature
/// ownership is `new_owners.len() == 1` matching `public_key` directly;
/// multi-signature ownership is expressed recursively through nested
/// `subconditions`, each of which may itself carry a `public_key` or further
/// nest — mirroring the recursive capability structure condition.details
/// takes in the source ledger.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConditionDetails {
    pub public_key: Option<PubKey>,
    #[serde(default)]
    pub subconditions: Vec<ConditionDetails>,
}

impl ConditionDetails {
    pub fn single(public_key: PubKey) -> Self {
        Self {
            public_key: Some(public_key),
            subconditions: Vec::new(),
        }
    }

    /// Whether `owner` appears anywhere in this condition's ownership tree.
    pub fn has_owner(&self, owner: &PubKey) -> bool {
        if self.public_key.as_ref() == Some(owner) {
            return true;
        }
        self.subconditions.iter().any(|sub| sub.has_owner(owner))
    }
}

/// A spendable output. `cid` is a position index unique within the
/// transaction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub cid: Cid,
    pub new_owners: Vec<PubKey>,
    pub condition: ConditionBody,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConditionBody {
    pub details: ConditionDetails,
}

impl Condition {
    pub fn single_sig(cid: Cid, owner: PubKey) -> Self {
        Condition {
            cid,
            new_owners: vec![owner.clone()],
            condition: ConditionBody {
                details: ConditionDetails::single(owner),
            },
        }
    }

    /// Whether `owner` owns this output, resolved symmetrically for both
    /// the single-owner and multi-owner cases (see the design note on
    /// `condition_owned_by` in the query layer).
    pub fn owned_by(&self, owner: &PubKey) -> bool {
        crate::condition_owned_by(self, owner)
    }
}

/// Proof of the right to spend a referenced input. `input = None` only for
/// `CREATE`/`GENESIS` transactions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Fulfillment {
    pub fid: Fid,
    pub current_owners: Vec<PubKey>,
    pub input: Option<TxInput>,
    /// One signature per `current_owners` entry, in the same order. `None`
    /// before the transaction is signed.
    pub fulfillment: Option<Vec<Signature>>,
}

impl Fulfillment {
    pub fn unsigned(fid: Fid, current_owners: Vec<PubKey>, input: Option<TxInput>) -> Self {
        Fulfillment {
            fid,
            current_owners,
            input,
            fulfillment: None,
        }
    }
}

/// The part of a transaction that carries the domain payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransactionData {
    pub payload: Payload,
    pub uuid: String,
}

/// The structural body of a transaction, hashed (minus fulfillment
/// signatures) to produce `id`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransactionBody {
    pub fulfillments: Vec<Fulfillment>,
    pub conditions: Vec<Condition>,
    pub operation: Operation,
    pub timestamp: Timestamp,
    pub data: TransactionData,
}

/// A fully-formed transaction as stored in `bigchain`. When staged in
/// `backlog` it additionally carries an `assignee` — see
/// [`BacklogTransaction`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TxId,
    pub transaction: TransactionBody,
}

impl Transaction {
    /// The body view used for hashing and signing: identical to
    /// `transaction` but with every fulfillment's signature cleared. The
    /// id is computed over this view, and it stays stable across signing
    /// because signatures are layered on afterward.
    pub fn signable_body(&self) -> TransactionBody {
        let mut body = self.transaction.clone();
        for f in &mut body.fulfillments {
            f.fulfillment = None;
        }
        body
    }
}

/// A transaction staged in the `backlog` collection, carrying the node that
/// is responsible for proposing it into a block.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BacklogTransaction {
    pub id: TxId,
    pub transaction: TransactionBody,
    pub assignee: PubKey,
}

impl BacklogTransaction {
    pub fn from_transaction(tx: Transaction, assignee: PubKey) -> Self {
        BacklogTransaction {
            id: tx.id,
            transaction: tx.transaction,
            assignee,
        }
    }

    pub fn into_transaction(self) -> Transaction {
        Transaction {
            id: self.id,
            transaction: self.transaction,
        }
    }

    pub fn as_transaction(&self) -> Transaction {
        Transaction {
            id: self.id.clone(),
            transaction: self.transaction.clone(),
        }
    }
}
