use bigchain_core::types::PubKey;

/// The fixed federation membership a node consults for block voting.
/// Membership is captured per-block at creation time (`BlockBody::voters`)
/// rather than read live from here, so a block's election math never shifts
/// underneath it as the federation changes.
#[derive(Clone, Debug, Default)]
pub struct Federation {
    members: Vec<PubKey>,
}

impl Federation {
    pub fn new(members: Vec<PubKey>) -> Self {
        Federation { members }
    }

    pub fn members(&self) -> &[PubKey] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, member: &PubKey) -> bool {
        self.members.contains(member)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigchain_crypto::KeyPair;

    #[test]
    fn contains_checks_membership() {
        let a = KeyPair::generate();
        let b = KeyPair::generate();
        let federation = Federation::new(vec![a.public_key().clone()]);
        assert!(federation.contains(a.public_key()));
        assert!(!federation.contains(b.public_key()));
    }
}
