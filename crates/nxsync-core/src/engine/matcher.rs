//! Resource Matcher
//!
//! Binds declared identity keys to enumerated instances by exact key
//! equality. A key with no instance maps to `None`: the entity does not
//! exist yet, which is not an error.

use std::collections::{BTreeMap, BTreeSet};

use super::enumerator::Instance;
use crate::entity::Entity;

pub fn match_instances<E: Entity>(
    desired: &BTreeSet<E::Key>,
    existing: Vec<Instance<E>>,
) -> BTreeMap<E::Key, Option<Instance<E>>> {
    let mut by_key: BTreeMap<E::Key, Instance<E>> = existing
        .into_iter()
        .map(|instance| (instance.key().clone(), instance))
        .collect();

    desired
        .iter()
        .map(|key| (key.clone(), by_key.remove(key)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Ace, AceKey, Afi};
    use crate::model::CurrentState;
    use crate::traits::EntityHandle;

    fn instance(key: AceKey, token: u64) -> Instance<Ace> {
        Instance {
            handle: EntityHandle::new(key, token),
            state: CurrentState::present(Default::default()),
        }
    }

    #[test]
    fn test_exact_key_matching() {
        let web_10 = AceKey::new(Afi::Ipv4, "web_in", 10);
        let web_20 = AceKey::new(Afi::Ipv4, "web_in", 20);
        let v6_web_10 = AceKey::new(Afi::Ipv6, "web_in", 10);

        let desired: BTreeSet<AceKey> = [web_10.clone(), v6_web_10.clone()].into();
        let matched = match_instances(&desired, vec![instance(web_20, 1), instance(web_10.clone(), 2)]);

        assert_eq!(matched.len(), 2);
        assert_eq!(matched[&web_10].as_ref().map(|i| i.handle.token()), Some(2));
        assert!(matched[&v6_web_10].is_none());
    }
}
