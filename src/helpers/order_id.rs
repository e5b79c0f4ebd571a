use chrono::{DateTime, Utc};
use rand::{distributions::Alphanumeric, Rng};

use crate::db_types::OrderId;

const ORDER_ID_PREFIX: &str = "CS";
const SUFFIX_LEN: usize = 6;

/// Generates a new externally-visible order identifier of the form `CS-20260810-7XK2QD`.
///
/// The date stamp makes identifiers human-auditable; the random alphanumeric suffix makes collisions between orders
/// created on the same day vanishingly unlikely. Uniqueness is ultimately enforced by the unique constraint on
/// `orders.order_id`; callers retry with a fresh identifier if that constraint ever trips.
pub fn new_order_id(now: DateTime<Utc>) -> OrderId {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SUFFIX_LEN)
        .map(char::from)
        .collect::<String>()
        .to_uppercase();
    OrderId(format!("{ORDER_ID_PREFIX}-{}-{suffix}", now.format("%Y%m%d")))
}

#[cfg(test)]
mod test {
    use std::collections::HashSet;

    use chrono::{TimeZone, Utc};

    use super::*;

    #[test]
    fn order_ids_carry_the_creation_date() {
        let date = Utc.with_ymd_and_hms(2026, 8, 10, 12, 0, 0).unwrap();
        let id = new_order_id(date);
        assert!(id.as_str().starts_with("CS-20260810-"));
        assert_eq!(id.as_str().len(), "CS-20260810-".len() + SUFFIX_LEN);
        let suffix = &id.as_str()["CS-20260810-".len()..];
        assert!(suffix.chars().all(|c| c.is_ascii_alphanumeric() && !c.is_ascii_lowercase()));
    }

    #[test]
    fn order_ids_do_not_collide_in_practice() {
        let now = Utc::now();
        let ids: HashSet<String> = (0..1000).map(|_| new_order_id(now).0).collect();
        assert_eq!(ids.len(), 1000);
    }
}
