//! Policy presets for the order service.
//!
//! Paginated `...ByNextToken` continuations share the bucket of the call
//! they continue.

use crate::domain::{action::ActionName, policy::DirectPolicy, policy::RatePolicy};

/// Fetch one or more orders by id.
pub const GET_ORDER: &str = "getOrder";
/// List orders by creation or update date.
pub const LIST_ORDERS: &str = "listOrders";
/// Continue a `listOrders` page.
pub const LIST_ORDERS_BY_NEXT_TOKEN: &str = "listOrdersByNextToken";
/// List the items of one order.
pub const LIST_ORDER_ITEMS: &str = "listOrdersItems";
/// Continue a `listOrdersItems` page.
pub const LIST_ORDER_ITEMS_BY_NEXT_TOKEN: &str = "listOrdersItemsByNextToken";

/// Burst 6, one call restored every ~67 seconds.
const ORDER_QUOTA: (f64, f64) = (6.0, 0.015);
/// Burst 30, one call restored every 2 seconds.
const ORDER_ITEMS_QUOTA: (f64, f64) = (30.0, 0.5);

/// Ordered policy entries for the order service.
///
/// This departs from the legacy policy list, which re-registers
/// `listOrders` as (30, 0.5) and finally makes `listOrdersByNextToken` an
/// alias of itself. Taken literally that list fails validation with
/// `ConfigError::ChainedAlias`. Here (30, 0.5) is assigned to
/// `listOrdersItems`, and the trailing alias becomes
/// `listOrdersItemsByNextToken` of `listOrdersItems`. Load the legacy list
/// through [`ThrottleConfig`](crate::infrastructure::config::ThrottleConfig)
/// to get its literal last-write-wins meaning.
pub fn order_policies() -> Vec<(ActionName, RatePolicy)> {
    vec![
        (ActionName::from(GET_ORDER), quota(ORDER_QUOTA)),
        (ActionName::from(LIST_ORDERS), quota(ORDER_QUOTA)),
        (
            ActionName::from(LIST_ORDERS_BY_NEXT_TOKEN),
            RatePolicy::alias(LIST_ORDERS),
        ),
        (ActionName::from(LIST_ORDER_ITEMS), quota(ORDER_ITEMS_QUOTA)),
        (
            ActionName::from(LIST_ORDER_ITEMS_BY_NEXT_TOKEN),
            RatePolicy::alias(LIST_ORDER_ITEMS),
        ),
    ]
}

fn quota((burst, rate): (f64, f64)) -> RatePolicy {
    // Both presets are compile-time constants within DirectPolicy's range.
    match DirectPolicy::new(burst, rate) {
        Ok(policy) => RatePolicy::Direct(policy),
        Err(e) => unreachable!("order preset out of range: {}", e),
    }
}
