//! The fixed catalog of webhook topics CrewFlow subscribes to.
//!
//! Topics arrive as path-style strings (`orders/paid`); the closed enum
//! keeps routing exhaustive and makes an unrecognized string an explicit
//! case rather than a silent fall-through.

/// A recognized webhook topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    OrdersCreate,
    OrdersUpdated,
    OrdersPaid,
    OrdersCancelled,
    OrdersFulfilled,
    OrdersPartiallyFulfilled,
    ProductsCreate,
    ProductsUpdate,
    ProductsDelete,
    InventoryLevelsUpdate,
    InventoryItemsCreate,
    InventoryItemsUpdate,
    CustomersCreate,
    CustomersUpdate,
    CustomersDelete,
    AppUninstalled,
    CartsCreate,
    CartsUpdate,
    CheckoutsCreate,
    CheckoutsUpdate,
    CheckoutsDelete,
}

impl Topic {
    /// Every topic in the catalog, in wire order.
    pub const ALL: [Topic; 21] = [
        Topic::OrdersCreate,
        Topic::OrdersUpdated,
        Topic::OrdersPaid,
        Topic::OrdersCancelled,
        Topic::OrdersFulfilled,
        Topic::OrdersPartiallyFulfilled,
        Topic::ProductsCreate,
        Topic::ProductsUpdate,
        Topic::ProductsDelete,
        Topic::InventoryLevelsUpdate,
        Topic::InventoryItemsCreate,
        Topic::InventoryItemsUpdate,
        Topic::CustomersCreate,
        Topic::CustomersUpdate,
        Topic::CustomersDelete,
        Topic::AppUninstalled,
        Topic::CartsCreate,
        Topic::CartsUpdate,
        Topic::CheckoutsCreate,
        Topic::CheckoutsUpdate,
        Topic::CheckoutsDelete,
    ];

    /// The wire representation (`orders/paid` etc.).
    pub fn as_str(self) -> &'static str {
        match self {
            Topic::OrdersCreate => "orders/create",
            Topic::OrdersUpdated => "orders/updated",
            Topic::OrdersPaid => "orders/paid",
            Topic::OrdersCancelled => "orders/cancelled",
            Topic::OrdersFulfilled => "orders/fulfilled",
            Topic::OrdersPartiallyFulfilled => "orders/partially_fulfilled",
            Topic::ProductsCreate => "products/create",
            Topic::ProductsUpdate => "products/update",
            Topic::ProductsDelete => "products/delete",
            Topic::InventoryLevelsUpdate => "inventory_levels/update",
            Topic::InventoryItemsCreate => "inventory_items/create",
            Topic::InventoryItemsUpdate => "inventory_items/update",
            Topic::CustomersCreate => "customers/create",
            Topic::CustomersUpdate => "customers/update",
            Topic::CustomersDelete => "customers/delete",
            Topic::AppUninstalled => "app/uninstalled",
            Topic::CartsCreate => "carts/create",
            Topic::CartsUpdate => "carts/update",
            Topic::CheckoutsCreate => "checkouts/create",
            Topic::CheckoutsUpdate => "checkouts/update",
            Topic::CheckoutsDelete => "checkouts/delete",
        }
    }

    /// Parse a wire string into a topic. Returns `None` for anything
    /// outside the catalog.
    pub fn parse(s: &str) -> Option<Topic> {
        Topic::ALL.iter().copied().find(|t| t.as_str() == s)
    }

    /// Topics whose processing additionally schedules a monitoring sweep
    /// for the owning tenant: the order and checkout lifecycles, plus app
    /// removal.
    pub fn is_high_value(self) -> bool {
        matches!(
            self,
            Topic::OrdersCreate
                | Topic::OrdersPaid
                | Topic::OrdersCancelled
                | Topic::OrdersFulfilled
                | Topic::OrdersPartiallyFulfilled
                | Topic::CheckoutsCreate
                | Topic::CheckoutsUpdate
                | Topic::CheckoutsDelete
                | Topic::AppUninstalled
        )
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_roundtrips_the_whole_catalog() {
        for topic in Topic::ALL {
            assert_eq!(Topic::parse(topic.as_str()), Some(topic));
        }
    }

    #[test]
    fn parse_rejects_unknown_strings() {
        assert_eq!(Topic::parse("orders/refunded"), None);
        assert_eq!(Topic::parse("orders"), None);
        assert_eq!(Topic::parse(""), None);
        // Matching is exact, not case-insensitive.
        assert_eq!(Topic::parse("Orders/Paid"), None);
    }

    #[test]
    fn high_value_covers_order_and_checkout_lifecycles() {
        assert!(Topic::OrdersPaid.is_high_value());
        assert!(Topic::CheckoutsCreate.is_high_value());
        assert!(Topic::AppUninstalled.is_high_value());
        assert!(!Topic::ProductsUpdate.is_high_value());
        assert!(!Topic::CustomersCreate.is_high_value());
    }
}
