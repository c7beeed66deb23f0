//! The authenticated user and the role table that drives preloading.

use serde::{Deserialize, Serialize};

/// Account role as reported by the auth endpoint.
///
/// Unknown role strings map to `Other`, which carries no capabilities so
/// new server-side roles get only the data every role needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    Admin,
    InventoryManager,
    ShopManager,
    #[serde(other)]
    Other,
}

/// Optional data a role is allowed to preload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub shops: bool,
    pub stock_batches: bool,
    pub customers: bool,
    /// Works against a single shop's stock (needs an assigned shop too)
    pub shop_facing: bool,
}

impl Role {
    pub fn capabilities(self) -> Capabilities {
        match self {
            Role::SuperAdmin => Capabilities {
                shops: true,
                stock_batches: true,
                customers: true,
                shop_facing: true,
            },
            Role::Admin => Capabilities {
                customers: true,
                ..Capabilities::default()
            },
            Role::InventoryManager => Capabilities {
                stock_batches: true,
                customers: true,
                shop_facing: true,
                ..Capabilities::default()
            },
            Role::ShopManager => Capabilities {
                customers: true,
                shop_facing: true,
                ..Capabilities::default()
            },
            Role::Other => Capabilities::default(),
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "Super Admin",
            Role::Admin => "Admin",
            Role::InventoryManager => "Inventory Manager",
            Role::ShopManager => "Shop Manager",
            Role::Other => "Unknown",
        }
    }
}

/// Shop assignment as sent by the API: either a bare id or a populated object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ShopRef {
    Id(String),
    Populated {
        #[serde(rename = "_id")]
        id: String,
        #[serde(default)]
        name: Option<String>,
    },
}

impl ShopRef {
    pub fn id(&self) -> &str {
        match self {
            ShopRef::Id(id) => id,
            ShopRef::Populated { id, .. } => id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    pub role: Role,
    #[serde(default)]
    pub shop: Option<ShopRef>,
}

impl User {
    pub fn new(role: Role, shop: Option<&str>) -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            email: String::new(),
            role,
            shop: shop.map(|id| ShopRef::Id(id.to_string())),
        }
    }

    pub fn shop_id(&self) -> Option<&str> {
        self.shop.as_ref().map(ShopRef::id).filter(|id| !id.is_empty())
    }

    pub fn has_shop(&self) -> bool {
        self.shop_id().is_some()
    }
}
