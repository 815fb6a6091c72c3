use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const REPO_INVALID_TABLE: &str = "REPO/INVALID_TABLE";
pub const REPO_APPEND_ONLY: &str = "REPO/APPEND_ONLY";
pub const REPO_PROTECTED_TABLE: &str = "REPO/PROTECTED_TABLE";
pub const REPO_ID_NOT_FOUND: &str = "REPO/ID_NOT_FOUND";
pub const REPO_INVALID_ORDER_BY: &str = "REPO/INVALID_ORDER_BY";

pub const VALIDATION_UNKNOWN_COLUMN: &str = "VALIDATION/UNKNOWN_COLUMN";
pub const VALIDATION_DUPLICATE_FIELD: &str = "VALIDATION/DUPLICATE_FIELD";
pub const VALIDATION_NEGATIVE_AMOUNT: &str = "VALIDATION/NEGATIVE_AMOUNT";
pub const VALIDATION_LEASE_DATE_ORDER: &str = "VALIDATION/LEASE_DATE_ORDER";
pub const VALIDATION_MISSING_FIELD: &str = "VALIDATION/MISSING_FIELD";

pub const MODEL_DECODE_ERROR: &str = "MODEL/DECODE";
pub const GENERIC_FAIL: &str = "GENERIC/FAIL";
pub const GENERIC_FAIL_MESSAGE: &str = "Something went wrong. Please try again.";

pub const DEFAULT_COMPANY_NAME: &str = "Rentdesk";
pub const DEFAULT_CURRENCY: &str = "USD";
pub const DEFAULT_PAYMENT_METHODS: &[&str] = &["cash", "bank_transfer", "mobile_money"];

/// Raised when a stored slug does not belong to the column's enumeration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid {kind}: {value}")]
pub struct EnumParseError {
    kind: &'static str,
    value: String,
}

impl EnumParseError {
    pub fn new(kind: &'static str, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

/// Enumerated TEXT columns share one shape: a finite slug list mirrored by a
/// CHECK constraint in the schema. The macro keeps the Rust side in lockstep.
macro_rules! domain_enum {
    ($(#[$meta:meta])* $name:ident { $( $variant:ident => $slug:literal ),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $( #[serde(rename = $slug)] $variant ),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[ $( $name::$variant ),+ ];

            pub const fn as_str(self) -> &'static str {
                match self {
                    $( $name::$variant => $slug ),+
                }
            }

            pub fn iter() -> impl Iterator<Item = $name> {
                Self::ALL.iter().copied()
            }
        }

        impl std::str::FromStr for $name {
            type Err = EnumParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $slug => Ok($name::$variant), )+
                    other => Err(EnumParseError::new(stringify!($name), other)),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

domain_enum! {
    /// `users.role`. The `accountant` slug arrived in a later migration; the
    /// initial CHECK constraint does not know it.
    Role {
        Customer => "customer",
        Admin => "admin",
        Manager => "manager",
        Superadmin => "superadmin",
        Tenant => "tenant",
        Accountant => "accountant",
    }
}

domain_enum! {
    PropertyKind {
        Apartment => "apartment",
        House => "house",
        Commercial => "commercial",
        Land => "land",
    }
}

domain_enum! {
    PropertyStatus {
        Available => "available",
        Rented => "rented",
        Sold => "sold",
    }
}

domain_enum! {
    RentCycle {
        Monthly => "monthly",
        Quarterly => "quarterly",
        Yearly => "yearly",
    }
}

domain_enum! {
    LeaseStatus {
        Active => "active",
        Ended => "ended",
        Terminated => "terminated",
    }
}

domain_enum! {
    PaymentStatus {
        Pending => "pending",
        Completed => "completed",
        Failed => "failed",
        Refunded => "refunded",
    }
}

domain_enum! {
    MaintenancePriority {
        Low => "low",
        Medium => "medium",
        High => "high",
        Urgent => "urgent",
    }
}

domain_enum! {
    MaintenanceStatus {
        Open => "open",
        InProgress => "in_progress",
        Resolved => "resolved",
        Closed => "closed",
    }
}

domain_enum! {
    RequestStatus {
        Open => "open",
        Closed => "closed",
    }
}

/// SQLite stores flags as 0/1 integers; accept either shape on the way in.
pub(crate) mod int_bool {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<bool, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Bool(bool),
            Int(i64),
        }
        Ok(match Raw::deserialize(deserializer)? {
            Raw::Bool(b) => b,
            Raw::Int(i) => i != 0,
        })
    }

    pub fn serialize<S>(value: &bool, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_bool(*value)
    }
}

/// Ordered lists (property images, guarantor documents, payment methods) are
/// stored as JSON array text in a TEXT column.
pub(crate) mod json_text_list {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            List(Vec<String>),
            Text(String),
        }
        match Raw::deserialize(deserializer)? {
            Raw::List(list) => Ok(list),
            Raw::Text(text) if text.trim().is_empty() => Ok(Vec::new()),
            Raw::Text(text) => serde_json::from_str(&text).map_err(serde::de::Error::custom),
        }
    }

    pub fn serialize<S>(value: &Vec<String>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.serialize(serializer)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    #[serde(with = "int_bool")]
    pub blocked: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Property {
    pub id: String,
    pub name: String,
    pub location: String,
    pub kind: PropertyKind,
    pub price: i64,
    pub bedrooms: i64,
    pub bathrooms: i64,
    pub status: PropertyStatus,
    #[serde(with = "json_text_list")]
    pub images: Vec<String>,
    #[serde(default)]
    pub owner_name: Option<String>,
    #[serde(default)]
    pub owner_phone: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Unit {
    pub id: String,
    pub property_id: String,
    pub unit_number: String,
    #[serde(default)]
    pub kind: Option<String>,
    pub rent_amount: i64,
    pub status: String,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub id_number: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Guarantor {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub id_number: Option<String>,
    #[serde(with = "json_text_list")]
    pub document_photos: Vec<String>,
    #[serde(default)]
    pub work_info: Option<String>,
    pub status: String,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lease {
    pub id: String,
    pub unit_id: String,
    pub tenant_id: String,
    #[serde(default)]
    pub guarantor_id: Option<String>,
    pub start_date: i64,
    pub end_date: i64,
    pub rent_amount: i64,
    pub deposit: i64,
    pub rent_cycle: RentCycle,
    #[serde(with = "int_bool")]
    pub auto_invoice: bool,
    #[serde(default)]
    pub guarantor_note: Option<String>,
    #[serde(default)]
    pub vehicle_info: Option<String>,
    #[serde(default)]
    pub weapon_info: Option<String>,
    #[serde(default)]
    pub witness_info: Option<String>,
    pub status: LeaseStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: String,
    pub lease_id: String,
    pub amount: i64,
    pub payment_date: i64,
    pub method: String,
    pub status: PaymentStatus,
    #[serde(default)]
    pub reference_id: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Maintenance {
    pub id: String,
    #[serde(default)]
    pub property_id: Option<String>,
    #[serde(default)]
    pub unit_id: Option<String>,
    pub user_id: String,
    pub issue: String,
    #[serde(default)]
    pub description: Option<String>,
    pub priority: MaintenancePriority,
    pub status: MaintenanceStatus,
    pub cost: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub id: String,
    pub user_id: String,
    pub kind: String,
    pub subject: String,
    #[serde(default)]
    pub message: Option<String>,
    pub status: RequestStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLog {
    pub id: String,
    pub user_id: String,
    pub action: String,
    #[serde(default)]
    pub details: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expense {
    pub id: String,
    #[serde(default)]
    pub property_id: Option<String>,
    pub category: String,
    pub amount: i64,
    #[serde(default)]
    pub incurred_at: Option<i64>,
    #[serde(default)]
    pub note: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub id: String,
    pub company_name: String,
    #[serde(default)]
    pub logo: Option<String>,
    pub currency: String,
    #[serde(with = "json_text_list")]
    pub payment_methods: Vec<String>,
    pub created_at: i64,
    pub updated_at: i64,
}
