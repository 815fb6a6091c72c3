use serde_json::{Map, Value};

/// Display stand-in for anything that failed to resolve.
pub const NA: &str = "N/A";

/// A lease's related records as looked up from candidate lists. Slots that
/// found no match hold `{}`, never null, so view code can index into them
/// blindly.
#[derive(Debug, Clone)]
pub struct ResolvedLease {
    pub tenant: Value,
    pub unit: Value,
    pub guarantor: Value,
    pub property: Value,
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

fn is_empty_object(value: &Value) -> bool {
    value.as_object().map(|m| m.is_empty()).unwrap_or(true)
}

fn id_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Pulls a relation's identifier off a record, trying every spelling callers
/// have used: the bare key holding an id string, the canonical `_id` suffix,
/// then the legacy `Id`/`ID` camel suffixes.
fn relation_needle(record: &Value, relation: &str) -> Option<String> {
    let obj = record.as_object()?;
    let keys = [
        relation.to_string(),
        format!("{relation}_id"),
        format!("{relation}Id"),
        format!("{relation}ID"),
    ];
    for key in &keys {
        if let Some(found) = obj.get(key).and_then(id_text) {
            return Some(found);
        }
    }
    None
}

fn candidate_matches(candidate: &Value, needle: &str) -> bool {
    let Some(obj) = candidate.as_object() else {
        return false;
    };
    for key in ["id", "_id"] {
        if let Some(found) = obj.get(key).and_then(id_text) {
            if found == needle {
                return true;
            }
        }
    }
    false
}

/// Resolves one relation of a record against a candidate list.
///
/// Preference order: an object already embedded under the relation key, then
/// an id match against the candidates using whichever identifier spelling
/// the record carries. Returns `{}` when nothing matches.
pub fn resolve_relation(record: &Value, relation: &str, candidates: &[Value]) -> Value {
    if let Some(embedded) = record.get(relation) {
        if embedded.is_object() && !is_empty_object(embedded) {
            return embedded.clone();
        }
    }

    let Some(needle) = relation_needle(record, relation) else {
        return empty_object();
    };

    candidates
        .iter()
        .find(|candidate| candidate_matches(candidate, &needle))
        .cloned()
        .unwrap_or_else(empty_object)
}

/// Resolves all four of a lease's relations. A property that is not linked
/// on the lease itself is reached through the resolved unit.
pub fn resolve_lease(
    lease: &Value,
    tenants: &[Value],
    units: &[Value],
    guarantors: &[Value],
    properties: &[Value],
) -> ResolvedLease {
    let tenant = resolve_relation(lease, "tenant", tenants);
    let unit = resolve_relation(lease, "unit", units);
    let guarantor = resolve_relation(lease, "guarantor", guarantors);

    let mut property = resolve_relation(lease, "property", properties);
    if is_empty_object(&property) && !is_empty_object(&unit) {
        property = resolve_relation(&unit, "property", properties);
    }

    ResolvedLease {
        tenant,
        unit,
        guarantor,
        property,
    }
}

/// A field for display: the stored text, numbers rendered as text, and
/// `"N/A"` for anything absent or null.
pub fn display_field(entity: &Value, key: &str) -> String {
    match entity.get(key) {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => NA.to_string(),
    }
}

/// Flat, fully-populated view of a lease for document export. Every display
/// slot is filled; unresolved relations degrade to `"N/A"` rather than
/// holes.
pub fn lease_snapshot(lease: &Value, resolved: &ResolvedLease) -> Value {
    let mut out = Map::new();
    out.insert("lease_id".into(), lease.get("id").cloned().unwrap_or(Value::Null));
    for key in [
        "start_date",
        "end_date",
        "rent_amount",
        "deposit",
        "rent_cycle",
        "status",
    ] {
        out.insert(key.into(), lease.get(key).cloned().unwrap_or(Value::Null));
    }
    out.insert(
        "tenant_name".into(),
        Value::String(display_field(&resolved.tenant, "name")),
    );
    out.insert(
        "tenant_email".into(),
        Value::String(display_field(&resolved.tenant, "email")),
    );
    out.insert(
        "tenant_phone".into(),
        Value::String(display_field(&resolved.tenant, "phone")),
    );
    out.insert(
        "unit_number".into(),
        Value::String(display_field(&resolved.unit, "unit_number")),
    );
    out.insert(
        "property_name".into(),
        Value::String(display_field(&resolved.property, "name")),
    );
    out.insert(
        "property_location".into(),
        Value::String(display_field(&resolved.property, "location")),
    );
    out.insert(
        "owner_name".into(),
        Value::String(display_field(&resolved.property, "owner_name")),
    );
    out.insert(
        "guarantor_name".into(),
        Value::String(display_field(&resolved.guarantor, "name")),
    );
    out.insert(
        "guarantor_phone".into(),
        Value::String(display_field(&resolved.guarantor, "phone")),
    );
    Value::Object(out)
}
