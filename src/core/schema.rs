use std::collections::BTreeMap;

use serde::ser::{Serialize, SerializeMap, Serializer};

pub const SENTINEL: &str = "NA";

macro_rules! fields {
    ($($variant:ident => $name:literal),+ $(,)?) => {
        /// The fixed output schema, in output order.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum Field {
            $($variant),+
        }

        impl Field {
            pub const ALL: [Field; 21] = [$(Field::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Field::$variant => $name),+
                }
            }

            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $($name => Some(Field::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

fields! {
    InsuranceCompanyName => "Insurance_company_name",
    InsurancePlanName => "Insurance_plan_name",
    InsurancePolicyType => "Insurance_policy_type",
    InsurancePolicyNumber => "Insurance_policy_number",
    VehicleRegistrationNumber => "Vehicle_registration_number",
    EngineNumber => "Engine_number",
    ChassisNumber => "Chassis_number",
    PolicyholderName => "Policyholder_name",
    PolicyholderAddress => "Policyholder_address",
    PolicyholderPhoneNumber => "Policyholder_phone_number",
    PolicyholderEmailid => "Policyholder_emailid",
    IntermediaryCode => "Intermediary_code",
    IntermediaryName => "Intermediary_name",
    IntermediaryPhoneNumber => "Intermediary_phone_number",
    IntermediaryEmailid => "Intermediary_emailid",
    TotalPremiumPaid => "Total_premium_paid",
    OwnDamagePremium => "Own_damage_premium",
    BasePremium => "Base_premium",
    PolicyStartDate => "Policy_start_date",
    PolicyExpiryDate => "Policy_expiry_date",
    PolicyIssuanceDate => "Policy_issuance_date",
}

impl Field {
    pub fn is_date(&self) -> bool {
        matches!(
            self,
            Field::PolicyStartDate | Field::PolicyExpiryDate | Field::PolicyIssuanceDate
        )
    }

    fn position(&self) -> usize {
        *self as usize
    }
}

/// One oracle answer, restricted to schema keys. Values are raw strings; the
/// fusion step decides what counts as a sentinel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMap {
    values: BTreeMap<Field, String>,
}

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: Field, value: impl Into<String>) {
        self.values.insert(field, value.into());
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.values.get(&field).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> {
        self.values.iter().map(|(field, value)| (*field, value.as_str()))
    }

    /// Builds a map from a JSON object. Unknown keys, `null`, arrays and
    /// nested objects are dropped; numbers and booleans are stringified.
    pub fn from_json_object(object: &serde_json::Map<String, serde_json::Value>) -> Self {
        let mut map = Self::new();
        for (key, value) in object {
            let Some(field) = Field::from_name(key) else {
                continue;
            };
            let value = match value {
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Number(n) => n.to_string(),
                serde_json::Value::Bool(b) => b.to_string(),
                _ => continue,
            };
            map.insert(field, value);
        }
        map
    }
}

impl<S: Into<String>> FromIterator<(Field, S)> for FieldMap {
    fn from_iter<I: IntoIterator<Item = (Field, S)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (field, value) in iter {
            map.insert(field, value);
        }
        map
    }
}

/// The job's output: every schema key, always, in schema order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalRecord {
    values: [String; 21],
}

impl Default for CanonicalRecord {
    fn default() -> Self {
        Self::empty()
    }
}

impl CanonicalRecord {
    pub fn empty() -> Self {
        Self {
            values: std::array::from_fn(|_| SENTINEL.to_string()),
        }
    }

    pub fn get(&self, field: Field) -> &str {
        &self.values[field.position()]
    }

    pub fn is_sentinel(&self, field: Field) -> bool {
        self.get(field) == SENTINEL
    }

    pub fn set(&mut self, field: Field, value: impl Into<String>) {
        self.values[field.position()] = value.into();
    }

    pub fn filled(&self) -> usize {
        Field::ALL.iter().filter(|f| !self.is_sentinel(**f)).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> {
        Field::ALL.into_iter().map(move |f| (f, self.get(f)))
    }
}

impl Serialize for CanonicalRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Field::ALL.len()))?;
        for (field, value) in self.iter() {
            map.serialize_entry(field.as_str(), value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_record_serializes_all_keys_in_order() {
        let json = serde_json::to_string(&CanonicalRecord::empty()).unwrap();
        let keys: Vec<&str> = Field::ALL.iter().map(|f| f.as_str()).collect();
        let mut last = 0;
        for key in &keys {
            let pos = json.find(&format!("\"{key}\":\"NA\"")).unwrap();
            assert!(pos >= last, "{key} out of order");
            last = pos;
        }
        let parsed: serde_json::Map<String, serde_json::Value> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.len(), 21);
    }

    #[test]
    fn field_names_round_trip() {
        for field in Field::ALL {
            assert_eq!(Field::from_name(field.as_str()), Some(field));
        }
        assert_eq!(Field::from_name("Policy_number"), None);
    }

    #[test]
    fn json_object_drops_unknown_and_nested_values() {
        let value = serde_json::json!({
            "Policyholder_name": "Asha Rao",
            "Total_premium_paid": 12450,
            "Engine_number": null,
            "Policyholder_address": {"line1": "x"},
            "Agent": "ignored"
        });
        let map = FieldMap::from_json_object(value.as_object().unwrap());
        assert_eq!(map.len(), 2);
        assert_eq!(map.get(Field::PolicyholderName), Some("Asha Rao"));
        assert_eq!(map.get(Field::TotalPremiumPaid), Some("12450"));
    }
}
