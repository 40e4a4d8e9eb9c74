use std::fmt;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// CalculatorSpec defines the arithmetic request of a Calculator
#[derive(Serialize, Deserialize, JsonSchema, CustomResource, Clone, Debug, PartialEq)]
#[kube(
    group = "app.calculator.com",
    version = "v1alpha1",
    kind = "Calculator",
    namespaced
)]
#[kube(status = "CalculatorStatus")]
pub struct CalculatorSpec {
    /// Left operand.
    pub xfield: i64,

    /// Right operand.
    pub yfield: i64,

    /// One of "+", "-" or "*". Any other symbol evaluates to 0.
    pub operator: String,
}

#[derive(Serialize, Deserialize, JsonSchema, Clone, Debug, Default, PartialEq, Eq)]
pub struct CalculatorStatus {
    /// Set once the controller has computed a result for the current spec.
    #[serde(default)]
    pub processed: bool,

    /// The computed result.
    #[serde(default)]
    pub result: i64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operator {
    Add,
    Subtract,
    Multiply,
    Unrecognized,
}

impl From<&str> for Operator {
    fn from(symbol: &str) -> Self {
        match symbol {
            "+" => Operator::Add,
            "-" => Operator::Subtract,
            "*" => Operator::Multiply,
            _ => Operator::Unrecognized,
        }
    }
}

impl Operator {
    /// Overflow wraps at the width of the CRD's int64 fields.
    pub fn apply(self, x: i64, y: i64) -> i64 {
        match self {
            Operator::Add => x.wrapping_add(y),
            Operator::Subtract => x.wrapping_sub(y),
            Operator::Multiply => x.wrapping_mul(y),
            Operator::Unrecognized => 0,
        }
    }
}

/// Namespace and name shared by a Calculator and its result Secret.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Returns the missing field path when the metadata is incomplete.
    pub fn from_meta(meta: &ObjectMeta) -> Result<Self, &'static str> {
        Ok(Self::new(
            meta.namespace.clone().ok_or(".metadata.namespace")?,
            meta.name.clone().ok_or(".metadata.name")?,
        ))
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn operator_resolves_known_symbols() {
        assert_eq!(Operator::from("+"), Operator::Add);
        assert_eq!(Operator::from("-"), Operator::Subtract);
        assert_eq!(Operator::from("*"), Operator::Multiply);
        for symbol in ["/", "%", "", "plus", " +"] {
            assert_eq!(Operator::from(symbol), Operator::Unrecognized);
        }
    }

    #[test]
    fn operator_apply() {
        assert_eq!(Operator::Add.apply(1, 2), 3);
        assert_eq!(Operator::Subtract.apply(2, 1), 1);
        assert_eq!(Operator::Subtract.apply(1, 2), -1);
        assert_eq!(Operator::Multiply.apply(2, 3), 6);
        assert_eq!(Operator::Multiply.apply(-4, 3), -12);
        assert_eq!(Operator::Unrecognized.apply(2, 3), 0);
    }

    #[test]
    fn operator_apply_wraps_on_overflow() {
        assert_eq!(Operator::Add.apply(i64::MAX, 1), i64::MIN);
        assert_eq!(Operator::Subtract.apply(i64::MIN, 1), i64::MAX);
        assert_eq!(Operator::Multiply.apply(i64::MAX, 2), -2);
    }

    #[test]
    fn object_key_from_meta() {
        let meta = ObjectMeta {
            name: Some("calc".into()),
            namespace: Some("default".into()),
            ..ObjectMeta::default()
        };
        let key = ObjectKey::from_meta(&meta).unwrap();
        assert_eq!(key, ObjectKey::new("default", "calc"));
        assert_eq!(key.to_string(), "default/calc");

        let meta = ObjectMeta {
            name: Some("calc".into()),
            ..ObjectMeta::default()
        };
        assert_eq!(ObjectKey::from_meta(&meta), Err(".metadata.namespace"));

        let meta = ObjectMeta {
            namespace: Some("default".into()),
            ..ObjectMeta::default()
        };
        assert_eq!(ObjectKey::from_meta(&meta), Err(".metadata.name"));
    }

    #[test]
    fn sample_manifest_deserializes() {
        let manifest = r#"
apiVersion: app.calculator.com/v1alpha1
kind: Calculator
metadata:
  name: calculator-sample
  namespace: default
spec:
  xfield: 7
  yfield: -2
  operator: "*"
"#;
        let calculator: Calculator = serde_yaml::from_str(manifest).unwrap();
        assert_eq!(calculator.metadata.name.as_deref(), Some("calculator-sample"));
        assert_eq!(
            calculator.spec,
            CalculatorSpec {
                xfield: 7,
                yfield: -2,
                operator: "*".into(),
            }
        );
        assert!(calculator.status.is_none());
    }

    #[test]
    fn status_serializes_with_plain_field_names() {
        let status = CalculatorStatus {
            processed: true,
            result: 3,
        };
        assert_eq!(
            serde_json::to_value(&status).unwrap(),
            json!({"processed": true, "result": 3})
        );
        let empty: CalculatorStatus = serde_json::from_value(json!({})).unwrap();
        assert_eq!(empty, CalculatorStatus::default());
    }
}
