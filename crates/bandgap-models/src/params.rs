use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ModelError, ModelResult};

/// A single hyperparameter value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    /// Unset / unlimited (e.g. `max_depth`).
    None,
}

impl ParamValue {
    fn from_json(name: &str, v: &Value) -> ModelResult<Self> {
        match v {
            Value::Null => Ok(ParamValue::None),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(ParamValue::Int(i))
                } else {
                    n.as_f64().map(ParamValue::Float).ok_or_else(|| {
                        ModelError::InvalidParamSpec(format!("'{}': {} is out of range", name, n))
                    })
                }
            }
            other => Err(ModelError::InvalidParamSpec(format!(
                "'{}': expected a number or null, got {}",
                name, other
            ))),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            ParamValue::Int(i) => Some(i as f64),
            ParamValue::Float(f) => Some(f),
            ParamValue::None => None,
        }
    }

    /// Non-negative integer, accepting integral floats such as `100.0`.
    pub fn as_usize(&self) -> Option<usize> {
        match *self {
            ParamValue::Int(i) if i >= 0 => Some(i as usize),
            ParamValue::Float(f) if f >= 0.0 && f.fract() == 0.0 && f < u32::MAX as f64 => {
                Some(f as usize)
            }
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(i) => write!(f, "{}", i),
            // Debug keeps the trailing `.0` on whole floats.
            ParamValue::Float(v) => write!(f, "{:?}", v),
            ParamValue::None => f.write_str("None"),
        }
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<usize> for ParamValue {
    fn from(v: usize) -> Self {
        ParamValue::Int(v as i64)
    }
}

impl From<Option<usize>> for ParamValue {
    fn from(v: Option<usize>) -> Self {
        v.map_or(ParamValue::None, ParamValue::from)
    }
}

/// One concrete assignment of hyperparameters, ordered by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParamSet(pub BTreeMap<String, ParamValue>);

impl ParamSet {
    pub fn new() -> Self {
        ParamSet(BTreeMap::new())
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Renders like a Python dict: `{'max_depth': 20, 'n_estimators': 100}`.
impl fmt::Display for ParamSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (k, v)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "'{}': {}", k, v)?;
        }
        f.write_str("}")
    }
}

/// Candidate values per hyperparameter. The grid it spans is enumerated in
/// name order with the last name varying fastest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HyperparameterSpace(BTreeMap<String, Vec<ParamValue>>);

impl HyperparameterSpace {
    pub fn new() -> Self {
        HyperparameterSpace(BTreeMap::new())
    }

    /// Builder-style insert; replaces any previous values for `name`.
    pub fn with(mut self, name: &str, values: Vec<ParamValue>) -> Self {
        self.0.insert(name.to_string(), values);
        self
    }

    /// Parse a JSON object of `name -> [values]`. A scalar value is a
    /// one-element list. Empty lists are rejected.
    pub fn from_json_str(s: &str) -> ModelResult<Self> {
        let value: Value = serde_json::from_str(s)
            .map_err(|e| ModelError::InvalidParamSpec(format!("not valid JSON: {}", e)))?;
        Self::from_json(&value)
    }

    pub fn from_json(value: &Value) -> ModelResult<Self> {
        let obj = value.as_object().ok_or_else(|| {
            ModelError::InvalidParamSpec(format!("expected a JSON object, got {}", value))
        })?;
        let mut space = HyperparameterSpace::new();
        for (name, v) in obj {
            let values = match v {
                Value::Array(items) => items
                    .iter()
                    .map(|item| ParamValue::from_json(name, item))
                    .collect::<ModelResult<Vec<_>>>()?,
                scalar => vec![ParamValue::from_json(name, scalar)?],
            };
            if values.is_empty() {
                return Err(ModelError::InvalidParamSpec(format!(
                    "'{}' has no candidate values",
                    name
                )));
            }
            space.0.insert(name.clone(), values);
        }
        Ok(space)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(|k| k.as_str())
    }

    /// Number of combinations in the full grid (0 for an empty space).
    pub fn grid_len(&self) -> usize {
        if self.0.is_empty() {
            return 0;
        }
        self.0
            .values()
            .fold(1usize, |acc, v| acc.saturating_mul(v.len()))
    }

    /// The `index`-th grid combination, or `None` past the end.
    pub fn combination(&self, mut index: usize) -> Option<ParamSet> {
        if index >= self.grid_len() {
            return None;
        }
        let mut set = ParamSet::new();
        for (name, values) in self.0.iter().rev() {
            set.0.insert(name.clone(), values[index % values.len()]);
            index /= values.len();
        }
        Some(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_space() {
        let space = HyperparameterSpace::from_json_str(
            r#"{"n_estimators": [100, 200], "learning_rate": [0.01, 0.1], "max_depth": 5}"#,
        )
        .unwrap();
        assert_eq!(space.grid_len(), 4);
        assert_eq!(
            space.names().collect::<Vec<_>>(),
            vec!["learning_rate", "max_depth", "n_estimators"]
        );
    }

    #[test]
    fn test_parse_rejects_bad_specs() {
        assert!(HyperparameterSpace::from_json_str("[1, 2]").is_err());
        assert!(HyperparameterSpace::from_json_str(r#"{"a": []}"#).is_err());
        assert!(HyperparameterSpace::from_json_str(r#"{"a": ["x"]}"#).is_err());
        assert!(HyperparameterSpace::from_json_str("{oops").is_err());
    }

    #[test]
    fn test_empty_object_is_empty_space() {
        let space = HyperparameterSpace::from_json_str("{}").unwrap();
        assert!(space.is_empty());
        assert_eq!(space.grid_len(), 0);
        assert!(space.combination(0).is_none());
    }

    #[test]
    fn test_combinations_cover_grid() {
        let space = HyperparameterSpace::new()
            .with("a", vec![1i64.into(), 2i64.into()])
            .with("b", vec![0.5.into(), 1.5.into(), 2.5.into()]);
        assert_eq!(space.grid_len(), 6);

        let first = space.combination(0).unwrap();
        assert_eq!(first.get("a"), Some(&ParamValue::Int(1)));
        assert_eq!(first.get("b"), Some(&ParamValue::Float(0.5)));
        // last name varies fastest
        let second = space.combination(1).unwrap();
        assert_eq!(second.get("a"), Some(&ParamValue::Int(1)));
        assert_eq!(second.get("b"), Some(&ParamValue::Float(1.5)));

        let all: Vec<ParamSet> = (0..6).filter_map(|i| space.combination(i)).collect();
        for i in 0..6 {
            for j in i + 1..6 {
                assert_ne!(all[i], all[j]);
            }
        }
        assert!(space.combination(6).is_none());
    }

    #[test]
    fn test_param_set_display() {
        let mut set = ParamSet::new();
        set.insert("n_estimators", 200usize);
        set.insert("learning_rate", 0.1);
        set.insert("max_depth", ParamValue::None);
        set.insert("subsample", 1.0);
        assert_eq!(
            set.to_string(),
            "{'learning_rate': 0.1, 'max_depth': None, 'n_estimators': 200, 'subsample': 1.0}"
        );
    }

    #[test]
    fn test_as_usize() {
        assert_eq!(ParamValue::Int(3).as_usize(), Some(3));
        assert_eq!(ParamValue::Float(4.0).as_usize(), Some(4));
        assert_eq!(ParamValue::Float(4.5).as_usize(), None);
        assert_eq!(ParamValue::Int(-1).as_usize(), None);
        assert_eq!(ParamValue::None.as_usize(), None);
    }
}
