use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// The closed set of CMeEE entity categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    #[serde(rename = "dis")]
    Disease,
    #[serde(rename = "sym")]
    Symptom,
    #[serde(rename = "pro")]
    Procedure,
    #[serde(rename = "equ")]
    Equipment,
    #[serde(rename = "dru")]
    Drug,
    #[serde(rename = "ite")]
    TestItem,
    #[serde(rename = "bod")]
    BodyPart,
    #[serde(rename = "dep")]
    Department,
    #[serde(rename = "mic")]
    Microbe,
}

impl EntityType {
    /// All categories in the order they are listed to the model.
    pub const ALL: [EntityType; 9] = [
        EntityType::Disease,
        EntityType::Symptom,
        EntityType::Procedure,
        EntityType::Equipment,
        EntityType::Drug,
        EntityType::TestItem,
        EntityType::BodyPart,
        EntityType::Department,
        EntityType::Microbe,
    ];

    pub fn code(self) -> &'static str {
        match self {
            EntityType::Disease => "dis",
            EntityType::Symptom => "sym",
            EntityType::Procedure => "pro",
            EntityType::Equipment => "equ",
            EntityType::Drug => "dru",
            EntityType::TestItem => "ite",
            EntityType::BodyPart => "bod",
            EntityType::Department => "dep",
            EntityType::Microbe => "mic",
        }
    }

    /// Display label used in prompts and in model replies.
    pub fn label(self) -> &'static str {
        match self {
            EntityType::Disease => "疾病",
            EntityType::Symptom => "临床表现",
            EntityType::Procedure => "医疗程序",
            EntityType::Equipment => "医疗设备",
            EntityType::Drug => "药物",
            EntityType::TestItem => "医学检验项目",
            EntityType::BodyPart => "身体",
            EntityType::Department => "科室",
            EntityType::Microbe => "微生物类",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Label <-> type lookup handed to the prompt builder and the parser.
///
/// Built once by the caller and shared by reference; there is no
/// process-wide instance.
#[derive(Debug, Clone)]
pub struct EntityTypeMap {
    by_label: HashMap<&'static str, EntityType>,
}

impl EntityTypeMap {
    pub fn new() -> Self {
        let by_label = EntityType::ALL
            .into_iter()
            .map(|t| (t.label(), t))
            .collect();
        Self { by_label }
    }

    pub fn label_to_code(&self, label: &str) -> Option<EntityType> {
        self.by_label.get(label).copied()
    }

    pub fn code_to_label(&self, entity_type: EntityType) -> &'static str {
        entity_type.label()
    }

    /// Labels in canonical order.
    pub fn labels(&self) -> Vec<&'static str> {
        EntityType::ALL.iter().map(|t| t.label()).collect()
    }
}

impl Default for EntityTypeMap {
    fn default() -> Self {
        Self::new()
    }
}

/// One entity mention. Offsets are inclusive character positions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRecord {
    pub entity: String,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    pub start_idx: usize,
    pub end_idx: usize,
}

/// A sentence with its gold annotation, as found in the training split.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabeledSentence {
    pub text: String,
    #[serde(default)]
    pub entities: Vec<EntityRecord>,
}

/// Final output for one evaluated sentence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub text: String,
    pub entities: Vec<EntityRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_label_bijection() {
        let map = EntityTypeMap::new();
        for t in EntityType::ALL {
            assert_eq!(map.label_to_code(map.code_to_label(t)), Some(t));
            let decoded: EntityType =
                serde_json::from_value(serde_json::Value::from(t.code())).unwrap();
            assert_eq!(decoded, t);
        }

        let mut labels = map.labels();
        labels.sort();
        labels.dedup();
        assert_eq!(labels.len(), 9);
    }

    #[test]
    fn test_unknown_label() {
        let map = EntityTypeMap::new();
        assert_eq!(map.label_to_code("症状"), None);
        assert!(serde_json::from_str::<EntityType>(r#""xyz""#).is_err());
    }

    #[test]
    fn test_record_serializes_with_code() {
        let record = EntityRecord {
            entity: "发热".to_string(),
            entity_type: EntityType::Symptom,
            start_idx: 3,
            end_idx: 4,
        };
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(
            json,
            r#"{"entity":"发热","type":"sym","start_idx":3,"end_idx":4}"#
        );
    }
}
