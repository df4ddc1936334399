// src/ocr/models.rs
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};

use crate::signals::PageArtifacts;
use crate::utils::error::SignalError;

/// One block of a forms-analysis response.
/// Example: `{"Id": "k1", "BlockType": "KEY_VALUE_SET", "EntityTypes": ["KEY"], ...}`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Block {
    pub id: String,
    pub block_type: String,
    #[serde(default)]
    pub text: Option<String>,
    /// 1-based; single-page responses may omit it.
    #[serde(default = "first_page")]
    pub page: usize,
    #[serde(default)]
    pub entity_types: Vec<String>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
}

fn first_page() -> usize {
    1
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Relationship {
    #[serde(rename = "Type")]
    pub kind: String,
    #[serde(default)]
    pub ids: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DocumentMetadata {
    pub pages: usize,
}

/// Either a full response object or a bare list of blocks.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum BlockDump {
    Response {
        #[serde(rename = "DocumentMetadata", default)]
        metadata: Option<DocumentMetadata>,
        #[serde(rename = "Blocks")]
        blocks: Vec<Block>,
    },
    Bare(Vec<Block>),
}

impl BlockDump {
    pub fn from_json(json: &str) -> Result<Self, SignalError> {
        serde_json::from_str(json).map_err(|e| SignalError::Parse(format!("Invalid block dump: {}", e)))
    }

    /// Page count declared by the response, if any.
    pub fn declared_pages(&self) -> Option<usize> {
        match self {
            BlockDump::Response { metadata, .. } => metadata.as_ref().map(|m| m.pages),
            BlockDump::Bare(_) => None,
        }
    }

    pub fn into_blocks(self) -> Vec<Block> {
        match self {
            BlockDump::Response { blocks, .. } | BlockDump::Bare(blocks) => blocks,
        }
    }
}

impl Block {
    fn is(&self, block_type: &str) -> bool {
        self.block_type == block_type
    }

    fn related(&self, kind: &'static str) -> impl Iterator<Item = &str> {
        self.relationships
            .iter()
            .filter(move |rel| rel.kind == kind)
            .flat_map(|rel| rel.ids.iter().map(String::as_str))
    }
}

struct BlockIndex<'a> {
    by_id: HashMap<&'a str, &'a Block>,
}

impl<'a> BlockIndex<'a> {
    fn new(blocks: &'a [Block]) -> Self {
        Self {
            by_id: blocks.iter().map(|b| (b.id.as_str(), b)).collect(),
        }
    }

    fn words<I: Iterator<Item = &'a str>>(&self, ids: I) -> Vec<&'a str> {
        ids.filter_map(|id| self.by_id.get(id).copied())
            .filter(|b| b.is("WORD"))
            .filter_map(|b| b.text.as_deref())
            .collect()
    }

    fn key_text(&self, key: &'a Block) -> String {
        self.words(key.related("CHILD")).join(" ").trim().to_string()
    }

    /// VALUE ids usually point at a value KEY_VALUE_SET whose CHILD ids are
    /// the words; some producers point straight at WORD blocks.
    fn value_text(&self, key: &'a Block) -> String {
        let mut words = Vec::new();
        for id in key.related("VALUE") {
            let Some(block) = self.by_id.get(id).copied() else {
                tracing::debug!("Key block {} references missing value block {}", key.id, id);
                continue;
            };
            if block.is("WORD") {
                words.extend(block.text.as_deref());
            } else {
                words.extend(self.words(block.related("CHILD")));
            }
        }
        words.join(" ").trim().to_string()
    }
}

/// Groups a document's blocks into per-page OCR artifacts.
///
/// Pages that appear in no block are absent from the map.
pub fn artifacts_by_page(blocks: &[Block]) -> BTreeMap<usize, PageArtifacts> {
    let index = BlockIndex::new(blocks);
    let mut pages: BTreeMap<usize, PageArtifacts> = BTreeMap::new();

    for block in blocks {
        let artifacts = pages.entry(block.page).or_default();

        if block.is("LINE") {
            if let Some(text) = &block.text {
                artifacts.lines.push(text.clone());
            }
        } else if block.is("KEY_VALUE_SET") && block.entity_types.iter().any(|t| t == "KEY") {
            let key = index.key_text(block);
            if key.is_empty() {
                continue;
            }
            let value = index.value_text(block);
            if let Some(previous) = artifacts.form_fields.insert(key.clone(), value) {
                tracing::debug!("Page {}: form key '{}' repeated, replacing value '{}'", block.page, key, previous);
            }
        }
    }

    pages
}

#[cfg(test)]
mod tests {
    use super::*;

    const DUMP: &str = r#"{
        "DocumentMetadata": {"Pages": 3},
        "Blocks": [
            {"Id": "p1", "BlockType": "PAGE", "Page": 1},
            {"Id": "l1", "BlockType": "LINE", "Text": "LOAN APPLICATION", "Page": 1},
            {"Id": "l2", "BlockType": "LINE", "Text": "Account Number: 123 456 789", "Page": 1},
            {"Id": "k1", "BlockType": "KEY_VALUE_SET", "EntityTypes": ["KEY"], "Page": 1,
             "Relationships": [{"Type": "CHILD", "Ids": ["w1", "w2"]}, {"Type": "VALUE", "Ids": ["v1"]}]},
            {"Id": "v1", "BlockType": "KEY_VALUE_SET", "EntityTypes": ["VALUE"], "Page": 1,
             "Relationships": [{"Type": "CHILD", "Ids": ["w3", "w4", "w5"]}]},
            {"Id": "w1", "BlockType": "WORD", "Text": "Account", "Page": 1},
            {"Id": "w2", "BlockType": "WORD", "Text": "Number:", "Page": 1},
            {"Id": "w3", "BlockType": "WORD", "Text": "123", "Page": 1},
            {"Id": "w4", "BlockType": "WORD", "Text": "456", "Page": 1},
            {"Id": "w5", "BlockType": "WORD", "Text": "789", "Page": 1},
            {"Id": "l3", "BlockType": "LINE", "Text": "Pay stub", "Page": 3},
            {"Id": "k2", "BlockType": "KEY_VALUE_SET", "EntityTypes": ["KEY"], "Page": 3,
             "Relationships": [{"Type": "CHILD", "Ids": ["w6"]}, {"Type": "VALUE", "Ids": ["w7"]}]},
            {"Id": "w6", "BlockType": "WORD", "Text": "Employer", "Page": 3},
            {"Id": "w7", "BlockType": "WORD", "Text": "Acme", "Page": 3}
        ]
    }"#;

    #[test]
    fn test_form_fields_and_lines_per_page() {
        let blocks = BlockDump::from_json(DUMP).unwrap().into_blocks();
        let pages = artifacts_by_page(&blocks);

        assert_eq!(pages.keys().copied().collect::<Vec<_>>(), vec![1, 3]);
        let first = &pages[&1];
        assert_eq!(first.lines, vec!["LOAN APPLICATION", "Account Number: 123 456 789"]);
        assert_eq!(first.form_fields.get("Account Number:").map(String::as_str), Some("123 456 789"));
        assert_eq!(pages[&3].form_fields.get("Employer").map(String::as_str), Some("Acme"));
    }

    #[test]
    fn test_bare_block_list_without_pages() {
        let json = r#"[{"Id": "l1", "BlockType": "LINE", "Text": "ACCOUNT NUMBER"}]"#;
        let blocks = BlockDump::from_json(json).unwrap().into_blocks();
        let pages = artifacts_by_page(&blocks);
        assert_eq!(pages[&1].lines, vec!["ACCOUNT NUMBER"]);
    }

    #[test]
    fn test_malformed_dump_is_parse_error() {
        assert!(matches!(BlockDump::from_json("{\"Blocks\": 3}"), Err(SignalError::Parse(_))));
    }
}
