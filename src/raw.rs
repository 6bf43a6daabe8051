//! Raw input shapes produced by external collaborators (file parsers).
//!
//! The core never parses `.tree`/`.ftree`/`.clu` files itself; loaders hand
//! over one [`RawNetwork`] per clustering result. The `identifier` field is
//! the cross-network matching key and is produced upstream according to the
//! user-selected matching mode (numeric id vs. name).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

use crate::errors::AlluvialResult;
use crate::tree_path::TreePath;

pub const NOT_HIGHLIGHTED: i32 = -1;

/// One clustering result (one input file / time point).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawNetwork {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub codelength: f64,
    pub nodes: Vec<RawNode>,
}

/// One leaf node as delivered by a loader.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawNode {
    pub id: u64,
    pub flow: f64,
    pub path: RawPath,
    #[serde(default)]
    pub name: Option<String>,
    pub identifier: String,
    #[serde(default)]
    pub state_id: Option<u64>,
    #[serde(default)]
    pub layer_id: Option<u64>,
    #[serde(default = "default_highlight_index")]
    pub highlight_index: i32,
    #[serde(default = "default_module_level")]
    pub module_level: usize,
    #[serde(default)]
    pub metadata: Option<Value>,
}

fn default_highlight_index() -> i32 {
    NOT_HIGHLIGHTED
}

fn default_module_level() -> usize {
    1
}

/// Loaders deliver paths either pre-split or as the original string.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RawPath {
    Ranks(Vec<u32>),
    Text(String),
}

impl RawPath {
    pub fn to_tree_path(&self) -> AlluvialResult<TreePath> {
        match self {
            RawPath::Ranks(ranks) => Ok(TreePath::from_ranks(ranks)),
            RawPath::Text(text) => TreePath::from_str(text),
        }
    }
}

impl From<&str> for RawPath {
    fn from(value: &str) -> Self {
        RawPath::Text(value.to_string())
    }
}
