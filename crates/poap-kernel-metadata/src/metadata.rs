//! Token metadata documents and their normalization.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{MetadataError, Result};
use crate::gateway::GatewayRules;

pub const DEFAULT_NAME: &str = "Unnamed NFT";
pub const DEFAULT_DESCRIPTION: &str = "No description available";
pub const DEFAULT_IMAGE: &str = "https://placehold.co/400x400?text=NFT";

pub const PLACEHOLDER_NAME: &str = "Error Loading NFT";
pub const PLACEHOLDER_DESCRIPTION: &str = "Token metadata could not be loaded";
pub const PLACEHOLDER_IMAGE: &str = "https://placehold.co/400x400?text=Error";

/// One trait of a token. `value` is never null and `trait_type` never empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub trait_type: String,
    pub value: Value,
}

/// A fully populated metadata document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenMetadata {
    pub name: String,
    pub description: String,
    pub image: String,
    pub attributes: Vec<Attribute>,
}

impl TokenMetadata {
    /// Stand-in for a document that could not be loaded.
    pub fn placeholder() -> Self {
        Self {
            name: PLACEHOLDER_NAME.into(),
            description: PLACEHOLDER_DESCRIPTION.into(),
            image: PLACEHOLDER_IMAGE.into(),
            attributes: Vec::new(),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.name == PLACEHOLDER_NAME && self.image == PLACEHOLDER_IMAGE
    }

    /// First attribute with this trait type.
    pub fn attribute(&self, trait_type: &str) -> Option<&Value> {
        self.attributes
            .iter()
            .find(|a| a.trait_type == trait_type)
            .map(|a| &a.value)
    }

    /// Attribute value rendered as text: strings verbatim, other values as
    /// JSON.
    pub fn attribute_text(&self, trait_type: &str) -> Option<String> {
        self.attribute(trait_type).map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }
}

fn text_field(doc: &Map<String, Value>, key: &str) -> Option<String> {
    doc.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Normalize a parsed document, filling every missing field.
///
/// Fails only when the document is not a JSON object.
pub fn normalize(raw: &Value, gateways: &GatewayRules) -> Result<TokenMetadata> {
    let doc = raw
        .as_object()
        .ok_or_else(|| MetadataError::Malformed("metadata is not a JSON object".into()))?;

    let image = text_field(doc, "image")
        .map(|img| gateways.resolve(&img).unwrap_or(img))
        .unwrap_or_else(|| DEFAULT_IMAGE.into());

    let attributes = doc
        .get("attributes")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(attribute_from).collect())
        .unwrap_or_default();

    Ok(TokenMetadata {
        name: text_field(doc, "name").unwrap_or_else(|| DEFAULT_NAME.into()),
        description: text_field(doc, "description")
            .unwrap_or_else(|| DEFAULT_DESCRIPTION.into()),
        image,
        attributes,
    })
}

fn attribute_from(item: &Value) -> Option<Attribute> {
    let entry = item.as_object()?;
    let trait_type = entry
        .get("trait_type")
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())?;
    let value = entry.get("value").filter(|v| !v.is_null())?;
    Some(Attribute {
        trait_type: trait_type.to_string(),
        value: value.clone(),
    })
}

/// Parse and normalize a response body.
pub fn normalize_bytes(body: &[u8], gateways: &GatewayRules) -> Result<TokenMetadata> {
    let raw: Value = serde_json::from_slice(body)?;
    normalize(&raw, gateways)
}
