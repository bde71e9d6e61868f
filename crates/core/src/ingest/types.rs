use serde::{Deserialize, Serialize};

/// Item search response page (`format=json`, format version 1).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemSearchResponse {
    #[serde(rename = "Items", default)]
    pub items: Vec<ItemEnvelope>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemEnvelope {
    #[serde(rename = "Item")]
    pub item: RankedItem,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedItem {
    pub item_code: String,
    #[serde(default)]
    pub item_name: String,
    #[serde(default)]
    pub item_price: i64,
    #[serde(default)]
    pub shop_name: String,
    #[serde(default)]
    pub item_url: String,
    #[serde(default)]
    pub review_count: u64,
}
