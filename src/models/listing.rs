//! Listing record model.

use serde::{Deserialize, Serialize};

/// Placeholder stored in a field that could not be extracted.
pub const NOT_AVAILABLE: &str = "N/A";

/// Export column headers, in field order.
pub const COLUMNS: [&str; 6] = [
    "Address",
    "Price",
    "Listing URL",
    "Bedrooms",
    "Bathrooms",
    "Square Footage",
];

/// One property listing as it appeared on a results page.
///
/// All values are free text exactly as extracted; nothing is parsed into
/// numbers. A field that was missing from the markup holds [`NOT_AVAILABLE`]
/// so every record has the same shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingRecord {
    #[serde(rename = "Address")]
    address: String,
    #[serde(rename = "Price")]
    price: String,
    #[serde(rename = "Listing URL")]
    url: String,
    #[serde(rename = "Bedrooms")]
    bedrooms: String,
    #[serde(rename = "Bathrooms")]
    bathrooms: String,
    #[serde(rename = "Square Footage")]
    square_footage: String,
}

impl ListingRecord {
    /// Start building a record; unset fields become [`NOT_AVAILABLE`].
    pub fn builder() -> ListingRecordBuilder {
        ListingRecordBuilder::default()
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn price(&self) -> &str {
        &self.price
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn bedrooms(&self) -> &str {
        &self.bedrooms
    }

    pub fn bathrooms(&self) -> &str {
        &self.bathrooms
    }

    pub fn square_footage(&self) -> &str {
        &self.square_footage
    }

    /// Field values in export column order.
    pub fn values(&self) -> [&str; 6] {
        [
            &self.address,
            &self.price,
            &self.url,
            &self.bedrooms,
            &self.bathrooms,
            &self.square_footage,
        ]
    }

    /// Number of fields holding the sentinel.
    pub fn missing_fields(&self) -> usize {
        self.values()
            .iter()
            .filter(|v| **v == NOT_AVAILABLE)
            .count()
    }
}

/// Builder for [`ListingRecord`].
#[derive(Debug, Default, Clone)]
pub struct ListingRecordBuilder {
    address: Option<String>,
    price: Option<String>,
    url: Option<String>,
    bedrooms: Option<String>,
    bathrooms: Option<String>,
    square_footage: Option<String>,
}

impl ListingRecordBuilder {
    pub fn address(mut self, value: Option<String>) -> Self {
        self.address = value;
        self
    }

    pub fn price(mut self, value: Option<String>) -> Self {
        self.price = value;
        self
    }

    pub fn url(mut self, value: Option<String>) -> Self {
        self.url = value;
        self
    }

    pub fn bedrooms(mut self, value: Option<String>) -> Self {
        self.bedrooms = value;
        self
    }

    pub fn bathrooms(mut self, value: Option<String>) -> Self {
        self.bathrooms = value;
        self
    }

    pub fn square_footage(mut self, value: Option<String>) -> Self {
        self.square_footage = value;
        self
    }

    pub fn build(self) -> ListingRecord {
        fn or_sentinel(value: Option<String>) -> String {
            value
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| NOT_AVAILABLE.to_string())
        }

        ListingRecord {
            address: or_sentinel(self.address),
            price: or_sentinel(self.price),
            url: or_sentinel(self.url),
            bedrooms: or_sentinel(self.bedrooms),
            bathrooms: or_sentinel(self.bathrooms),
            square_footage: or_sentinel(self.square_footage),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_fields_hold_sentinel() {
        let record = ListingRecord::builder()
            .address(Some("123 Main St".to_string()))
            .build();

        assert_eq!(record.address(), "123 Main St");
        assert_eq!(record.price(), NOT_AVAILABLE);
        assert_eq!(record.square_footage(), NOT_AVAILABLE);
        assert_eq!(record.missing_fields(), 5);
    }

    #[test]
    fn test_empty_string_is_missing() {
        let record = ListingRecord::builder().price(Some(String::new())).build();
        assert_eq!(record.price(), NOT_AVAILABLE);
    }

    #[test]
    fn test_values_follow_column_order() {
        let record = ListingRecord::builder()
            .address(Some("a".into()))
            .price(Some("b".into()))
            .url(Some("c".into()))
            .bedrooms(Some("d".into()))
            .bathrooms(Some("e".into()))
            .square_footage(Some("f".into()))
            .build();
        assert_eq!(record.values(), ["a", "b", "c", "d", "e", "f"]);
        assert_eq!(record.values().len(), COLUMNS.len());
    }
}
