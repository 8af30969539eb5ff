//! Declared projections from nested items to relational tables
//!
//! A [`Projection`] names every column it produces and where in the source item the value
//! comes from. Fields that are missing from an item are omitted from that row; they are
//! never an error.

use serde_json::{Map, Value};

/// Column holding the stamp applied to every main and child row
pub const STAMP_COLUMN: &str = "created_at";

/// Dotted path into a JSON object
///
/// Lookup first tries the whole path as a literal key, so already-flattened items with
/// dotted keys resolve the same way as nested ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    raw: String,
}

impl FieldPath {
    /// Create a path from its dotted form
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    /// Dotted form of the path
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Value at this path, if every segment is present
    pub fn resolve<'a>(&self, item: &'a Value) -> Option<&'a Value> {
        let object = item.as_object()?;
        if let Some(value) = object.get(&self.raw) {
            return Some(value);
        }

        let mut current = item;
        for segment in self.raw.split('.') {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }
}

/// One projected column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    /// Where the value comes from
    pub source: FieldPath,
    /// Target column name
    pub column: String,
    /// Expand an object value one level into `{column}_{key}` columns
    pub expand: bool,
    /// Column suffixes for specific keys of an expanded object; other keys are lower-cased
    pub key_names: Vec<(String, String)>,
}

impl ColumnSpec {
    /// Map `source` to `column`
    pub fn new(source: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            source: FieldPath::new(source),
            column: column.into(),
            expand: false,
            key_names: Vec::new(),
        }
    }

    /// Keep the dotted source path as the column name
    pub fn same(source: impl Into<String>) -> Self {
        let source = source.into();
        Self::new(source.clone(), source)
    }

    /// Map `source` to `{column}_{key}` columns, one per scalar key of the object found there
    pub fn expanded(source: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            expand: true,
            ..Self::new(source, column)
        }
    }

    /// Amount and currency object, e.g. `{"Amount": 9.5, "CurrencyCode": "GBP"}`, as
    /// `{column}_amount` and `{column}_currency`
    pub fn money(source: impl Into<String>, column: impl Into<String>) -> Self {
        Self::expanded(source, column).with_key_name("CurrencyCode", "currency")
    }

    /// Name the column for `key` of an expanded object `{column}_{name}`
    pub fn with_key_name(mut self, key: impl Into<String>, name: impl Into<String>) -> Self {
        self.key_names.push((key.into(), name.into()));
        self
    }

    fn expanded_column(&self, key: &str) -> String {
        let suffix = self
            .key_names
            .iter()
            .find(|(k, _)| k == key)
            .map_or_else(|| key.to_ascii_lowercase(), |(_, name)| name.clone());
        format!("{}_{suffix}", self.column)
    }

    /// Write this column's value(s) from `item` into `row`
    pub fn project(&self, item: &Value, row: &mut Map<String, Value>) {
        let Some(value) = self.source.resolve(item) else {
            return;
        };

        match (self.expand, value) {
            (true, Value::Object(fields)) => {
                for (key, nested) in fields {
                    if !nested.is_object() {
                        row.insert(self.expanded_column(key), nested.clone());
                    }
                }
            }
            _ => {
                row.insert(self.column.clone(), value.clone());
            }
        }
    }
}

/// A child table built from one list-valued field of each item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildSpec {
    /// Target table name
    pub table: String,
    /// Path of the list inside the item
    pub list_path: FieldPath,
    /// Columns read from each list element
    pub columns: Vec<ColumnSpec>,
}

impl ChildSpec {
    /// Create a child table spec
    pub fn new(table: impl Into<String>, list_path: impl Into<String>, columns: Vec<ColumnSpec>) -> Self {
        Self {
            table: table.into(),
            list_path: FieldPath::new(list_path),
            columns,
        }
    }
}

/// Full projection: main table, child tables and how they are linked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    /// Main table name
    pub main_table: String,
    /// Columns of the main table
    pub main_columns: Vec<ColumnSpec>,
    /// Columns copied from the parent item into every child row
    pub inherited_columns: Vec<ColumnSpec>,
    /// Child tables
    pub children: Vec<ChildSpec>,
    /// Child column that receives the main row's durable identifier
    pub foreign_key_column: String,
}

impl Projection {
    /// Competitive pricing items keyed by ASIN or seller SKU
    ///
    /// Produces `competitive_pricing_main{suffix}` with children `sales_rankings{suffix}`,
    /// `offer_listings{suffix}` and `competitive_prices{suffix}`.
    pub fn competitive_pricing(suffix: &str) -> Self {
        let main_columns = [
            "SellerSKU",
            "status",
            "Product.Identifiers.SKUIdentifier.MarketplaceId",
            "Product.Identifiers.SKUIdentifier.SellerId",
            "Product.Identifiers.SKUIdentifier.SellerSKU",
            "Product.Identifiers.MarketplaceASIN.MarketplaceId",
            "Product.Identifiers.MarketplaceASIN.ASIN",
        ]
        .into_iter()
        .map(ColumnSpec::same)
        .collect();

        let children = vec![
            ChildSpec::new(
                format!("sales_rankings{suffix}"),
                "Product.SalesRankings",
                vec![
                    ColumnSpec::new("ProductCategoryId", "product_category_id"),
                    ColumnSpec::new("Rank", "rank"),
                ],
            ),
            ChildSpec::new(
                format!("offer_listings{suffix}"),
                "Product.CompetitivePricing.NumberOfOfferListings",
                vec![
                    ColumnSpec::new("condition", "condition"),
                    ColumnSpec::new("Count", "count"),
                ],
            ),
            ChildSpec::new(
                format!("competitive_prices{suffix}"),
                "Product.CompetitivePricing.CompetitivePrices",
                vec![
                    ColumnSpec::new("belongsToRequester", "belongs_to_requester"),
                    ColumnSpec::new("condition", "condition"),
                    ColumnSpec::new("fulfillmentChannel", "fulfillment_channel"),
                    ColumnSpec::new("offerType", "offer_type"),
                    ColumnSpec::money("Price.ListingPrice", "price"),
                    ColumnSpec::money("Price.Shipping", "shipping"),
                    ColumnSpec::new("subcategory", "subcategory"),
                ],
            ),
        ];

        Self {
            main_table: format!("competitive_pricing_main{suffix}"),
            main_columns,
            inherited_columns: vec![ColumnSpec::new("SellerSKU", "seller_sku")],
            children,
            foreign_key_column: "competitive_pricing_main_id".to_string(),
        }
    }

    /// Names of every table this projection writes, main table first
    pub fn table_names(&self) -> Vec<String> {
        std::iter::once(self.main_table.clone())
            .chain(self.children.iter().map(|c| c.table.clone()))
            .collect()
    }
}
