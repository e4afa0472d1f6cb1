//! Collection queries
//!
//! `$select`, `$filter`, `$orderby` and `$expand` clauses are passed through
//! verbatim; the Service Layer is the only thing that parses them.

/// A query against one collection, without paging state
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CollectionQuery {
    /// Collection path relative to the service base (e.g. "Items")
    pub collection: String,
    /// Field projection for `$select`
    pub select: Option<String>,
    /// Filter predicate for `$filter`
    pub filter: Option<String>,
    /// Sort key for `$orderby`
    pub orderby: Option<String>,
    /// Navigation expansion for `$expand`
    pub expand: Option<String>,
}

impl CollectionQuery {
    /// Query every record of `collection`
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            ..Default::default()
        }
    }

    /// Restrict the returned fields
    pub fn select(mut self, fields: impl Into<String>) -> Self {
        self.select = Some(fields.into());
        self
    }

    /// Add a filter predicate; `None` leaves the query unfiltered
    pub fn filter(mut self, predicate: Option<impl Into<String>>) -> Self {
        self.filter = predicate.map(Into::into);
        self
    }

    /// Sort by the given key
    pub fn order_by(mut self, key: impl Into<String>) -> Self {
        self.orderby = Some(key.into());
        self
    }

    /// Expand a navigation property
    pub fn expand(mut self, expansion: impl Into<String>) -> Self {
        self.expand = Some(expansion.into());
        self
    }

    /// Query parameters for one page starting at `skip`
    pub fn params(&self, page_size: u32, skip: u64) -> Vec<(String, String)> {
        let mut params = Vec::with_capacity(6);
        let clauses = [
            ("$select", &self.select),
            ("$filter", &self.filter),
            ("$orderby", &self.orderby),
            ("$expand", &self.expand),
        ];
        for (name, value) in clauses {
            if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                params.push((name.to_string(), value.to_string()));
            }
        }
        params.push(("$top".to_string(), page_size.to_string()));
        params.push(("$skip".to_string(), skip.to_string()));
        params
    }
}

/// Escape a string for use inside an OData single-quoted literal
pub fn escape_literal(value: &str) -> String {
    value.replace('\'', "''")
}
