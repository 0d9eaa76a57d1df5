//! PQL statement construction.

use std::collections::BTreeMap;

use crate::pql::errors::StatementError;
use crate::pql::value::{value_map_entry, BindValue, TypedValue};
use crate::soap::{SoapObject, SoapValue, Utility};

/// Page size recommended for paging through PQL results.
pub const SUGGESTED_PAGE_LIMIT: u32 = 500;

/// A rendered PQL statement with its bind variables.
#[derive(Clone, Debug, PartialEq)]
pub struct Statement {
    query: String,
    values: Vec<SoapValue>,
}

impl Statement {
    /// Creates a statement from a query and `String_ValueMapEntry` values.
    #[must_use]
    pub fn new(query: impl Into<String>, values: Vec<SoapValue>) -> Self {
        Self {
            query: query.into(),
            values,
        }
    }

    /// The query text.
    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    /// The bind variables.
    #[must_use]
    pub fn values(&self) -> &[SoapValue] {
        &self.values
    }
}

impl From<Statement> for SoapValue {
    /// The `Statement` object; `values` is omitted when there are none.
    fn from(statement: Statement) -> Self {
        let mut object = SoapObject::new().with("query", statement.query);
        if !statement.values.is_empty() {
            object.set("values", SoapValue::List(statement.values));
        }
        Self::Object(object)
    }
}

/// Builds PQL statements clause by clause.
///
/// `limit` defaults to [`SUGGESTED_PAGE_LIMIT`] and `offset` to 0; pass
/// `None` to drop either clause.
///
/// # Example
///
/// ```rust
/// use googleads::pql::StatementBuilder;
///
/// let statement = StatementBuilder::new()
///     .select("Id, Name")
///     .from("Line_Item")
///     .where_clause("Status = :status")
///     .order_by("Id", true)
///     .with_bind_variable("status", "READY")
///     .unwrap()
///     .to_statement()
///     .unwrap();
///
/// assert_eq!(
///     statement.query(),
///     "SELECT Id, Name FROM Line_Item WHERE Status = :status ORDER BY Id ASC LIMIT 500 OFFSET 0"
/// );
/// assert_eq!(statement.values().len(), 1);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct StatementBuilder {
    select: Option<String>,
    from: Option<String>,
    where_clause: Option<String>,
    order_by: Option<(String, bool)>,
    limit: Option<u32>,
    offset: Option<u32>,
    values: BTreeMap<String, TypedValue>,
}

impl Default for StatementBuilder {
    fn default() -> Self {
        Self {
            select: None,
            from: None,
            where_clause: None,
            order_by: None,
            limit: Some(SUGGESTED_PAGE_LIMIT),
            offset: Some(0),
            values: BTreeMap::new(),
        }
    }
}

impl StatementBuilder {
    /// Creates a builder with the default limit and offset.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the selected columns, e.g. `Id, Name`.
    #[must_use]
    pub fn select(mut self, columns: impl Into<String>) -> Self {
        self.select = Some(columns.into());
        self
    }

    /// Sets the table.
    #[must_use]
    pub fn from(mut self, table: impl Into<String>) -> Self {
        self.from = Some(table.into());
        self
    }

    /// Sets the `WHERE` condition.
    #[must_use]
    pub fn where_clause(mut self, condition: impl Into<String>) -> Self {
        self.where_clause = Some(condition.into());
        self
    }

    /// Orders by a column.
    #[must_use]
    pub fn order_by(mut self, column: impl Into<String>, ascending: bool) -> Self {
        self.order_by = Some((column.into(), ascending));
        self
    }

    /// Sets or clears the `LIMIT`.
    #[must_use]
    pub fn limit(mut self, limit: impl Into<Option<u32>>) -> Self {
        self.limit = limit.into();
        self
    }

    /// Sets or clears the `OFFSET`.
    #[must_use]
    pub fn offset(mut self, offset: impl Into<Option<u32>>) -> Self {
        self.offset = offset.into();
        self
    }

    /// Advances the offset by the limit, for paging. The offset saturates at
    /// `u32::MAX`.
    #[must_use]
    pub fn next_page(mut self) -> Self {
        self.offset = Some(
            self.offset
                .unwrap_or(0)
                .saturating_add(self.limit.unwrap_or(SUGGESTED_PAGE_LIMIT)),
        );
        self
    }

    /// Binds a variable, replacing any previous value for the key.
    ///
    /// # Errors
    ///
    /// Returns a [`StatementError`] for naive date-times, mixed sets and
    /// values with no PQL representation.
    pub fn with_bind_variable(
        mut self,
        key: impl Into<String>,
        value: impl Into<BindValue>,
    ) -> Result<Self, StatementError> {
        let value = TypedValue::try_from(value.into())?;
        self.values.insert(key.into(), value);
        Ok(self)
    }

    /// Removes a bound variable.
    #[must_use]
    pub fn without_bind_variable(mut self, key: &str) -> Self {
        self.values.remove(key);
        self
    }

    /// The bound variables by key.
    #[must_use]
    pub const fn bind_variables(&self) -> &BTreeMap<String, TypedValue> {
        &self.values
    }

    /// The configured limit.
    #[must_use]
    pub const fn limit_value(&self) -> Option<u32> {
        self.limit
    }

    /// The configured offset.
    #[must_use]
    pub const fn offset_value(&self) -> Option<u32> {
        self.offset
    }

    /// Renders the query and bind variables.
    ///
    /// # Errors
    ///
    /// Returns [`StatementError::MissingFrom`] or
    /// [`StatementError::MissingSelect`] when only one of the two is set.
    pub fn to_statement(&self) -> Result<Statement, StatementError> {
        let values = self
            .values
            .iter()
            .map(|(key, value)| value_map_entry(key, value))
            .collect();
        Ok(Statement::new(self.query()?, values))
    }

    fn query(&self) -> Result<String, StatementError> {
        let mut clauses = Vec::new();
        match (&self.select, &self.from) {
            (Some(select), Some(from)) => clauses.push(format!("SELECT {select} FROM {from}")),
            (Some(_), None) => return Err(StatementError::MissingFrom),
            (None, Some(_)) => return Err(StatementError::MissingSelect),
            (None, None) => {}
        }
        if let Some(condition) = &self.where_clause {
            clauses.push(format!("WHERE {condition}"));
        }
        if let Some((column, ascending)) = &self.order_by {
            let direction = if *ascending { "ASC" } else { "DESC" };
            clauses.push(format!("ORDER BY {column} {direction}"));
        }
        if let Some(limit) = self.limit {
            clauses.push(format!("LIMIT {limit}"));
        }
        if let Some(offset) = self.offset {
            clauses.push(format!("OFFSET {offset}"));
        }
        Ok(clauses.join(" "))
    }
}

impl Utility for StatementBuilder {
    fn utility_name(&self) -> &'static str {
        "StatementBuilder"
    }
}

/// A `WHERE` condition with a fixed `LIMIT`/`OFFSET` suffix.
///
/// Kept for callers that predate [`StatementBuilder`].
#[derive(Clone, Debug, PartialEq)]
pub struct FilterStatement {
    where_clause: String,
    values: Vec<SoapValue>,
    limit: u32,
    offset: u32,
}

impl FilterStatement {
    /// Creates a statement for a condition, with limit 500 and offset 0.
    #[must_use]
    pub fn new(where_clause: impl Into<String>) -> Self {
        Self {
            where_clause: where_clause.into(),
            values: Vec::new(),
            limit: SUGGESTED_PAGE_LIMIT,
            offset: 0,
        }
    }

    /// Sets pre-built `String_ValueMapEntry` values.
    #[must_use]
    pub fn with_values(mut self, values: Vec<SoapValue>) -> Self {
        self.values = values;
        self
    }

    /// Sets the limit.
    #[must_use]
    pub const fn limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    /// Sets the offset.
    #[must_use]
    pub const fn offset(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }

    /// Renders `"<where> LIMIT <limit> OFFSET <offset>"`.
    #[must_use]
    pub fn to_statement(&self) -> Statement {
        Statement::new(
            format!(
                "{} LIMIT {} OFFSET {}",
                self.where_clause, self.limit, self.offset
            ),
            self.values.clone(),
        )
    }
}

impl Utility for FilterStatement {
    fn utility_name(&self) -> &'static str {
        "FilterStatement"
    }
}
