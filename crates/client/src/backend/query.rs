//! Query description shared by all data services.
//!
//! Column lists use the record API's select syntax, including embedded
//! relations: `*,order_items(quantity,price,menu_items(name))`.

use serde_json::Value;

use super::{BackendError, Collection};

/// One entry of a select list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    /// Every column (`*`).
    All,
    /// A single column.
    Column(String),
    /// A related collection, rendered as a nested array (one-to-many) or
    /// object (many-to-one).
    Embed {
        collection: Collection,
        fields: Vec<Field>,
    },
}

impl Field {
    fn render(&self, out: &mut String) {
        match self {
            Self::All => out.push('*'),
            Self::Column(name) => out.push_str(name),
            Self::Embed { collection, fields } => {
                out.push_str(collection.table());
                out.push('(');
                render_fields(fields, out);
                out.push(')');
            }
        }
    }
}

fn render_fields(fields: &[Field], out: &mut String) {
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        field.render(out);
    }
}

/// Equality filter on one column.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub value: Value,
}

impl Filter {
    /// `column = value`. A `null` value matches missing/null columns.
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }

    /// Render as a PostgREST query parameter.
    #[must_use]
    pub fn to_param(&self) -> (String, String) {
        let condition = match &self.value {
            Value::Null => "is.null".to_string(),
            Value::String(s) => format!("eq.{s}"),
            other => format!("eq.{other}"),
        };
        (self.column.clone(), condition)
    }
}

/// Sort key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub column: String,
    pub ascending: bool,
}

/// A read request: columns and embeds, filters, ordering and limit.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    fields: Vec<Field>,
    filters: Vec<Filter>,
    order: Vec<OrderBy>,
    limit: Option<usize>,
}

impl Default for Query {
    fn default() -> Self {
        Self::all()
    }
}

impl Query {
    /// Select every column, no filters.
    #[must_use]
    pub fn all() -> Self {
        Self {
            fields: vec![Field::All],
            filters: Vec::new(),
            order: Vec::new(),
            limit: None,
        }
    }

    /// Parse a select list such as `id,status,order_items(id,menu_items(name))`.
    ///
    /// Whitespace (including newlines) is ignored.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::InvalidQuery` on malformed syntax or an embed
    /// naming an unknown collection.
    pub fn select(spec: &str) -> Result<Self, BackendError> {
        let compact: String = spec.chars().filter(|c| !c.is_whitespace()).collect();
        let mut parser = SelectParser {
            input: compact.as_bytes(),
            pos: 0,
        };
        let fields = parser.list()?;
        if parser.pos != parser.input.len() {
            return Err(parser.error("unexpected trailing input"));
        }

        Ok(Self {
            fields,
            ..Self::all()
        })
    }

    /// Add an equality filter.
    #[must_use]
    pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::eq(column, value));
        self
    }

    /// Add a sort key. Keys apply in the order they are added.
    #[must_use]
    pub fn order_by(mut self, column: impl Into<String>, ascending: bool) -> Self {
        self.order.push(OrderBy {
            column: column.into(),
            ascending,
        });
        self
    }

    /// Return at most `n` rows.
    #[must_use]
    pub const fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    #[must_use]
    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    #[must_use]
    pub fn ordering(&self) -> &[OrderBy] {
        &self.order
    }

    #[must_use]
    pub const fn row_limit(&self) -> Option<usize> {
        self.limit
    }

    /// Render the select list.
    #[must_use]
    pub fn select_param(&self) -> String {
        let mut out = String::new();
        render_fields(&self.fields, &mut out);
        out
    }

    /// Render as PostgREST query parameters.
    #[must_use]
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![("select".to_string(), self.select_param())];
        params.extend(self.filters.iter().map(Filter::to_param));
        if !self.order.is_empty() {
            let order = self
                .order
                .iter()
                .map(|o| {
                    format!(
                        "{}.{}",
                        o.column,
                        if o.ascending { "asc" } else { "desc" }
                    )
                })
                .collect::<Vec<_>>()
                .join(",");
            params.push(("order".to_string(), order));
        }
        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }
        params
    }
}

struct SelectParser<'a> {
    input: &'a [u8],
    pos: usize,
}

impl SelectParser<'_> {
    fn error(&self, what: &str) -> BackendError {
        BackendError::InvalidQuery(format!("{what} at position {} in select", self.pos))
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn list(&mut self) -> Result<Vec<Field>, BackendError> {
        let mut fields = vec![self.field()?];
        while self.peek() == Some(b',') {
            self.pos += 1;
            fields.push(self.field()?);
        }
        Ok(fields)
    }

    fn field(&mut self) -> Result<Field, BackendError> {
        if self.peek() == Some(b'*') {
            self.pos += 1;
            return Ok(Field::All);
        }

        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == b'_')
        {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(self.error("expected column name"));
        }
        let name = String::from_utf8_lossy(&self.input[start..self.pos]).into_owned();

        if self.peek() != Some(b'(') {
            return Ok(Field::Column(name));
        }

        let collection = Collection::from_table(&name)
            .ok_or_else(|| BackendError::InvalidQuery(format!("unknown relation '{name}'")))?;
        self.pos += 1;
        let fields = self.list()?;
        if self.peek() != Some(b')') {
            return Err(self.error("expected ')'"));
        }
        self.pos += 1;

        Ok(Field::Embed { collection, fields })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested_select() {
        let query = Query::select(
            "
            id,
            status,
            order_items (
              quantity,
              menu_items ( id, name )
            )
        ",
        )
        .unwrap();

        assert_eq!(
            query.fields(),
            &[
                Field::Column("id".into()),
                Field::Column("status".into()),
                Field::Embed {
                    collection: Collection::OrderItems,
                    fields: vec![
                        Field::Column("quantity".into()),
                        Field::Embed {
                            collection: Collection::MenuItems,
                            fields: vec![Field::Column("id".into()), Field::Column("name".into())],
                        },
                    ],
                },
            ]
        );
        assert_eq!(
            query.select_param(),
            "id,status,order_items(quantity,menu_items(id,name))"
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(Query::select("").is_err());
        assert!(Query::select("id,").is_err());
        assert!(Query::select("order_items(id").is_err());
        assert!(Query::select("widgets(id)").is_err());
        assert!(Query::select("id)").is_err());
    }

    #[test]
    fn test_postgrest_params() {
        let query = Query::select("*,order_items(quantity,price,menu_items(name))")
            .unwrap()
            .eq("user_id", "4f0c5c1e-8a7e-4d52-9d7c-2b8f5b0c9e11")
            .eq("is_available", true)
            .eq("notes", Value::Null)
            .order_by("created_at", false)
            .limit(10);

        assert_eq!(
            query.to_params(),
            vec![
                (
                    "select".to_string(),
                    "*,order_items(quantity,price,menu_items(name))".to_string()
                ),
                (
                    "user_id".to_string(),
                    "eq.4f0c5c1e-8a7e-4d52-9d7c-2b8f5b0c9e11".to_string()
                ),
                ("is_available".to_string(), "eq.true".to_string()),
                ("notes".to_string(), "is.null".to_string()),
                ("order".to_string(), "created_at.desc".to_string()),
                ("limit".to_string(), "10".to_string()),
            ]
        );
    }

    #[test]
    fn test_default_is_select_all() {
        let query = Query::default();
        assert_eq!(query.to_params(), vec![("select".to_string(), "*".to_string())]);
    }
}
