//! Request descriptors: the normalized parameters of one remote operation.
//!
//! JSON-bearing options (`query`, `set_fields`, `sort_order`) are carried as raw
//! text and handed to the remote API untouched; a malformed filter is reported by
//! the API, not here.

use serde_json::Value;

use crate::error::{Error, Result};

/// Database and collection names become URL path segments, where an empty,
/// `.` or `..` segment would address a different resource.
pub fn check_name(name: &str) -> Result<()> {
    match name {
        "" | "." | ".." => Err(Error::InvalidName(name.to_string())),
        _ => Ok(()),
    }
}

/// Options of `find`. All fields default to "not given".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    /// JSON filter document.
    pub query: Option<String>,
    /// Return the number of matches instead of the documents.
    pub result_count: bool,
    /// JSON projection, 1 to include a field and 0 to exclude it.
    pub set_fields: Option<String>,
    /// Return a single document.
    pub find_one: bool,
    /// JSON sort spec, 1 ascending and -1 descending.
    pub sort_order: Option<String>,
    pub skip: Option<u64>,
    pub limit: Option<u64>,
}

/// Options of `update`. By default exactly one matching document is modified
/// and nothing is inserted when no document matches.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateOptions {
    pub query: Option<String>,
    pub all_documents: bool,
    pub upsert: bool,
}

/// Options of `delete`. Without a query every document is eligible.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeleteOptions {
    pub query: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FindRequest {
    pub database: String,
    pub collection: String,
    pub options: FindOptions,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsertRequest {
    pub database: String,
    pub collection: String,
    pub documents: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateRequest {
    pub database: String,
    pub collection: String,
    pub data: Value,
    pub options: UpdateOptions,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteRequest {
    pub database: String,
    pub collection: String,
    pub options: DeleteOptions,
}

impl FindRequest {
    /// Query-string parameters in Data API naming.
    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        let o = &self.options;
        let mut params = Vec::new();
        if let Some(q) = &o.query {
            params.push(("q", q.clone()));
        }
        if o.result_count {
            params.push(("c", "true".to_string()));
        }
        if let Some(f) = &o.set_fields {
            params.push(("f", f.clone()));
        }
        if o.find_one {
            params.push(("fo", "true".to_string()));
        }
        if let Some(s) = &o.sort_order {
            params.push(("s", s.clone()));
        }
        if let Some(sk) = o.skip {
            params.push(("sk", sk.to_string()));
        }
        if let Some(l) = o.limit {
            params.push(("l", l.to_string()));
        }
        params
    }
}

impl UpdateRequest {
    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(q) = &self.options.query {
            params.push(("q", q.clone()));
        }
        if self.options.all_documents {
            params.push(("m", "true".to_string()));
        }
        if self.options.upsert {
            params.push(("u", "true".to_string()));
        }
        params
    }
}

impl DeleteRequest {
    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        self.options
            .query
            .iter()
            .map(|q| ("q", q.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn find(options: FindOptions) -> FindRequest {
        FindRequest {
            database: "app".into(),
            collection: "users".into(),
            options,
        }
    }

    #[test]
    fn test_find_defaults_send_nothing() {
        assert!(find(FindOptions::default()).query_params().is_empty());
    }

    #[test]
    fn test_find_all_options() {
        let req = find(FindOptions {
            query: Some(r#"{"age":{"$gt":30}}"#.into()),
            result_count: true,
            set_fields: Some(r#"{"name":1}"#.into()),
            find_one: true,
            sort_order: Some(r#"{"age":-1}"#.into()),
            skip: Some(5),
            limit: Some(10),
        });
        assert_eq!(
            req.query_params(),
            vec![
                ("q", r#"{"age":{"$gt":30}}"#.to_string()),
                ("c", "true".to_string()),
                ("f", r#"{"name":1}"#.to_string()),
                ("fo", "true".to_string()),
                ("s", r#"{"age":-1}"#.to_string()),
                ("sk", "5".to_string()),
                ("l", "10".to_string()),
            ]
        );
    }

    #[test]
    fn test_find_query_is_not_validated() {
        let req = find(FindOptions {
            query: Some("{broken".into()),
            ..Default::default()
        });
        assert_eq!(req.query_params(), vec![("q", "{broken".to_string())]);
    }

    #[test]
    fn test_update_flags() {
        let mut req = UpdateRequest {
            database: "app".into(),
            collection: "users".into(),
            data: json!({"$set": {"x": 1}}),
            options: UpdateOptions::default(),
        };
        assert!(req.query_params().is_empty());

        req.options = UpdateOptions {
            query: Some(r#"{"x":0}"#.into()),
            all_documents: true,
            upsert: true,
        };
        assert_eq!(
            req.query_params(),
            vec![
                ("q", r#"{"x":0}"#.to_string()),
                ("m", "true".to_string()),
                ("u", "true".to_string()),
            ]
        );
    }

    #[test]
    fn test_delete_without_query_targets_everything() {
        let req = DeleteRequest {
            database: "app".into(),
            collection: "users".into(),
            options: DeleteOptions::default(),
        };
        assert!(req.query_params().is_empty());
    }

    #[test]
    fn test_check_name() {
        assert!(check_name("users").is_ok());
        assert!(check_name("...").is_ok());
        assert!(check_name("a.b").is_ok());
        for bad in ["", ".", ".."] {
            assert!(matches!(check_name(bad), Err(Error::InvalidName(n)) if n == bad));
        }
    }
}
