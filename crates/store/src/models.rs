//! Records that map onto to-do list documents.
//!
//! These are *persistence* models: plain data plus the conversion from the
//! stored BSON shape. Stored layout of one list:
//!
//! ```text
//! { _id: ObjectId, name: String, items: [ { id: String, item: String, checked: bool } ] }
//! ```

use mongodb::bson::document::ValueAccessError;
use mongodb::bson::{doc, Bson, Document};
use serde::{Deserialize, Serialize};

use crate::DbError;

// ---------------------------------------------------------------------------
// Wire field names
// ---------------------------------------------------------------------------

pub const FIELD_ID: &str = "_id";
pub const FIELD_NAME: &str = "name";
pub const FIELD_ITEMS: &str = "items";
/// Computed by the summary projection; never persisted.
pub const FIELD_ITEM_COUNT: &str = "item_count";
pub const FIELD_ITEM_ID: &str = "id";
/// Items keep their label under `item`, an inherited schema name.
/// [`ListItem::label`] is the only place that name is translated.
pub const FIELD_ITEM_LABEL: &str = "item";
pub const FIELD_ITEM_CHECKED: &str = "checked";

// ---------------------------------------------------------------------------
// ListSummary
// ---------------------------------------------------------------------------

/// Cheap view of a list: its name and how many items it held at query time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListSummary {
    pub id: String,
    pub name: String,
    pub item_count: u32,
}

impl ListSummary {
    /// Build a summary from a document produced by the summary projection
    /// (`_id`, `name`, `item_count`).
    pub fn from_document(doc: &Document) -> Result<Self, DbError> {
        let item_count = match doc.get(FIELD_ITEM_COUNT) {
            Some(Bson::Int32(n)) => i64::from(*n),
            Some(Bson::Int64(n)) => *n,
            Some(other) => {
                return Err(DbError::malformed(
                    FIELD_ITEM_COUNT,
                    format!("has type {:?}, expected an integer", other.element_type()),
                ))
            }
            None => return Err(DbError::malformed(FIELD_ITEM_COUNT, "is missing")),
        };
        let item_count = u32::try_from(item_count).map_err(|_| {
            DbError::malformed(FIELD_ITEM_COUNT, format!("{item_count} is not a valid count"))
        })?;

        Ok(Self {
            id: object_id_hex(doc)?,
            name: string_field(doc, FIELD_NAME)?,
            item_count,
        })
    }
}

// ---------------------------------------------------------------------------
// ListItem
// ---------------------------------------------------------------------------

/// One entry of a list. `id` is unique within its parent list only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListItem {
    pub id: String,
    /// Stored under [`FIELD_ITEM_LABEL`].
    pub label: String,
    pub checked: bool,
}

impl ListItem {
    pub fn from_document(item: &Document) -> Result<Self, DbError> {
        Ok(Self {
            id: string_field(item, FIELD_ITEM_ID)?,
            label: string_field(item, FIELD_ITEM_LABEL)?,
            checked: item
                .get_bool(FIELD_ITEM_CHECKED)
                .map_err(|err| access_error(FIELD_ITEM_CHECKED, err))?,
        })
    }

    /// The stored shape of this item.
    pub fn to_document(&self) -> Document {
        doc! {
            FIELD_ITEM_ID: self.id.as_str(),
            FIELD_ITEM_LABEL: self.label.as_str(),
            FIELD_ITEM_CHECKED: self.checked,
        }
    }
}

// ---------------------------------------------------------------------------
// TodoList
// ---------------------------------------------------------------------------

/// A full list with its items in stored order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoList {
    pub id: String,
    pub name: String,
    pub items: Vec<ListItem>,
}

impl TodoList {
    /// Convert a whole list document. Fails on the first bad item; no partial
    /// list is ever returned.
    pub fn from_document(doc: &Document) -> Result<Self, DbError> {
        let raw_items = doc
            .get_array(FIELD_ITEMS)
            .map_err(|err| access_error(FIELD_ITEMS, err))?;

        let items = raw_items
            .iter()
            .enumerate()
            .map(|(index, raw)| {
                let path = format!("{FIELD_ITEMS}.{index}");
                match raw {
                    Bson::Document(item) => {
                        ListItem::from_document(item).map_err(|err| err.within(&path))
                    }
                    _ => Err(DbError::malformed(path, "is not an embedded document")),
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            id: object_id_hex(doc)?,
            name: string_field(doc, FIELD_NAME)?,
            items,
        })
    }

    /// The insert shape for a freshly created, empty list.
    pub fn new_document(name: &str) -> Document {
        doc! {
            FIELD_NAME: name,
            FIELD_ITEMS: [],
        }
    }

    /// Summary of this list as of the moment it was read.
    pub fn summary(&self) -> ListSummary {
        ListSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            item_count: saturating_count(self.items.len()),
        }
    }
}

// ---------------------------------------------------------------------------
// Field access helpers
// ---------------------------------------------------------------------------

/// Item count as stored in a summary; lists beyond `u32::MAX` items report
/// `u32::MAX`.
fn saturating_count(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

fn object_id_hex(doc: &Document) -> Result<String, DbError> {
    doc.get_object_id(FIELD_ID)
        .map(|oid| oid.to_hex())
        .map_err(|err| access_error(FIELD_ID, err))
}

fn string_field(doc: &Document, field: &str) -> Result<String, DbError> {
    doc.get_str(field)
        .map(str::to_owned)
        .map_err(|err| access_error(field, err))
}

fn access_error(field: &str, err: ValueAccessError) -> DbError {
    match err {
        ValueAccessError::NotPresent => DbError::malformed(field, "is missing"),
        ValueAccessError::UnexpectedType => DbError::malformed(field, "has an unexpected type"),
        other => DbError::malformed(field, other.to_string()),
    }
}
