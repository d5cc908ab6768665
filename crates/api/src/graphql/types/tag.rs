//! Product tags.

use async_graphql::{Enum, ID, Object};

use super::common::{Shop, define_connection};
use crate::services::catalog;

/// A product tag from the catalog.
#[derive(Debug, Clone)]
pub struct Tag(pub catalog::Tag);

impl From<catalog::Tag> for Tag {
    fn from(tag: catalog::Tag) -> Self {
        Self(tag)
    }
}

#[Object]
impl Tag {
    #[graphql(name = "_id")]
    async fn id(&self) -> ID {
        ID::from(self.0.id.as_str())
    }

    async fn name(&self) -> &str {
        &self.0.name
    }

    async fn slug(&self) -> Option<&str> {
        self.0.slug.as_deref()
    }

    /// Title shown to shoppers, falling back to `name`.
    async fn display_title(&self) -> &str {
        self.0.display_title.as_deref().unwrap_or(&self.0.name)
    }

    async fn position(&self) -> Option<i32> {
        self.0.position
    }

    async fn shop(&self) -> Shop {
        Shop(self.0.shop_id.clone())
    }
}

/// Fields tags can be sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Enum)]
pub enum TagSortByField {
    #[graphql(name = "_id")]
    Id,
    #[graphql(name = "name")]
    Name,
    #[graphql(name = "position")]
    Position,
}

define_connection!(
    /// A page of tags.
    TagConnection,
    TagEdge,
    Tag
);
