//! Feed composition
//!
//! Every list the engine serves is one aggregation pipeline: a base match,
//! the projection stages for its item shape, a deterministic sort, and a
//! single count-and-slice facet. Feeds never read stored counters because
//! there are none.

pub mod collections;
pub mod comments;
pub mod page;
pub mod profiles;
pub mod sort;
pub mod view;
pub mod webs;

pub use collections::CollectionFeed;
pub use comments::CommentFeed;
pub use page::{paginate, Page, PageRequest};
pub use profiles::ProfileFeed;
pub use sort::{SortKey, SortOrder, SortSpec};
pub use webs::{WebFeed, WebScope};
