/// Database models and owner-scoped store operations
///
/// Each model owns the SQL for its table. All read and write operations
/// on tags, items, and collections take the owner's user id and scope
/// the query to it; the HTTP layer never passes a caller-supplied
/// owner.
///
/// # Models
///
/// - `user`: account records keyed by email
/// - `tag`: user-owned labels, many-to-many with collections
/// - `item`: user-owned items, many-to-many with collections
/// - `collection`: the aggregate entity with tag/item associations

pub mod collection;
pub mod item;
pub mod tag;
pub mod user;
