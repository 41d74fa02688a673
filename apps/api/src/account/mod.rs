//! Account lifecycle endpoints: delete, export and guest upgrade.
//! All three walk the fixed list of user-owned tables.

pub mod handlers;
