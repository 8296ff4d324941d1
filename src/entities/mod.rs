pub mod prelude;

pub mod admins;
pub mod users;
