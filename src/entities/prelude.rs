pub use super::admins::Entity as Admins;
pub use super::users::Entity as Users;
