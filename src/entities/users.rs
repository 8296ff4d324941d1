use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub name: String,

    /// Argon2id password hash
    pub password_hash: String,

    /// Durable access token handed out on login (uuid v4, regenerated on edit)
    #[sea_orm(unique)]
    pub token: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,

    /// Client operating mode tag ("scan" / "read"), flipped by the status poll
    pub mode: Option<String>,

    /// RFC3339; NULL means the account never expires
    pub expired_at: Option<String>,

    pub created_at: String,

    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
