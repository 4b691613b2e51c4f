pub mod store;
pub mod tokens;

pub use store::PgDocumentStore;
pub use tokens::StoreTokenVerifier;
