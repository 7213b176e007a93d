pub mod db;
pub mod error;
pub mod subscribers;

pub use db::SubscriberDb;
pub use error::StoreError;
pub use fx_core::Subscriber;
pub use subscribers::SubscriberStore;
