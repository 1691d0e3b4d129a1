pub mod db;
pub mod search;

pub use db::Db;
pub use search::filter_by_name;
