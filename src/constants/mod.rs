pub mod country;

pub use country::{classify, find_by_code, Country, COUNTRIES, OTHER_GROUP};
