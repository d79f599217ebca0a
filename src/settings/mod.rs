//! Settings module for sub2clash
//!
//! Build-wide defaults: templates, cache and request limits.

pub mod settings_struct;

pub use settings_struct::{
    update_settings_from_content, update_settings_from_file, Settings, GLOBAL,
};
