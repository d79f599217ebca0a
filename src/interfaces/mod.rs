pub mod subconverter;

pub use subconverter::{build_sub, probe_userinfo, render_sub, resolve_template, BuildContext};
