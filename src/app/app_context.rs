use std::path::Path;

/// Read-only state shared with every screen.
pub struct AppContext<'p> {
    pub path: &'p Path,
    pub realised: bool,
}
