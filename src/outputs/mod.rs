//! Output generation: the veille document, CSV exports and the console report.
//!
//! # Submodules
//!
//! - [`json`]: Loads the canonical document, writes dated snapshots and overwrites
//! - [`csv`]: Per-topic CSV export of matched articles
//! - [`report`]: Renders the end-of-run summary printed to stdout
//!
//! # Output Structure
//!
//! ```text
//! veille.json                         # canonical document (--apply)
//! veille.json.bak                     # backup taken before an overwrite
//! veille_history.json                 # history ledger
//! versions/
//! ├── 05-03-2025-veille.json
//! └── 05-03-2025-veille-v2.json
//! exports/
//! └── veille_MFA_20250305_083000.csv  # --export-csv
//! ```

pub mod csv;
pub mod json;
pub mod report;
