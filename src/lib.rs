pub mod heuristics;
pub mod import;
pub mod io;
pub mod models;
pub mod parser;
pub mod reconcile;
pub mod store;

pub use heuristics::{DetectorConfig, detect_expenses};
pub use import::{ImportOptions, ImportReport, preview_import, run_import};
pub use io::{BundleError, ExportBundle, ScanReport, load_bundle};
pub use models::{
    ExpenseCandidate, ExpenseRecord, MatchConfidence, MediaEvent, MediaKind, MessageContent,
    ParsedMessage, Partner, PartnerBalance, ReceiptMatch, SenderAssignment, SenderMap, Settlement,
};
pub use parser::{ParseOutcome, parse_transcript};
pub use reconcile::{
    DedupPartition, MatcherConfig, SETTLEMENT_EPSILON, compute_balances, match_receipts,
    partition_seen, settle,
};
pub use store::{
    ImportRunStats, MemoryObjectStorage, MemoryStore, ObjectStorage, ProjectStore, RestStore,
    StoreConfig,
};
