//! Durable per-instance state
//!
//! Each instance directory holds one `.steward.json` file. It is the source
//! of truth across daemon restarts and is only ever replaced atomically.

mod instance_meta;

pub use instance_meta::{
    meta_file_path, read_instance_meta, scan_instances, update_instance_meta,
    write_instance_meta, ScanResult, META_FILENAME,
};
