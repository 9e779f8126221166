/*!
 * Thread Table Module
 * Thread control blocks, bounded names and the fixed-capacity slot table
 */

pub mod name;
pub mod table;
pub mod tcb;

pub use name::ThreadName;
pub use table::{Scan, ThreadTable};
pub use tcb::Tcb;
