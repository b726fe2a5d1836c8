// nodevin-sdk: foundation layer for nodevin.
// No dependencies on other nodevin crates; provides subprocess, filesystem
// and string helpers used throughout the workspace.

pub mod build_constants;
pub mod command_runner;
pub mod io_util;
pub mod process_invoker;
pub mod string_util;

// Re-export commonly used items at crate root
pub use build_constants::{NodevinPackage, Source};
pub use command_runner::{CommandRunner, SystemCommandRunner};
pub use io_util::IOUtil;
pub use process_invoker::{ProcessInvoker, ProcessOutput};
pub use string_util::StringUtil;
